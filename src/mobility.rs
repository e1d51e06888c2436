//! Mobility analysis: ASAP/ALAP scheduling windows
//!
//! For every node this computes the earliest (ASAP) and latest (ALAP) time
//! step at which it may be computed, given an I/O budget `B`:
//!
//! ```text
//! ASAP(n) = 0                                            n is an input
//!         = max(min ASAP(p) + |pred(n)|, 1 + max ASAP(p)) otherwise
//!
//! ALAP(n) = B                                            n is an output
//!         = min(max ALAP(s) - 2·|succ(n)|, min ALAP(s) - 1)  otherwise
//! ```
//!
//! Both recurrences are evaluated with per-node memoization, so each node is
//! resolved once no matter how many paths reach it. The windows are a
//! scheduling heuristic, not a proven bound.
//!
//! A computed node whose window is empty, or lies past the last time step,
//! makes the whole configuration infeasible before any solving happens.

use crate::dag::{Dag, NodeId};
use log::debug;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfeasibleCause {
    /// `ALAP` would drop below zero.
    AlapUnderflow,
    /// `ASAP > ALAP`.
    EmptyWindow,
    /// The earliest compute time is not a valid time step (`ASAP >= budget`).
    PastHorizon,
}

impl fmt::Display for InfeasibleCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibleCause::AlapUnderflow => write!(f, "latest start time underflows"),
            InfeasibleCause::EmptyWindow => write!(f, "earliest start is after latest start"),
            InfeasibleCause::PastHorizon => write!(f, "earliest start is past the last time step"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MobilityError {
    #[error("deadline infeasible at node {node} (asap {asap:?}, alap {alap:?}, budget {budget}): {cause}")]
    DeadlineInfeasible {
        node: NodeId,
        asap: Option<u32>,
        alap: Option<u32>,
        budget: u32,
        cause: InfeasibleCause,
    },
}

/// Scheduling window of one node, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub asap: u32,
    pub alap: u32,
}

impl Window {
    /// Time steps at which a compute may be scheduled, clipped to `0..budget`.
    pub fn compute_steps(&self, budget: u32) -> std::ops::Range<u32> {
        let last = self.alap.min(budget.saturating_sub(1));
        self.asap..last.saturating_add(1).max(self.asap)
    }

    pub fn contains(&self, budget: u32, t: u32) -> bool {
        self.compute_steps(budget).contains(&t)
    }
}

/// ASAP/ALAP windows for every node of a DAG under a fixed budget.
#[derive(Debug, Clone)]
pub struct Mobility {
    budget: u32,
    windows: Vec<Window>,
}

impl Mobility {
    /// Compute windows for all nodes.
    ///
    /// # Errors
    ///
    /// [`MobilityError::DeadlineInfeasible`] when some node cannot be placed
    /// within the budget.
    pub fn analyze(dag: &Dag, budget: u32) -> Result<Self, MobilityError> {
        let mut asap_memo = vec![None; dag.len()];
        let mut alap_memo = vec![None; dag.len()];

        for &output in dag.outputs() {
            asap(dag, output, &mut asap_memo);
        }
        for &input in dag.inputs() {
            alap(dag, input, budget, &mut alap_memo)?;
        }

        let mut windows = Vec::with_capacity(dag.len());
        for id in dag.ids() {
            let early = asap(dag, id, &mut asap_memo);
            let late = alap(dag, id, budget, &mut alap_memo)?;
            let infeasible = |cause| MobilityError::DeadlineInfeasible {
                node: id,
                asap: Some(early),
                alap: Some(late),
                budget,
                cause,
            };
            if early > late {
                return Err(infeasible(InfeasibleCause::EmptyWindow));
            }
            if !dag.is_input(id) && early >= budget {
                return Err(infeasible(InfeasibleCause::PastHorizon));
            }
            debug!("node {}: window [{}, {}]", id, early, late);
            windows.push(Window {
                asap: early,
                alap: late,
            });
        }

        Ok(Mobility { budget, windows })
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn window(&self, id: NodeId) -> Window {
        self.windows[id.index()]
    }

    pub fn asap(&self, id: NodeId) -> u32 {
        self.windows[id.index()].asap
    }

    pub fn alap(&self, id: NodeId) -> u32 {
        self.windows[id.index()].alap
    }

    pub fn compute_steps(&self, id: NodeId) -> std::ops::Range<u32> {
        self.windows[id.index()].compute_steps(self.budget)
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }
}

fn asap(dag: &Dag, id: NodeId, memo: &mut [Option<u32>]) -> u32 {
    if let Some(value) = memo[id.index()] {
        return value;
    }
    let preds = dag.predecessors(id);
    let value = if preds.is_empty() {
        0
    } else {
        let times: Vec<u32> = preds.iter().map(|&p| asap(dag, p, memo)).collect();
        let min = times.iter().copied().min().unwrap_or(0);
        let max = times.iter().copied().max().unwrap_or(0);
        (min + preds.len() as u32).max(max + 1)
    };
    memo[id.index()] = Some(value);
    value
}

fn alap(
    dag: &Dag,
    id: NodeId,
    budget: u32,
    memo: &mut [Option<u32>],
) -> Result<u32, MobilityError> {
    if let Some(value) = memo[id.index()] {
        return Ok(value);
    }
    let succs = dag.successors(id);
    let value = if succs.is_empty() {
        budget
    } else {
        let mut times = Vec::with_capacity(succs.len());
        for &s in succs {
            times.push(alap(dag, s, budget, memo)?);
        }
        let min = times.iter().copied().min().unwrap_or(budget);
        let max = times.iter().copied().max().unwrap_or(budget);
        let spread = (2 * succs.len()) as u32;
        match (max.checked_sub(spread), min.checked_sub(1)) {
            (Some(a), Some(b)) => a.min(b),
            _ => {
                return Err(MobilityError::DeadlineInfeasible {
                    node: id,
                    asap: None,
                    alap: None,
                    budget,
                    cause: InfeasibleCause::AlapUnderflow,
                })
            }
        }
    };
    memo[id.index()] = Some(value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DependencyTable;

    fn dag(rows: Vec<Vec<u32>>) -> Dag {
        Dag::from_table(&DependencyTable::from_rows(rows)).unwrap()
    }

    fn n(number: u32) -> NodeId {
        NodeId::from_number(number).unwrap()
    }

    #[test]
    fn test_two_input_node() {
        let g = dag(vec![vec![0, 0], vec![0, 0], vec![1, 2]]);
        let m = Mobility::analyze(&g, 6).unwrap();
        assert_eq!(m.window(n(1)), Window { asap: 0, alap: 4 });
        assert_eq!(m.window(n(3)), Window { asap: 2, alap: 6 });
        // compute steps are clipped to the last valid step
        assert_eq!(m.compute_steps(n(3)), 2..6);
    }

    #[test]
    fn test_asap_counts_operand_loads() {
        // a single-operand node can start right after its input
        let g = dag(vec![vec![0], vec![1]]);
        let m = Mobility::analyze(&g, 4).unwrap();
        assert_eq!(m.asap(n(2)), 1);
    }

    #[test]
    fn test_alap_uses_successor_spread() {
        // node 1 feeds three consumers: ALAP = min(B - 6, B - 1)
        let g = dag(vec![vec![0], vec![1], vec![1], vec![1]]);
        let m = Mobility::analyze(&g, 10).unwrap();
        assert_eq!(m.alap(n(1)), 4);
    }

    #[test]
    fn test_underflow_is_deadline_infeasible() {
        let g = dag(vec![vec![0], vec![1], vec![2], vec![3]]);
        let err = Mobility::analyze(&g, 2).unwrap_err();
        assert!(matches!(
            err,
            MobilityError::DeadlineInfeasible {
                cause: InfeasibleCause::AlapUnderflow,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_window_is_deadline_infeasible() {
        // ASAP(4) = max(0 + 3, 1) = 3, ALAP(4) = B = 2
        let g = dag(vec![vec![0, 0, 0], vec![0, 0, 0], vec![0, 0, 0], vec![1, 2, 3]]);
        let err = Mobility::analyze(&g, 2).unwrap_err();
        assert_eq!(
            err,
            MobilityError::DeadlineInfeasible {
                node: n(4),
                asap: Some(3),
                alap: Some(2),
                budget: 2,
                cause: InfeasibleCause::EmptyWindow,
            }
        );
    }

    #[test]
    fn test_past_horizon_rejected() {
        // ASAP(3) = ALAP(3) = 2 = B: no valid step for the compute
        let g = dag(vec![vec![0, 0], vec![0, 0], vec![1, 2]]);
        let err = Mobility::analyze(&g, 2).unwrap_err();
        assert!(
            matches!(
                err,
                MobilityError::DeadlineInfeasible {
                    cause: InfeasibleCause::PastHorizon,
                    ..
                }
            ),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_isolated_input_keeps_full_window() {
        let g = dag(vec![vec![0]]);
        let m = Mobility::analyze(&g, 3).unwrap();
        assert_eq!(m.window(n(1)), Window { asap: 0, alap: 3 });
    }

    #[test]
    fn test_window_compute_steps() {
        let w = Window { asap: 3, alap: 9 };
        assert_eq!(w.compute_steps(6), 3..6);
        assert!(w.contains(6, 5));
        assert!(!w.contains(6, 6));
        let late = Window { asap: 5, alap: 5 };
        assert!(late.compute_steps(5).is_empty());
    }
}

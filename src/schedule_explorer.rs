//! Budget and capacity sweeps
//!
//! Runs the feasibility pipeline over a grid of `(budget, capacity)` pairs in
//! parallel and summarizes where schedules start to exist:
//!
//! ```text
//! budgets × capacities
//!        ↓
//!   one independent pipeline run per pair (rayon)
//!        ↓
//!   probes, sorted by (capacity, budget)
//!        ↓
//!   smallest feasible budget per capacity
//! ```
//!
//! Every probe builds its own encoding and simulator state, so probes never
//! share mutable data.

use crate::dag::Dag;
use crate::pipeline::{Feasibility, PebblePipeline, PipelineConfig, PipelineError};
use crate::simulator::Verdict;
use crate::solver::SatOracle;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

/// Grid of configurations to probe.
#[derive(Debug, Clone)]
pub struct ExplorationConfig {
    /// Budgets to try, inclusive
    pub budgets: RangeInclusive<u32>,

    /// Register capacities to try
    pub capacities: Vec<u32>,

    /// Per-probe solver timeout.
    ///
    /// A probe that times out reports `Unknown`, but its solver thread keeps
    /// running until it finishes (see [`VarisatOracle`](crate::solver::VarisatOracle)).
    /// Large grids with short timeouts can therefore leave many threads busy
    /// after `explore` returns.
    pub timeout: Option<Duration>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        ExplorationConfig {
            budgets: 1..=32,
            capacities: vec![4],
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProbeOutcome {
    /// A schedule was found; `valid` is the simulator's verdict on it
    Feasible { io_cost: usize, valid: bool },
    Infeasible,
    /// Rejected by mobility analysis before encoding
    DeadlineInfeasible,
    Unknown { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub budget: u32,
    pub capacity: u32,
    pub outcome: ProbeOutcome,
}

impl Probe {
    pub fn is_feasible(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Feasible { valid: true, .. })
    }
}

// ============================================================================
// Explorer
// ============================================================================

pub struct ScheduleExplorer<'a, O> {
    pipeline: &'a PebblePipeline<O>,
    config: ExplorationConfig,
}

impl<'a, O: SatOracle + Sync> ScheduleExplorer<'a, O> {
    pub fn new(pipeline: &'a PebblePipeline<O>, config: ExplorationConfig) -> Self {
        ScheduleExplorer { pipeline, config }
    }

    /// Probe every configuration of the grid.
    pub fn explore(&self, dag: &Dag) -> Vec<Probe> {
        let grid: Vec<(u32, u32)> = self
            .config
            .capacities
            .iter()
            .flat_map(|&capacity| self.config.budgets.clone().map(move |budget| (budget, capacity)))
            .collect();
        info!("exploring {} configurations", grid.len());

        let mut probes: Vec<Probe> = grid
            .par_iter()
            .map(|&(budget, capacity)| self.probe(dag, budget, capacity))
            .collect();
        probes.sort_by_key(|p| (p.capacity, p.budget));
        probes
    }

    fn probe(&self, dag: &Dag, budget: u32, capacity: u32) -> Probe {
        let config = PipelineConfig {
            budget,
            capacity,
            timeout: self.config.timeout,
        };
        let outcome = match self.pipeline.run(dag, &config) {
            Ok(result) => match result.feasibility {
                Feasibility::Feasible { schedule, verdict } => ProbeOutcome::Feasible {
                    io_cost: match verdict {
                        Verdict::Valid(cost) => cost.total(),
                        Verdict::Invalid(_) => schedule.io_count(),
                    },
                    valid: verdict.is_valid(),
                },
                Feasibility::Infeasible => ProbeOutcome::Infeasible,
                Feasibility::Unknown(reason) => ProbeOutcome::Unknown {
                    reason: reason.to_string(),
                },
            },
            Err(PipelineError::Deadline(_)) => ProbeOutcome::DeadlineInfeasible,
            Err(err) => ProbeOutcome::Failed {
                error: err.to_string(),
            },
        };
        debug!("budget {}, capacity {}: {:?}", budget, capacity, outcome);
        Probe {
            budget,
            capacity,
            outcome,
        }
    }
}

/// Smallest budget with a valid schedule at `capacity`.
pub fn minimal_budget(probes: &[Probe], capacity: u32) -> Option<&Probe> {
    probes
        .iter()
        .filter(|p| p.capacity == capacity && p.is_feasible())
        .min_by_key(|p| p.budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DependencyTable;

    fn sample3() -> Dag {
        Dag::from_table(&DependencyTable::from_rows(vec![vec![0, 0], vec![0, 0], vec![1, 2]]))
            .unwrap()
    }

    #[test]
    fn test_sweep_finds_minimal_budget() {
        let pipeline = PebblePipeline::new();
        let config = ExplorationConfig {
            budgets: 1..=7,
            capacities: vec![2, 3],
            timeout: None,
        };
        let probes = ScheduleExplorer::new(&pipeline, config).explore(&sample3());
        assert_eq!(probes.len(), 14);

        // two registers never suffice for a two-operand compute
        assert!(minimal_budget(&probes, 2).is_none());

        let best = minimal_budget(&probes, 3).unwrap();
        assert_eq!(best.budget, 6);
        assert_eq!(
            best.outcome,
            ProbeOutcome::Feasible {
                io_cost: 3,
                valid: true
            }
        );
    }

    #[test]
    fn test_short_budgets_are_deadline_infeasible() {
        let pipeline = PebblePipeline::new();
        let config = ExplorationConfig {
            budgets: 1..=1,
            capacities: vec![3],
            timeout: None,
        };
        let probes = ScheduleExplorer::new(&pipeline, config).explore(&sample3());
        assert_eq!(probes[0].outcome, ProbeOutcome::DeadlineInfeasible);
    }
}

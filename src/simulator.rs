//! Schedule validity simulator
//!
//! Replays a [`Schedule`] against a register file of fixed capacity and checks
//! every rule application against the pebble-game rules:
//!
//! | Rule    | Requires                                          | Effect                     |
//! |---------|---------------------------------------------------|----------------------------|
//! | Load    | a free register, value not deleted                | value placed in a register |
//! | Store   | value resident and not deleted                    | register freed             |
//! | Compute | every predecessor resident and not deleted, a free register | value placed in a register |
//! | Delete  | value resident and not deleted                    | register freed, value deleted |
//!
//! The first violation ends the replay. Each replay starts from an empty
//! register file, so replaying the same schedule twice gives the same verdict.

use crate::dag::{Dag, NodeId};
use crate::schedule::{Event, Schedule};
use crate::symbols::Rule;
use log::debug;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("schedule refers to node {node}, but the graph has {len} nodes")]
    UnknownNode { node: NodeId, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    CapacityExceeded { capacity: usize },
    MissingDependency { dependency: NodeId },
    AlreadyDeleted { value: NodeId },
    ValueAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub time: u32,
    pub event: Event,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "time {}: {} ({}): ", self.time, self.event, self.event.rule)?;
        match self.kind {
            ViolationKind::CapacityExceeded { capacity } => {
                write!(f, "no free register (capacity {})", capacity)
            }
            ViolationKind::MissingDependency { dependency } => {
                write!(f, "dependency {} is not in a register", dependency)
            }
            ViolationKind::AlreadyDeleted { value } => write!(f, "value {} was deleted", value),
            ViolationKind::ValueAbsent => write!(f, "value {} is not in a register", self.event.node),
        }
    }
}

/// Loads and stores performed by a schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IoCost {
    pub loads: usize,
    pub stores: usize,
}

impl IoCost {
    pub fn total(&self) -> usize {
        self.loads + self.stores
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Valid(IoCost),
    Invalid(Violation),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Valid(cost) => write!(f, "Schedule VALID, I/O cost: {}", cost.total()),
            Verdict::Invalid(violation) => write!(f, "Schedule INVALID: {}", violation),
        }
    }
}

/// Register file plus deletion marks for one replay.
struct Machine {
    slots: Vec<Option<NodeId>>,
    deleted: Vec<bool>,
}

impl Machine {
    fn new(capacity: usize, nodes: usize) -> Self {
        Machine {
            slots: vec![None; capacity],
            deleted: vec![false; nodes],
        }
    }

    fn resident(&self, node: NodeId) -> bool {
        self.slots.contains(&Some(node))
    }

    fn place(&mut self, node: NodeId) -> bool {
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(node);
                true
            }
            None => false,
        }
    }

    fn evict(&mut self, node: NodeId) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| **slot == Some(node)) {
            *slot = None;
        }
    }

    fn apply(&mut self, dag: &Dag, event: &Event) -> Result<(), ViolationKind> {
        let node = event.node;
        let capacity = self.slots.len();
        match event.rule {
            Rule::Load => {
                if self.slots.iter().all(Option::is_some) {
                    return Err(ViolationKind::CapacityExceeded { capacity });
                }
                if self.deleted[node.index()] {
                    return Err(ViolationKind::AlreadyDeleted { value: node });
                }
                self.place(node);
            }
            Rule::Store => {
                self.check_live(node)?;
                self.evict(node);
            }
            Rule::Compute => {
                for &dependency in dag.predecessors(node) {
                    if !self.resident(dependency) {
                        return Err(ViolationKind::MissingDependency { dependency });
                    }
                    if self.deleted[dependency.index()] {
                        return Err(ViolationKind::AlreadyDeleted { value: dependency });
                    }
                }
                if !self.place(node) {
                    return Err(ViolationKind::CapacityExceeded { capacity });
                }
            }
            Rule::Delete => {
                self.check_live(node)?;
                self.evict(node);
                self.deleted[node.index()] = true;
            }
        }
        Ok(())
    }

    fn check_live(&self, node: NodeId) -> Result<(), ViolationKind> {
        if !self.resident(node) {
            return Err(ViolationKind::ValueAbsent);
        }
        if self.deleted[node.index()] {
            return Err(ViolationKind::AlreadyDeleted { value: node });
        }
        Ok(())
    }
}

/// Replays schedules for one DAG and register capacity.
pub struct Simulator<'a> {
    dag: &'a Dag,
    capacity: usize,
}

impl<'a> Simulator<'a> {
    pub fn new(dag: &'a Dag, capacity: usize) -> Self {
        Simulator { dag, capacity }
    }

    /// Replay the events of `schedule` in time order; empty steps are skipped.
    ///
    /// # Errors
    ///
    /// [`SimulationError::UnknownNode`] if an event names a node outside the
    /// DAG. Rule violations are reported through [`Verdict::Invalid`].
    pub fn replay(&self, schedule: &Schedule) -> Result<Verdict, SimulationError> {
        if let Some(event) = schedule
            .events()
            .iter()
            .find(|e| self.dag.get(e.node).is_none())
        {
            return Err(SimulationError::UnknownNode {
                node: event.node,
                len: self.dag.len(),
            });
        }

        let mut machine = Machine::new(self.capacity, self.dag.len());
        let mut cost = IoCost::default();

        // events are kept in time order
        for event in schedule.events() {
            if let Err(kind) = machine.apply(self.dag, event) {
                let violation = Violation {
                    time: event.time,
                    event: *event,
                    kind,
                };
                debug!("replay stopped: {}", violation);
                return Ok(Verdict::Invalid(violation));
            }
            match event.rule {
                Rule::Load => cost.loads += 1,
                Rule::Store => cost.stores += 1,
                Rule::Compute | Rule::Delete => {}
            }
        }

        Ok(Verdict::Valid(cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DependencyTable;

    fn sample3() -> Dag {
        Dag::from_table(&DependencyTable::from_rows(vec![vec![0, 0], vec![0, 0], vec![1, 2]]))
            .unwrap()
    }

    fn schedule(budget: u32, events: &[(u32, Rule, u32)]) -> Schedule {
        let events = events
            .iter()
            .map(|&(time, rule, number)| Event {
                time,
                rule,
                node: NodeId::from_number(number).unwrap(),
            })
            .collect();
        Schedule::new(budget, events).unwrap()
    }

    fn violation(verdict: Verdict) -> Violation {
        match verdict {
            Verdict::Invalid(v) => v,
            Verdict::Valid(cost) => panic!("expected a violation, got cost {:?}", cost),
        }
    }

    #[test]
    fn test_valid_schedule_and_cost() {
        let dag = sample3();
        let s = schedule(
            6,
            &[
                (0, Rule::Load, 1),
                (1, Rule::Load, 2),
                (2, Rule::Compute, 3),
                (3, Rule::Store, 3),
                (4, Rule::Delete, 1),
                (5, Rule::Delete, 2),
            ],
        );
        let verdict = Simulator::new(&dag, 3).replay(&s).unwrap();
        assert_eq!(verdict, Verdict::Valid(IoCost { loads: 2, stores: 1 }));
        assert_eq!(verdict.to_string(), "Schedule VALID, I/O cost: 3");
    }

    #[test]
    fn test_empty_steps_are_skipped() {
        let dag = sample3();
        let s = schedule(8, &[(0, Rule::Load, 1), (3, Rule::Load, 2), (7, Rule::Compute, 3)]);
        assert!(Simulator::new(&dag, 3).replay(&s).unwrap().is_valid());
    }

    #[test]
    fn test_compute_without_free_register() {
        let dag = sample3();
        let s = schedule(3, &[(0, Rule::Load, 1), (1, Rule::Load, 2), (2, Rule::Compute, 3)]);
        let v = violation(Simulator::new(&dag, 2).replay(&s).unwrap());
        assert_eq!(v.time, 2);
        assert_eq!(v.kind, ViolationKind::CapacityExceeded { capacity: 2 });
    }

    #[test]
    fn test_load_without_free_register() {
        let dag = sample3();
        let s = schedule(2, &[(0, Rule::Load, 1), (1, Rule::Load, 2)]);
        let v = violation(Simulator::new(&dag, 1).replay(&s).unwrap());
        assert_eq!(v.time, 1);
        assert!(matches!(v.kind, ViolationKind::CapacityExceeded { .. }));
    }

    #[test]
    fn test_missing_dependency() {
        let dag = sample3();
        let s = schedule(3, &[(0, Rule::Load, 1), (2, Rule::Compute, 3)]);
        let v = violation(Simulator::new(&dag, 3).replay(&s).unwrap());
        assert_eq!(
            v.kind,
            ViolationKind::MissingDependency {
                dependency: NodeId::from_number(2).unwrap()
            }
        );
    }

    #[test]
    fn test_load_after_delete() {
        let dag = sample3();
        let s = schedule(3, &[(0, Rule::Load, 1), (1, Rule::Delete, 1), (2, Rule::Load, 1)]);
        let v = violation(Simulator::new(&dag, 2).replay(&s).unwrap());
        assert_eq!(v.time, 2);
        assert!(matches!(v.kind, ViolationKind::AlreadyDeleted { .. }));
    }

    #[test]
    fn test_store_of_absent_value() {
        let dag = sample3();
        let s = schedule(1, &[(0, Rule::Store, 3)]);
        let v = violation(Simulator::new(&dag, 2).replay(&s).unwrap());
        assert_eq!(v.kind, ViolationKind::ValueAbsent);
        assert!(v.to_string().contains("not in a register"));
    }

    #[test]
    fn test_delete_of_absent_value() {
        let dag = sample3();
        let s = schedule(2, &[(0, Rule::Load, 1), (1, Rule::Delete, 2)]);
        let v = violation(Simulator::new(&dag, 2).replay(&s).unwrap());
        assert_eq!(v.time, 1);
        assert_eq!(v.kind, ViolationKind::ValueAbsent);
    }

    #[test]
    fn test_replay_is_repeatable() {
        let dag = sample3();
        let s = schedule(4, &[(0, Rule::Load, 1), (1, Rule::Delete, 1), (3, Rule::Delete, 1)]);
        let sim = Simulator::new(&dag, 1);
        let first = sim.replay(&s).unwrap();
        assert_eq!(first, sim.replay(&s).unwrap());
    }

    #[test]
    fn test_unknown_node() {
        let dag = sample3();
        let s = schedule(1, &[(0, Rule::Load, 9)]);
        assert_eq!(
            Simulator::new(&dag, 1).replay(&s),
            Err(SimulationError::UnknownNode {
                node: NodeId::from_number(9).unwrap(),
                len: 3
            })
        );
    }
}

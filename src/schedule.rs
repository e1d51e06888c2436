//! Pebbling schedules
//!
//! A [`Schedule`] is the list of rule applications a model turns on, ordered
//! by time step. It is what gets printed and what the simulator replays.

use crate::dag::NodeId;
use crate::solver::Assignment;
use crate::symbols::{Rule, SymbolError, SymbolTable};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("event {event} lies past the last time step {last}")]
    PastHorizon { event: Event, last: i64 },

    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

/// One rule application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Event {
    pub time: u32,
    pub rule: Rule,
    pub node: NodeId,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.rule.mnemonic(), self.node, self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    budget: u32,
    events: Vec<Event>,
}

impl Schedule {
    /// Build a schedule over time steps `0..budget`.
    pub fn new(budget: u32, mut events: Vec<Event>) -> Result<Self, ScheduleError> {
        if let Some(&event) = events.iter().find(|e| e.time >= budget) {
            return Err(ScheduleError::PastHorizon {
                event,
                last: i64::from(budget) - 1,
            });
        }
        events.sort();
        Ok(Schedule { budget, events })
    }

    /// Collect every symbol the assignment sets to true.
    pub fn from_assignment(
        symbols: &SymbolTable,
        assignment: &Assignment,
        budget: u32,
    ) -> Result<Self, ScheduleError> {
        let mut events = Vec::new();
        for (id, key) in symbols.iter() {
            if assignment.value(id)? {
                events.push(Event {
                    time: key.time,
                    rule: key.rule,
                    node: key.node,
                });
            }
        }
        Schedule::new(budget, events)
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events at time step `t`.
    pub fn at(&self, t: u32) -> &[Event] {
        // events are sorted by time first
        let start = self.events.partition_point(|e| e.time < t);
        let end = start + self.events[start..].partition_point(|e| e.time == t);
        &self.events[start..end]
    }

    pub fn count(&self, rule: Rule) -> usize {
        self.events.iter().filter(|e| e.rule == rule).count()
    }

    /// Loads plus stores.
    pub fn io_count(&self) -> usize {
        self.events.iter().filter(|e| e.rule.is_io()).count()
    }

    /// Occupancy after each time step, following rule weights.
    pub fn occupancy(&self) -> Vec<i64> {
        let mut deltas = vec![0i64; self.budget as usize];
        for event in &self.events {
            deltas[event.time as usize] += event.rule.weight();
        }
        let mut level = 0i64;
        deltas
            .into_iter()
            .map(|delta| {
                level += delta;
                level
            })
            .collect()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.budget.saturating_sub(1).to_string().len();
        for t in 0..self.budget {
            write!(f, "t={:>width$}:", t, width = width)?;
            let mut idle = true;
            for event in self.at(t) {
                write!(f, " {} {} {}", event, event.rule, event.node)?;
                idle = false;
            }
            if idle {
                write!(f, " -")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::NodeId;

    fn event(time: u32, rule: Rule, number: u32) -> Event {
        Event {
            time,
            rule,
            node: NodeId::from_number(number).unwrap(),
        }
    }

    #[test]
    fn test_events_are_sorted_by_time() {
        let schedule = Schedule::new(
            4,
            vec![event(3, Rule::Store, 3), event(0, Rule::Load, 1), event(2, Rule::Compute, 3)],
        )
        .unwrap();
        let times: Vec<u32> = schedule.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0, 2, 3]);
    }

    #[test]
    fn test_events_at_step() {
        let schedule = Schedule::new(
            6,
            vec![event(4, Rule::Delete, 1), event(1, Rule::Load, 2), event(4, Rule::Load, 3)],
        )
        .unwrap();
        assert_eq!(schedule.at(4), &[event(4, Rule::Load, 3), event(4, Rule::Delete, 1)]);
        assert_eq!(schedule.at(1), &[event(1, Rule::Load, 2)]);
        assert!(schedule.at(0).is_empty());
        assert!(schedule.at(5).is_empty());
        assert!(schedule.at(9).is_empty());
    }

    #[test]
    fn test_past_horizon_rejected() {
        let err = Schedule::new(2, vec![event(2, Rule::Load, 1)]).unwrap_err();
        assert!(matches!(err, ScheduleError::PastHorizon { last: 1, .. }));
    }

    #[test]
    fn test_from_assignment() {
        let mut symbols = SymbolTable::new();
        let n1 = NodeId::from_number(1).unwrap();
        symbols.register(n1, Rule::Load, 1);
        symbols.register(n1, Rule::Delete, 2);
        symbols.register(n1, Rule::Load, 0);
        let assignment = Assignment::new(vec![false, true, true]);
        let schedule = Schedule::from_assignment(&symbols, &assignment, 3).unwrap();
        assert_eq!(
            schedule.events(),
            &[event(0, Rule::Load, 1), event(2, Rule::Delete, 1)]
        );
    }

    #[test]
    fn test_counts_and_occupancy() {
        let schedule = Schedule::new(
            6,
            vec![
                event(0, Rule::Load, 1),
                event(1, Rule::Load, 2),
                event(2, Rule::Compute, 3),
                event(3, Rule::Store, 3),
                event(4, Rule::Delete, 1),
                event(5, Rule::Delete, 2),
            ],
        )
        .unwrap();
        assert_eq!(schedule.io_count(), 3);
        assert_eq!(schedule.count(Rule::Delete), 2);
        assert_eq!(schedule.occupancy(), vec![1, 2, 3, 2, 1, 0]);
    }

    #[test]
    fn test_display_marks_idle_steps() {
        let schedule = Schedule::new(3, vec![event(1, Rule::Load, 4)]).unwrap();
        let text = schedule.to_string();
        assert!(text.contains("t=0: -"));
        assert!(text.contains("R1(4,1) load 4"));
    }
}

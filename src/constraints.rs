//! Solver-independent constraint sets
//!
//! An [`Encoding`] is everything a satisfiability oracle needs: the symbol
//! table, the formula store the constraints point into, and the constraints
//! themselves. It says nothing about how a backend turns them into clauses.

use crate::formula::FormulaStore;
use crate::symbols::{Rule, SymbolId, SymbolTable};
use egg::Id;
use serde::Serialize;
use std::fmt;

/// One requirement on the symbols of an [`Encoding`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The formula must hold.
    Assert(Id),

    /// At most `bound` of the formulas may hold.
    AtMost { bound: u32, items: Vec<Id> },

    /// Running inventory: for every `k`, the weighted count of true formulas
    /// in `steps[0..=k]` is at most `bound`.
    RunningSum {
        steps: Vec<Vec<(i64, Id)>>,
        bound: u32,
    },
}

/// Why a constraint was emitted. Only used for statistics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Origin {
    /// Each computed node is computed exactly once in its window.
    NodeSchedule,
    /// At most one rule per time step.
    Exclusivity,
    /// Register occupancy stays within capacity.
    Capacity,
    /// A rule application implies its register preconditions.
    Frame,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::NodeSchedule => "node schedule",
            Origin::Exclusivity => "exclusivity",
            Origin::Capacity => "capacity",
            Origin::Frame => "frame",
        };
        write!(f, "{}", name)
    }
}

/// A complete satisfiability problem.
pub struct Encoding {
    pub symbols: SymbolTable,
    pub formulas: FormulaStore,
    pub constraints: Vec<(Origin, Constraint)>,
    pub budget: u32,
    pub capacity: u32,
}

impl Encoding {
    pub fn new(symbols: SymbolTable, formulas: FormulaStore, budget: u32, capacity: u32) -> Self {
        Encoding {
            symbols,
            formulas,
            constraints: Vec::new(),
            budget,
            capacity,
        }
    }

    pub fn push(&mut self, origin: Origin, constraint: Constraint) {
        self.constraints.push((origin, constraint));
    }

    /// Index of the first constraint violated by an assignment, if any.
    pub fn first_violation<F: Fn(SymbolId) -> bool>(&self, value_of: &F) -> Option<usize> {
        let holds = |id: Id| self.formulas.evaluate(id, value_of);
        self.constraints.iter().position(|(_, constraint)| match constraint {
            Constraint::Assert(id) => !holds(*id),
            Constraint::AtMost { bound, items } => {
                items.iter().filter(|&&id| holds(id)).count() > *bound as usize
            }
            Constraint::RunningSum { steps, bound } => {
                let mut total = 0i64;
                steps.iter().any(|step| {
                    total += step
                        .iter()
                        .filter(|(_, id)| holds(*id))
                        .map(|(weight, _)| weight)
                        .sum::<i64>();
                    total > i64::from(*bound)
                })
            }
        })
    }

    pub fn stats(&self) -> EncodingStats {
        let count = |origin: Origin| {
            self.constraints
                .iter()
                .filter(|(o, _)| *o == origin)
                .count()
        };
        EncodingStats {
            symbols: self.symbols.len(),
            loads: self.symbols.count(Rule::Load),
            stores: self.symbols.count(Rule::Store),
            computes: self.symbols.count(Rule::Compute),
            deletes: self.symbols.count(Rule::Delete),
            formula_nodes: self.formulas.len(),
            node_constraints: count(Origin::NodeSchedule),
            exclusivity_constraints: count(Origin::Exclusivity),
            capacity_constraints: count(Origin::Capacity),
            frame_constraints: count(Origin::Frame),
        }
    }
}

/// Size of an encoding, for logs and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncodingStats {
    pub symbols: usize,
    pub loads: usize,
    pub stores: usize,
    pub computes: usize,
    pub deletes: usize,
    pub formula_nodes: usize,
    pub node_constraints: usize,
    pub exclusivity_constraints: usize,
    pub capacity_constraints: usize,
    pub frame_constraints: usize,
}

impl fmt::Display for EncodingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} symbols ({} load, {} store, {} compute, {} delete), {} formula nodes, \
             constraints: {} node, {} exclusivity, {} capacity, {} frame",
            self.symbols,
            self.loads,
            self.stores,
            self.computes,
            self.deletes,
            self.formula_nodes,
            self.node_constraints,
            self.exclusivity_constraints,
            self.capacity_constraints,
            self.frame_constraints
        )
    }
}

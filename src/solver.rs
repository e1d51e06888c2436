//! Satisfiability oracles
//!
//! [`SatOracle`] is the seam between the encoder and any decision procedure:
//! it takes an [`Encoding`] and answers SAT (with an [`Assignment`] of every
//! symbol), UNSAT, or UNKNOWN with a reason. [`VarisatOracle`] is the bundled
//! implementation, a CDCL solver fed with the clauses from [`crate::cnf`].

use crate::cnf::{self, Cnf};
use crate::constraints::Encoding;
use crate::symbols::{SymbolError, SymbolId};
use log::{debug, info, warn};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use varisat::{CnfFormula, Lit, Solver};

/// Truth values of all symbols of an encoding, indexed by [`SymbolId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn new(values: Vec<bool>) -> Self {
        Assignment { values }
    }

    pub fn value(&self, symbol: SymbolId) -> Result<bool, SymbolError> {
        self.values
            .get(symbol.index())
            .copied()
            .ok_or(SymbolError::Foreign(symbol))
    }

    pub fn true_symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value)
            .map(|(index, _)| SymbolId::from_index(index))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Why no definite answer was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    Timeout(Duration),
    Backend(String),
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::Timeout(limit) => write!(f, "timed out after {:.1?}", limit),
            UnknownReason::Backend(msg) => write!(f, "solver failure: {}", msg),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Sat(Assignment),
    Unsat,
    Unknown(UnknownReason),
}

impl SolveOutcome {
    pub fn is_sat(&self) -> bool {
        matches!(self, SolveOutcome::Sat(_))
    }
}

/// A decision procedure for [`Encoding`]s.
pub trait SatOracle {
    fn name(&self) -> &str;

    /// Decide the encoding, giving up after `timeout` if one is set.
    fn solve(&self, encoding: &Encoding, timeout: Option<Duration>) -> SolveOutcome;
}

/// CDCL oracle backed by varisat.
///
/// varisat cannot be interrupted. When a timeout expires the solver thread is
/// detached and runs to completion in the background; only its answer is
/// dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarisatOracle;

impl VarisatOracle {
    pub fn new() -> Self {
        VarisatOracle
    }
}

impl SatOracle for VarisatOracle {
    fn name(&self) -> &str {
        "varisat"
    }

    fn solve(&self, encoding: &Encoding, timeout: Option<Duration>) -> SolveOutcome {
        let cnf = cnf::translate(encoding);
        info!(
            "solving: {} variables ({} symbols), {} clauses",
            cnf.var_count,
            cnf.symbol_count,
            cnf.clause_count()
        );
        let Cnf {
            formula,
            symbol_count,
            ..
        } = cnf;

        let Some(limit) = timeout else {
            return run(&formula, symbol_count);
        };

        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("pebblesat-solver".to_string())
            .spawn(move || {
                let _ = sender.send(run(&formula, symbol_count));
            });
        if let Err(err) = spawned {
            return SolveOutcome::Unknown(UnknownReason::Backend(format!(
                "could not start solver thread: {}",
                err
            )));
        }

        match receiver.recv_timeout(limit) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                warn!("solver did not finish within {:?}", limit);
                SolveOutcome::Unknown(UnknownReason::Timeout(limit))
            }
            Err(RecvTimeoutError::Disconnected) => SolveOutcome::Unknown(UnknownReason::Backend(
                "solver thread stopped without an answer".to_string(),
            )),
        }
    }
}

fn run(formula: &CnfFormula, symbol_count: usize) -> SolveOutcome {
    let mut solver = Solver::new();
    solver.add_formula(formula);
    match solver.solve() {
        Ok(true) => match solver.model() {
            Some(model) => SolveOutcome::Sat(decode(&model, symbol_count)),
            None => SolveOutcome::Unknown(UnknownReason::Backend(
                "satisfiable but no model available".to_string(),
            )),
        },
        Ok(false) => SolveOutcome::Unsat,
        Err(err) => SolveOutcome::Unknown(UnknownReason::Backend(err.to_string())),
    }
}

/// Symbol values from a model. Symbols absent from every clause are false.
fn decode(model: &[Lit], symbol_count: usize) -> Assignment {
    let mut values = vec![false; symbol_count];
    for lit in model {
        if let Some(value) = values.get_mut(lit.index()) {
            *value = lit.is_positive();
        }
    }
    debug!(
        "model sets {} of {} symbols",
        values.iter().filter(|&&v| v).count(),
        symbol_count
    );
    Assignment::new(values)
}

//! pebblesat: I/O lower bounds for the red/blue pebble game via SAT
//!
//! Given a computation DAG, a register capacity and a budget of rule
//! applications, this crate decides whether the DAG can be pebbled, and if so
//! produces a schedule and checks it independently:
//!
//! # Core Pipeline Flow
//! ```text
//! dependency table → DAG → ASAP/ALAP → constraint encoding → SAT oracle → schedule
//!                     ↓        ↓               ↓                  ↓           ↓
//!                  inputs,  compute        node, exclusivity,   CNF via    simulator
//!                  outputs  windows        capacity, frame      varisat    verdict + I/O cost
//! ```
//!
//! # Module Organization
//!
//! ## Graph and Timing
//! - [`dag`]: dependency tables and the validated DAG
//! - [`mobility`]: ASAP/ALAP windows and deadline feasibility
//!
//! ## Encoding
//! - [`symbols`]: pebble rules and the (node, rule, time) symbol table
//! - [`formula`]: hash-consed propositional formulas
//! - [`constraints`]: constraint kinds handed to an oracle
//! - [`encoder`]: builds the constraint system for one query
//!
//! ## Solving and Validation
//! - [`cnf`]: clause translation of an encoding
//! - [`solver`]: the oracle interface and the varisat oracle
//! - [`schedule`]: schedules read off a model
//! - [`simulator`]: replay against the pebble-game rules
//!
//! ## Driver
//! - [`pipeline`]: end-to-end feasibility queries
//! - [`schedule_explorer`]: parallel budget/capacity sweeps
//! - [`parse`], [`catalog`]: dependency table sources
//! - [`report`]: text and JSON output

// ============================================================================
// Graph and Timing
// ============================================================================

pub mod dag;
pub mod mobility;

// ============================================================================
// Encoding
// ============================================================================

pub mod constraints;
pub mod encoder;
pub mod formula;
pub mod symbols;

// ============================================================================
// Solving and Validation
// ============================================================================

pub mod cnf;
pub mod schedule;
pub mod simulator;
pub mod solver;

// ============================================================================
// Driver
// ============================================================================

pub mod catalog;
pub mod parse;
pub mod pipeline;
pub mod report;
pub mod schedule_explorer;

pub use dag::{Dag, DependencyTable, NodeId};
pub use pipeline::{Feasibility, PebblePipeline, PipelineConfig, PipelineError, PipelineResult};
pub use simulator::{Simulator, Verdict};
pub use solver::{SatOracle, SolveOutcome, VarisatOracle};

//! End-to-end feasibility pipeline
//!
//! ```text
//! dependency table → DAG → ASAP/ALAP windows → encoding → oracle → schedule → replay
//! ```
//!
//! # Pipeline Stages
//!
//! ## Stage 1: Graph construction
//! - **Input**: dependency table
//! - **Output**: validated [`Dag`]
//!
//! ## Stage 2: Mobility analysis
//! - **Input**: DAG + budget
//! - **Output**: per-node scheduling windows, or a deadline-infeasible error
//!
//! ## Stage 3: Encoding
//! - **Input**: DAG + windows + capacity
//! - **Output**: [`Encoding`](crate::constraints::Encoding)
//!
//! ## Stage 4: Solving
//! - **Input**: encoding + optional timeout
//! - **Output**: SAT with a model, UNSAT, or UNKNOWN
//!
//! ## Stage 5: Validation
//! - **Input**: the schedule read off a SAT model
//! - **Output**: simulator verdict and I/O cost
//!
//! # Usage
//!
//! ```no_run
//! use pebblesat::catalog;
//! use pebblesat::pipeline::{Feasibility, PebblePipeline, PipelineConfig};
//!
//! let table = catalog::lookup("fft4")?.table;
//! let config = PipelineConfig { budget: 26, capacity: 6, ..Default::default() };
//! let result = PebblePipeline::new().run_table(&table, &config)?;
//! if let Feasibility::Feasible { verdict, .. } = &result.feasibility {
//!     println!("{}", verdict);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::constraints::EncodingStats;
use crate::dag::{Dag, DependencyTable, GraphError};
use crate::encoder::Encoder;
use crate::mobility::{Mobility, MobilityError};
use crate::schedule::{Schedule, ScheduleError};
use crate::simulator::{SimulationError, Simulator, Verdict};
use crate::solver::{SatOracle, SolveOutcome, UnknownReason, VarisatOracle};
use log::{info, warn};
use std::time::{Duration, Instant};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Pipeline errors. UNSAT and UNKNOWN answers are results, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Malformed dependency table
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    /// No node placement fits the budget
    #[error(transparent)]
    Deadline(#[from] MobilityError),

    /// Model and symbol table disagree
    #[error("internal error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Schedule names nodes outside the graph
    #[error("internal error: {0}")]
    Simulation(#[from] SimulationError),
}

impl PipelineError {
    /// True for errors caused by the input rather than by a bug.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, PipelineError::Graph(_) | PipelineError::Deadline(_))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Parameters of one feasibility query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of rule applications (time steps)
    pub budget: u32,

    /// Number of registers
    pub capacity: u32,

    /// Give up after this long and report UNKNOWN
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            budget: 16,
            capacity: 4,
            timeout: None,
        }
    }
}

// ============================================================================
// Pipeline Result
// ============================================================================

/// Answer to a feasibility query.
#[derive(Clone, Debug)]
pub enum Feasibility {
    /// A schedule exists; the simulator's verdict on it is attached
    Feasible { schedule: Schedule, verdict: Verdict },

    /// No schedule exists within the budget
    Infeasible,

    /// The oracle gave up
    Unknown(UnknownReason),
}

impl Feasibility {
    pub fn headline(&self) -> &'static str {
        match self {
            Feasibility::Feasible { .. } => "There is a valid schedule",
            Feasibility::Infeasible => "No valid schedule exists",
            Feasibility::Unknown(_) => "It is unknown whether a valid schedule exists",
        }
    }
}

/// Result of a complete pipeline run
#[derive(Clone, Debug)]
pub struct PipelineResult {
    pub budget: u32,
    pub capacity: u32,
    pub feasibility: Feasibility,

    /// Size of the encoding handed to the oracle
    pub stats: EncodingStats,

    /// Oracle that produced the answer
    pub oracle: String,

    pub encode_time: Duration,
    pub solve_time: Duration,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs feasibility queries against a satisfiability oracle.
pub struct PebblePipeline<O = VarisatOracle> {
    oracle: O,
}

impl PebblePipeline<VarisatOracle> {
    pub fn new() -> Self {
        PebblePipeline {
            oracle: VarisatOracle::new(),
        }
    }
}

impl Default for PebblePipeline<VarisatOracle> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: SatOracle> PebblePipeline<O> {
    pub fn with_oracle(oracle: O) -> Self {
        PebblePipeline { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Build the DAG from `table`, then [`run`](Self::run).
    pub fn run_table(
        &self,
        table: &DependencyTable,
        config: &PipelineConfig,
    ) -> Result<PipelineResult, PipelineError> {
        let dag = Dag::from_table(table)?;
        self.run(&dag, config)
    }

    /// Decide whether `dag` can be pebbled within the configured budget and
    /// capacity, and validate any schedule found.
    ///
    /// # Errors
    ///
    /// Configuration errors (see [`PipelineError::is_configuration_error`])
    /// stop the run before anything is encoded. The remaining variants signal
    /// an internal inconsistency.
    pub fn run(&self, dag: &Dag, config: &PipelineConfig) -> Result<PipelineResult, PipelineError> {
        info!("computing ASAP/ALAP (budget {})", config.budget);
        let mobility = Mobility::analyze(dag, config.budget)?;

        let start = Instant::now();
        let encoding = Encoder::new(dag, &mobility, config.capacity).encode();
        let encode_time = start.elapsed();
        let stats = encoding.stats();
        info!("encoded in {:.2?}: {}", encode_time, stats);

        let start = Instant::now();
        let outcome = self.oracle.solve(&encoding, config.timeout);
        let solve_time = start.elapsed();
        info!(
            "{} answered {} in {:.2?}",
            self.oracle.name(),
            match &outcome {
                SolveOutcome::Sat(_) => "SAT",
                SolveOutcome::Unsat => "UNSAT",
                SolveOutcome::Unknown(_) => "UNKNOWN",
            },
            solve_time
        );

        let feasibility = match outcome {
            SolveOutcome::Sat(assignment) => {
                let schedule =
                    Schedule::from_assignment(&encoding.symbols, &assignment, config.budget)?;
                let verdict =
                    Simulator::new(dag, config.capacity as usize).replay(&schedule)?;
                if let Verdict::Invalid(violation) = &verdict {
                    warn!("model does not replay: {}", violation);
                }
                Feasibility::Feasible { schedule, verdict }
            }
            SolveOutcome::Unsat => Feasibility::Infeasible,
            SolveOutcome::Unknown(reason) => Feasibility::Unknown(reason),
        };

        Ok(PipelineResult {
            budget: config.budget,
            capacity: config.capacity,
            feasibility,
            stats,
            oracle: self.oracle.name().to_string(),
            encode_time,
            solve_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Encoding;

    fn sample3() -> DependencyTable {
        DependencyTable::from_rows(vec![vec![0, 0], vec![0, 0], vec![1, 2]])
    }

    /// Oracle that never decides.
    struct Undecided;

    impl SatOracle for Undecided {
        fn name(&self) -> &str {
            "undecided"
        }

        fn solve(&self, _: &Encoding, _: Option<Duration>) -> SolveOutcome {
            SolveOutcome::Unknown(UnknownReason::Backend("no answer".to_string()))
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.timeout, None);
        assert!(config.budget > 0 && config.capacity > 0);
    }

    #[test]
    fn test_sample3_feasible_with_three_registers() {
        let config = PipelineConfig {
            budget: 6,
            capacity: 3,
            ..Default::default()
        };
        let result = PebblePipeline::new().run_table(&sample3(), &config).unwrap();
        match result.feasibility {
            Feasibility::Feasible { schedule, verdict } => {
                assert!(verdict.is_valid(), "{}", verdict);
                assert_eq!(schedule.io_count(), 3);
            }
            other => panic!("expected a schedule, got {}", other.headline()),
        }
    }

    #[test]
    fn test_sample3_infeasible_with_one_register() {
        let config = PipelineConfig {
            budget: 3,
            capacity: 1,
            ..Default::default()
        };
        let result = PebblePipeline::new().run_table(&sample3(), &config).unwrap();
        assert!(matches!(result.feasibility, Feasibility::Infeasible));
        assert_eq!(result.feasibility.headline(), "No valid schedule exists");
    }

    #[test]
    fn test_deadline_error_is_configuration_error() {
        let table = DependencyTable::from_rows(vec![vec![0], vec![1], vec![2], vec![3]]);
        let config = PipelineConfig {
            budget: 2,
            capacity: 4,
            ..Default::default()
        };
        let err = PebblePipeline::new().run_table(&table, &config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_graph_error_is_configuration_error() {
        let table = DependencyTable::from_rows(vec![vec![0], vec![7]]);
        let err = PebblePipeline::new()
            .run_table(&table, &PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Graph(_)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unknown_is_passed_through() {
        let pipeline = PebblePipeline::with_oracle(Undecided);
        let result = pipeline
            .run_table(&sample3(), &PipelineConfig::default())
            .unwrap();
        assert!(matches!(result.feasibility, Feasibility::Unknown(_)));
        assert_eq!(result.oracle, "undecided");
    }
}

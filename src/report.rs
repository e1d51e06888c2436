//! Human-readable and JSON rendering of pipeline results

use crate::constraints::EncodingStats;
use crate::pipeline::{Feasibility, PipelineResult};
use crate::schedule::Event;
use crate::schedule_explorer::{minimal_budget, Probe, ProbeOutcome};
use crate::simulator::Verdict;
use serde::Serialize;
use std::fmt::Write;

/// Serializable view of a [`PipelineResult`].
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub graph: &'a str,
    pub budget: u32,
    pub capacity: u32,
    pub answer: &'static str,
    pub headline: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<&'a [Event]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<&'a Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_cost: Option<usize>,
    pub stats: &'a EncodingStats,
    pub oracle: &'a str,
    pub encode_ms: f64,
    pub solve_ms: f64,
}

impl<'a> Report<'a> {
    pub fn new(graph: &'a str, result: &'a PipelineResult) -> Self {
        let (answer, reason, schedule, verdict) = match &result.feasibility {
            Feasibility::Feasible { schedule, verdict } => {
                ("sat", None, Some(schedule.events()), Some(verdict))
            }
            Feasibility::Infeasible => ("unsat", None, None, None),
            Feasibility::Unknown(reason) => ("unknown", Some(reason.to_string()), None, None),
        };
        let io_cost = match verdict {
            Some(Verdict::Valid(cost)) => Some(cost.total()),
            _ => None,
        };
        Report {
            graph,
            budget: result.budget,
            capacity: result.capacity,
            answer,
            headline: result.feasibility.headline(),
            reason,
            schedule,
            verdict,
            io_cost,
            stats: &result.stats,
            oracle: &result.oracle,
            encode_ms: result.encode_time.as_secs_f64() * 1000.0,
            solve_ms: result.solve_time.as_secs_f64() * 1000.0,
        }
    }
}

pub fn to_json(graph: &str, result: &PipelineResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Report::new(graph, result))
}

/// Plain-text report: headline, schedule dump and verdict.
pub fn render(graph: &str, result: &PipelineResult, show_stats: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Graph {} with budget {} and {} registers",
        graph, result.budget, result.capacity
    );
    if show_stats {
        let _ = writeln!(out, "Encoding: {}", result.stats);
        let _ = writeln!(
            out,
            "Timing: encode {:.2?}, solve {:.2?} ({})",
            result.encode_time, result.solve_time, result.oracle
        );
    }
    let _ = writeln!(out, "{}", result.feasibility.headline());
    match &result.feasibility {
        Feasibility::Feasible { schedule, verdict } => {
            let _ = writeln!(out);
            let _ = write!(out, "{}", schedule);
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", verdict);
        }
        Feasibility::Infeasible => {}
        Feasibility::Unknown(reason) => {
            let _ = writeln!(out, "Reason: {}", reason);
        }
    }
    out
}

/// Table of sweep results plus the smallest feasible budget per capacity.
pub fn render_probes(probes: &[Probe]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>8} {:>8}  result", "capacity", "budget");
    for probe in probes {
        let result = match &probe.outcome {
            ProbeOutcome::Feasible { io_cost, valid: true } => format!("sat, I/O cost {}", io_cost),
            ProbeOutcome::Feasible { valid: false, .. } => "sat, INVALID schedule".to_string(),
            ProbeOutcome::Infeasible => "unsat".to_string(),
            ProbeOutcome::DeadlineInfeasible => "deadline infeasible".to_string(),
            ProbeOutcome::Unknown { reason } => format!("unknown ({})", reason),
            ProbeOutcome::Failed { error } => format!("error: {}", error),
        };
        let _ = writeln!(out, "{:>8} {:>8}  {}", probe.capacity, probe.budget, result);
    }

    let mut capacities: Vec<u32> = probes.iter().map(|p| p.capacity).collect();
    capacities.dedup();
    for capacity in capacities {
        match minimal_budget(probes, capacity) {
            Some(best) => {
                let _ = writeln!(
                    out,
                    "capacity {}: smallest feasible budget {}",
                    capacity, best.budget
                );
            }
            None => {
                let _ = writeln!(out, "capacity {}: no feasible budget in range", capacity);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DependencyTable;
    use crate::pipeline::{PebblePipeline, PipelineConfig};

    fn run(budget: u32, capacity: u32) -> PipelineResult {
        let table = DependencyTable::from_rows(vec![vec![0, 0], vec![0, 0], vec![1, 2]]);
        let config = PipelineConfig {
            budget,
            capacity,
            timeout: None,
        };
        PebblePipeline::new().run_table(&table, &config).unwrap()
    }

    #[test]
    fn test_render_feasible() {
        let text = render("sample3", &run(6, 3), false);
        assert!(text.contains("There is a valid schedule"));
        assert!(text.contains("Schedule VALID, I/O cost: 3"));
        assert!(text.contains("R3(3,"));
        assert!(!text.contains("Encoding:"));
    }

    #[test]
    fn test_render_infeasible_with_stats() {
        let text = render("sample3", &run(3, 1), true);
        assert!(text.contains("No valid schedule exists"));
        assert!(text.contains("Encoding:"));
    }

    #[test]
    fn test_json_report() {
        let json = to_json("sample3", &run(6, 3)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["answer"], "sat");
        assert_eq!(value["io_cost"], 3);
        assert_eq!(value["graph"], "sample3");
        assert!(value["schedule"].as_array().unwrap().len() >= 6);

        let json = to_json("sample3", &run(3, 1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["answer"], "unsat");
        assert!(value.get("schedule").is_none());
    }

    #[test]
    fn test_render_probes() {
        let probes = vec![
            Probe {
                budget: 5,
                capacity: 3,
                outcome: ProbeOutcome::Infeasible,
            },
            Probe {
                budget: 6,
                capacity: 3,
                outcome: ProbeOutcome::Feasible {
                    io_cost: 3,
                    valid: true,
                },
            },
        ];
        let text = render_probes(&probes);
        assert!(text.contains("sat, I/O cost 3"));
        assert!(text.contains("capacity 3: smallest feasible budget 6"));
    }
}

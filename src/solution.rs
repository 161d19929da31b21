//! Solution representation for Max-SC-QBF.
//!
//! A solution is the `select` vector returned by the oracle, checked against
//! the instance: the quadratic objective is recomputed directly and the
//! cover of the universe is verified.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::oracle::OracleResult;

/// Represents a solution to Max-SC-QBF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// `selection[i]` is true when variable `i` (0-indexed) is chosen
    pub selection: Vec<bool>,
    /// Direct quadratic evaluation of the selection
    pub objective: f64,
    /// Whether the chosen subsets cover the universe
    pub covers_universe: bool,
    /// Best bound reported by the oracle
    pub best_bound: Option<f64>,
    /// Optimality gap reported by the oracle (0.01 = 1%)
    pub gap: Option<f64>,
    /// Whether optimality was proven
    pub proven_optimal: bool,
    /// Oracle status
    pub status: String,
    /// Oracle that generated this solution
    pub oracle: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Solution {
    /// Create a solution from a selection, without oracle metadata.
    ///
    /// The selection is resized to the instance size; missing variables are
    /// unselected.
    pub fn from_selection(instance: &Instance, mut selection: Vec<bool>, oracle: &str) -> Self {
        if selection.len() != instance.size() {
            log::warn!(
                "Selection has {} entries for {} variables, resizing",
                selection.len(),
                instance.size()
            );
            selection.resize(instance.size(), false);
        }
        let objective = instance.quadratic_value(&selection);
        let covers_universe = instance.selection_covers(&selection);

        Solution {
            selection,
            objective,
            covers_universe,
            best_bound: None,
            gap: None,
            proven_optimal: false,
            status: String::new(),
            oracle: oracle.to_string(),
            computation_time: 0.0,
        }
    }

    /// Build from an oracle result. Returns `None` when the oracle found no
    /// incumbent (infeasible model, or no solution before the time limit).
    pub fn from_oracle(instance: &Instance, result: &OracleResult) -> Option<Self> {
        let selection = result.selection.clone()?;
        let mut solution = Self::from_selection(instance, selection, &result.oracle);

        if let Some(reported) = result.objective {
            if (reported - solution.objective).abs() > 1e-6 * reported.abs().max(1.0) {
                log::warn!(
                    "Oracle objective {} differs from direct evaluation {}",
                    reported,
                    solution.objective
                );
            }
        }

        solution.best_bound = result.best_bound;
        solution.gap = result.gap;
        solution.proven_optimal = result.is_proven_optimal();
        solution.status = result.status.to_string();
        solution.computation_time = result.elapsed;
        Some(solution)
    }

    /// Selected variables, 1-indexed as in the instance file
    pub fn selected_variables(&self) -> Vec<usize> {
        self.selection
            .iter()
            .enumerate()
            .filter(|&(_, &chosen)| chosen)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Save as pretty-printed JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.oracle)?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Objective: {}", self.objective)?;
        if let Some(bound) = self.best_bound {
            writeln!(f, "  Best bound: {}", bound)?;
        }
        if let Some(gap) = self.gap {
            writeln!(f, "  Gap: {:.4}%", gap * 100.0)?;
        }
        writeln!(f, "  Covers universe: {}", self.covers_universe)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Selected: {:?}", self.selected_variables())
    }
}

//! Optimization oracles: external MILP solvers behind a common interface.
//!
//! The formulation never solves anything itself. An [`Oracle`] receives the
//! finished [`FormulatedModel`] and returns an [`OracleResult`]: the `select`
//! values of the incumbent, its objective, the best bound and the gap.
//!
//! Backends:
//! - [`MicroLpOracle`]: pure-Rust `microlp` through `good_lp`, always built
//! - [`GurobiOracle`]: Gurobi through `grb`, requires the `gurobi` feature

pub mod microlp;

// When built with the `gurobi` feature, expose the real implementation
#[cfg(feature = "gurobi")]
mod gurobi;
#[cfg(feature = "gurobi")]
pub use gurobi::GurobiOracle;

// Otherwise provide a stub that reports the backend as unavailable
#[cfg(not(feature = "gurobi"))]
mod gurobi_stub {
	use super::{Oracle, OracleConfig, OracleError, OracleResult};
	use crate::formulation::FormulatedModel;
	use crate::run_log::RunLog;

	#[derive(Debug, Clone)]
	pub struct GurobiOracle { config: OracleConfig }

	impl GurobiOracle {
		pub fn new(config: OracleConfig) -> Self { GurobiOracle { config } }
		pub fn config(&self) -> &OracleConfig { &self.config }
	}

	impl Oracle for GurobiOracle {
		fn name(&self) -> &str { "gurobi" }
		fn solve(&self, _model: &FormulatedModel, _log: &mut RunLog) -> Result<OracleResult, OracleError> {
			Err(OracleError::Unavailable("Gurobi feature not enabled in this build".to_string()))
		}
	}
}

#[cfg(not(feature = "gurobi"))]
pub use gurobi_stub::GurobiOracle;

pub use self::microlp::MicroLpOracle;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formulation::FormulatedModel;
use crate::run_log::RunLog;

/// Oracle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Wall-clock limit in seconds
    pub time_limit: f64,
    /// Relative MIP gap at which the solver may stop
    pub mip_gap: f64,
    /// Number of threads (0 = automatic)
    pub threads: i32,
    /// Echo solver progress on the console
    pub verbose: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            time_limit: 600.0,
            mip_gap: 1e-4,
            threads: 0,
            verbose: false,
        }
    }
}

/// Hard oracle failures. Infeasibility and time limits are not errors, they
/// are reported through [`OracleStatus`].
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle failure: {0}")]
    Backend(String),
}

/// Termination status reported by the oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleStatus {
    Optimal,
    TimeLimit,
    Infeasible,
    InfeasibleOrUnbounded,
    Unbounded,
    Interrupted,
    Other(String),
}

impl std::fmt::Display for OracleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleStatus::Optimal => write!(f, "Optimal"),
            OracleStatus::TimeLimit => write!(f, "TimeLimit"),
            OracleStatus::Infeasible => write!(f, "Infeasible"),
            OracleStatus::InfeasibleOrUnbounded => write!(f, "InfeasibleOrUnbounded"),
            OracleStatus::Unbounded => write!(f, "Unbounded"),
            OracleStatus::Interrupted => write!(f, "Interrupted"),
            OracleStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Result of an oracle call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResult {
    /// Backend that produced the result
    pub oracle: String,
    pub status: OracleStatus,
    /// `select[i]` values of the incumbent, if one was found
    pub selection: Option<Vec<bool>>,
    /// Objective of the incumbent
    pub objective: Option<f64>,
    /// Best proven bound on the optimum
    pub best_bound: Option<f64>,
    /// Relative gap between incumbent and bound (0.01 = 1%)
    pub gap: Option<f64>,
    /// Wall-clock time in seconds
    pub elapsed: f64,
    /// Branch-and-bound nodes, when the backend reports them
    pub nodes_explored: Option<u64>,
    /// Simplex iterations, when the backend reports them
    pub simplex_iterations: Option<u64>,
}

impl OracleResult {
    /// Result for a model without any feasible assignment.
    pub fn infeasible(oracle: &str, elapsed: f64) -> Self {
        OracleResult {
            oracle: oracle.to_string(),
            status: OracleStatus::Infeasible,
            selection: None,
            objective: None,
            best_bound: None,
            gap: None,
            elapsed,
            nodes_explored: None,
            simplex_iterations: None,
        }
    }

    /// An incumbent exists, proven optimal or not. A non-zero gap still
    /// denotes a valid solution.
    pub fn has_incumbent(&self) -> bool {
        self.selection.is_some()
    }

    pub fn is_proven_optimal(&self) -> bool {
        self.status == OracleStatus::Optimal
    }

    pub fn is_infeasible(&self) -> bool {
        self.status == OracleStatus::Infeasible
    }

    /// Indices (0-based) of the selected variables.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selection
            .as_ref()
            .map(|s| s.iter().enumerate().filter(|&(_, &c)| c).map(|(i, _)| i).collect())
            .unwrap_or_default()
    }
}

/// An external solver that can optimize a formulated model.
pub trait Oracle {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Optimize the model. Progress and the final summary go to `log`.
    fn solve(&self, model: &FormulatedModel, log: &mut RunLog) -> Result<OracleResult, OracleError>;
}

/// Gurobi when built with the `gurobi` feature, `microlp` otherwise.
pub fn default_oracle(config: OracleConfig) -> Box<dyn Oracle> {
    #[cfg(feature = "gurobi")]
    {
        Box::new(GurobiOracle::new(config))
    }
    #[cfg(not(feature = "gurobi"))]
    {
        Box::new(MicroLpOracle::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_config_default() {
        let config = OracleConfig::default();
        assert_eq!(config.time_limit, 600.0);
        assert_eq!(config.threads, 0);
        assert!(!config.verbose);
    }

    #[test]
    fn test_infeasible_result() {
        let result = OracleResult::infeasible("microlp", 0.5);
        assert!(result.is_infeasible());
        assert!(!result.has_incumbent());
        assert!(result.selected_indices().is_empty());
        assert_eq!(result.status.to_string(), "Infeasible");
    }

    #[test]
    fn test_time_limit_incumbent_is_kept() {
        let result = OracleResult {
            oracle: "gurobi".to_string(),
            status: OracleStatus::TimeLimit,
            selection: Some(vec![true, false, true]),
            objective: Some(12.0),
            best_bound: Some(15.0),
            gap: Some(0.25),
            elapsed: 600.0,
            nodes_explored: Some(1234),
            simplex_iterations: Some(56789),
        };
        assert!(result.has_incumbent());
        assert!(!result.is_proven_optimal());
        assert_eq!(result.selected_indices(), vec![0, 2]);
    }

    #[cfg(not(feature = "gurobi"))]
    #[test]
    fn test_gurobi_stub_is_unavailable() {
        let instance = crate::instance::Instance::parse("1\n1\n1\n1\n").unwrap();
        let formulated = crate::formulation::formulate(&instance);
        let oracle = GurobiOracle::new(OracleConfig::default());

        let err = oracle.solve(&formulated, &mut RunLog::disabled()).unwrap_err();
        assert!(matches!(err, OracleError::Unavailable(_)));
    }
}

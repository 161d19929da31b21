//! Max-SC-QBF Library
//!
//! Exact linear formulation of the Maximum Set-Cover Quadratic Binary
//! Function problem: choose a subset of variables whose sets cover the
//! universe `{1..n}` and maximize `sum_i sum_j c_ij x_i x_j`.
//!
//! # Features
//!
//! - Instance parsing and validation
//! - Linearization of the quadratic objective with `n^2` pair binaries
//! - Set-cover constraints and the linear objective
//! - MILP oracles (pure-Rust `microlp`, Gurobi behind the `gurobi` feature)
//! - Random instance generation and run log reporting
//!
//! # Example
//!
//! ```no_run
//! use max_sc_qbf::formulation::formulate;
//! use max_sc_qbf::instance::Instance;
//! use max_sc_qbf::oracle::{default_oracle, OracleConfig};
//! use max_sc_qbf::run_log::RunLog;
//!
//! let instance = Instance::from_file("instance_0.txt").unwrap();
//! let model = formulate(&instance);
//!
//! let oracle = default_oracle(OracleConfig::default());
//! let mut log = RunLog::create("logs", "instance_0").unwrap();
//! let result = oracle.solve(&model, &mut log).unwrap();
//!
//! println!("Objective: {:?}", result.objective);
//! ```

pub mod instance;
pub mod model;
pub mod formulation;
pub mod oracle;
pub mod run_log;
pub mod solution;
pub mod generator;
pub mod report;

pub use formulation::{formulate, FormulatedModel};
pub use instance::Instance;
pub use solution::Solution;

//! Gurobi oracle.
//!
//! Translates the formulated model into a Gurobi MIP:
//! - one binary per `select[i]` and `pair[i][j]`
//! - the linking and covering rows as linear constraints
//! - the linear objective, maximized
//!
//! Gurobi writes its own progress log into the run log file (`LogFile`).

use std::time::Instant;

use grb::prelude::*;

use super::{Oracle, OracleConfig, OracleError, OracleResult, OracleStatus};
use crate::formulation::FormulatedModel;
use crate::model::{Comparison, LinearExpr, Sense};
use crate::run_log::RunLog;

/// Gurobi-based oracle
#[derive(Debug, Clone, Default)]
pub struct GurobiOracle {
    config: OracleConfig,
}

impl GurobiOracle {
    pub fn new(config: OracleConfig) -> Self {
        GurobiOracle { config }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }
}

fn backend(context: &'static str) -> impl Fn(grb::Error) -> OracleError {
    move |e| OracleError::Backend(format!("{}: {}", context, e))
}

fn to_expr(expr: &LinearExpr, vars: &[Var]) -> Expr {
    expr.terms
        .iter()
        .map(|&(var, coefficient)| coefficient * vars[var.0])
        .grb_sum()
}

impl Oracle for GurobiOracle {
    fn name(&self) -> &str {
        "gurobi"
    }

    fn solve(&self, formulated: &FormulatedModel, log: &mut RunLog) -> Result<OracleResult, OracleError> {
        let start = Instant::now();
        let data = formulated.model();

        let env = Env::new("")
            .map_err(|e| OracleError::Unavailable(format!("Failed to create Gurobi environment: {}", e)))?;

        let mut model = Model::with_env(data.name(), env)
            .map_err(backend("Failed to create model"))?;

        model.set_param(param::TimeLimit, self.config.time_limit)
            .map_err(backend("Failed to set time limit"))?;
        model.set_param(param::MIPGap, self.config.mip_gap)
            .map_err(backend("Failed to set MIP gap"))?;
        model.set_param(param::Threads, self.config.threads)
            .map_err(backend("Failed to set threads"))?;

        if !self.config.verbose {
            model.set_param(param::LogToConsole, 0)
                .map_err(backend("Failed to silence console output"))?;
        }

        // Gurobi appends its progress log to the run log file
        log.line(format!("Oracle gurobi: time limit {:.0}s", self.config.time_limit));
        log.flush();
        if let Some(path) = log.path() {
            model.set_param(param::LogFile, path.to_string_lossy().into_owned())
                .map_err(backend("Failed to set log file"))?;
        }

        let mut vars: Vec<Var> = Vec::with_capacity(data.num_variables());
        for v in data.variables() {
            let var = add_binvar!(model, name: &v.name)
                .map_err(|e| OracleError::Backend(format!("Failed to add variable {}: {}", v.name, e)))?;
            vars.push(var);
        }

        model.update()
            .map_err(backend("Failed to update model"))?;

        let sense = match data.objective().sense {
            Sense::Maximize => ModelSense::Maximize,
            Sense::Minimize => ModelSense::Minimize,
        };
        model.set_objective(to_expr(&data.objective().expr, &vars), sense)
            .map_err(backend("Failed to set objective"))?;

        for row in data.constraints() {
            let lhs = to_expr(&row.lhs, &vars);
            let rhs = row.rhs;
            let constr = match row.comparison {
                Comparison::LessEq => c!(lhs <= rhs),
                Comparison::GreaterEq => c!(lhs >= rhs),
            };
            model.add_constr(&row.name, constr)
                .map_err(|e| OracleError::Backend(format!("Failed to add constraint {}: {}", row.name, e)))?;
        }

        model.update()
            .map_err(backend("Failed to update model before optimization"))?;

        model.optimize()
            .map_err(backend("Optimization failed"))?;

        let status = model.status()
            .map_err(backend("Failed to get status"))?;

        let oracle_status = match status {
            Status::Optimal => OracleStatus::Optimal,
            Status::TimeLimit => OracleStatus::TimeLimit,
            Status::Infeasible => OracleStatus::Infeasible,
            Status::InfOrUnbd => OracleStatus::InfeasibleOrUnbounded,
            Status::Unbounded => OracleStatus::Unbounded,
            Status::Interrupted => OracleStatus::Interrupted,
            other => OracleStatus::Other(format!("{:?}", other)),
        };

        if status == Status::Infeasible {
            if let Some(path) = log.path() {
                let iis_path = path.with_extension("ilp");
                if model.compute_iis().is_ok() && model.write(&iis_path.to_string_lossy()).is_ok() {
                    log::warn!("Gurobi reported infeasible model; IIS written to {:?}", iis_path);
                }
            }
        }

        let solutions = model.get_attr(attr::SolCount).unwrap_or(0);
        let elapsed = start.elapsed().as_secs_f64();
        let nodes_explored = model.get_attr(attr::NodeCount).ok().map(|n| n as u64);
        let simplex_iterations = model.get_attr(attr::IterCount).ok().map(|n| n as u64);

        let result = if solutions > 0 {
            let mut values = vec![0.0; vars.len()];
            for &id in formulated.select() {
                values[id.0] = model.get_obj_attr(attr::X, &vars[id.0])
                    .map_err(backend("Failed to read solution value"))?;
            }
            OracleResult {
                oracle: self.name().to_string(),
                status: oracle_status,
                selection: Some(formulated.selection_from(&values)),
                objective: model.get_attr(attr::ObjVal).ok(),
                best_bound: model.get_attr(attr::ObjBound).ok(),
                gap: model.get_attr(attr::MIPGap).ok(),
                elapsed,
                nodes_explored,
                simplex_iterations,
            }
        } else {
            OracleResult {
                oracle: self.name().to_string(),
                status: oracle_status,
                selection: None,
                objective: None,
                best_bound: None,
                gap: None,
                elapsed,
                nodes_explored,
                simplex_iterations,
            }
        };

        log.line(format!("Oracle gurobi finished with status {}", result.status));
        log.flush();
        Ok(result)
    }
}

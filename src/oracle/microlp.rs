//! Pure-Rust oracle backed by the `microlp` solver through `good_lp`.
//!
//! The time limit and relative MIP gap of [`OracleConfig`] are handed to the
//! branch-and-bound. A run that stops on the clock keeps its incumbent along
//! with the bound and gap microlp proved so far.

use std::time::Instant;

use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, WithInitialSolution, WithMipGap, WithTimeLimit,
};

use super::{Oracle, OracleConfig, OracleError, OracleResult, OracleStatus};
use crate::formulation::FormulatedModel;
use crate::model::{Comparison, LinearExpr, Sense};
use crate::run_log::RunLog;

#[derive(Debug, Clone, Default)]
pub struct MicroLpOracle {
    config: OracleConfig,
}

impl MicroLpOracle {
    pub fn new(config: OracleConfig) -> Self {
        MicroLpOracle { config }
    }
}

impl Oracle for MicroLpOracle {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, formulated: &FormulatedModel, log: &mut RunLog) -> Result<OracleResult, OracleError> {
        let start = Instant::now();
        let model = formulated.model();

        log.line(format!(
            "Oracle microlp: {} binaries, {} rows, time limit {:.0}s, mip gap {}",
            model.num_variables(),
            model.num_constraints(),
            self.config.time_limit,
            self.config.mip_gap
        ));

        // Rows without terms reduce to `0 cmp rhs` and are decided here
        if let Some(row) = model
            .constraints()
            .iter()
            .find(|c| c.lhs.is_empty() && !c.is_satisfied(&[]))
        {
            log::info!("Constraint {} has no terms and cannot hold", row.name);
            log.line(format!("Constraint {} has no terms and cannot hold", row.name));
            let result = OracleResult::infeasible(self.name(), start.elapsed().as_secs_f64());
            log.record_result(&result);
            return Ok(result);
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|_| vars.add(variable().binary()))
            .collect();

        let objective = to_expression(&model.objective().expr, &handles);
        let unsolved = match model.objective().sense {
            Sense::Maximize => vars.maximise(objective),
            Sense::Minimize => vars.minimise(objective),
        };
        let mut problem = unsolved
            .using(good_lp::microlp)
            .with_time_limit(self.config.time_limit)
            .with_mip_gap(self.config.mip_gap as f32)
            .map_err(|e| OracleError::Backend(format!("invalid mip gap {}: {}", self.config.mip_gap, e)))?;

        for row in model.constraints().iter().filter(|c| !c.lhs.is_empty()) {
            let lhs = to_expression(&row.lhs, &handles);
            problem = problem.with(match row.comparison {
                Comparison::LessEq => constraint::leq(lhs, row.rhs),
                Comparison::GreaterEq => constraint::geq(lhs, row.rhs),
            });
        }

        // Selecting every subset is feasible whenever each element has a cover
        let warm = formulated.assignment_for(&vec![true; formulated.size()]);
        if model.is_feasible(&warm) {
            log.line(format!("Warm start objective {:.12e}", model.evaluate_objective(&warm)));
            problem = problem.with_initial_solution(handles.iter().copied().zip(warm));
        }

        if self.config.verbose {
            log::info!("Solving with microlp...");
        }

        let result = match problem.solve() {
            Ok(solution) => {
                let status = match solution.status() {
                    SolutionStatus::Optimal | SolutionStatus::GapLimit => OracleStatus::Optimal,
                    SolutionStatus::TimeLimit => OracleStatus::TimeLimit,
                };
                let values: Vec<f64> = handles.iter().map(|&v| solution.value(v).round()).collect();
                let stats = solution.into_inner().stats();
                OracleResult {
                    oracle: self.name().to_string(),
                    status,
                    selection: Some(formulated.selection_from(&values)),
                    objective: Some(model.evaluate_objective(&values)),
                    best_bound: stats.best_bound,
                    gap: stats.gap,
                    elapsed: start.elapsed().as_secs_f64(),
                    nodes_explored: Some(stats.nodes_solved),
                    simplex_iterations: Some(stats.lp_iterations),
                }
            }
            Err(ResolutionError::Infeasible) => {
                OracleResult::infeasible(self.name(), start.elapsed().as_secs_f64())
            }
            Err(ResolutionError::Unbounded) => OracleResult {
                status: OracleStatus::Unbounded,
                ..OracleResult::infeasible(self.name(), start.elapsed().as_secs_f64())
            },
            Err(ResolutionError::Other(msg)) if msg.starts_with("Time limit") => {
                log::info!("microlp: {}", msg);
                OracleResult {
                    status: OracleStatus::TimeLimit,
                    ..OracleResult::infeasible(self.name(), start.elapsed().as_secs_f64())
                }
            }
            Err(e) => {
                log.line(format!("microlp failed: {}", e));
                return Err(OracleError::Backend(format!("microlp failed: {}", e)));
            }
        };

        match (result.best_bound, result.gap) {
            (Some(bound), Some(gap)) => log::info!(
                "microlp: {} after {:.2}s, bound {}, gap {:.4}%",
                result.status,
                result.elapsed,
                bound,
                gap * 100.0
            ),
            _ => log::info!("microlp: {} after {:.2}s", result.status, result.elapsed),
        }

        log.record_result(&result);
        Ok(result)
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::with_capacity(expr.terms.len());
    for &(var, coefficient) in &expr.terms {
        out.add_mul(coefficient, handles[var.0]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::formulate;
    use crate::generator::{InstanceGenerator, SubsetSizeStrategy};
    use crate::instance::Instance;

    fn solve(text: &str) -> OracleResult {
        let instance = Instance::parse(text).unwrap();
        let formulated = formulate(&instance);
        MicroLpOracle::new(OracleConfig::default())
            .solve(&formulated, &mut RunLog::disabled())
            .unwrap()
    }

    #[test]
    fn test_scenario_a() {
        let result = solve("2\n2 2\n1 2\n1 2\n0 5\n0\n");

        assert_eq!(result.status, OracleStatus::Optimal);
        assert_eq!(result.selection, Some(vec![true, true]));
        assert!((result.objective.unwrap() - 5.0).abs() < 1e-6);
        assert!(result.gap.map_or(true, |gap| gap <= OracleConfig::default().mip_gap));
        assert!(result.nodes_explored.is_some());
    }

    #[test]
    fn test_scenario_b_is_infeasible() {
        let result = solve("3\n2 1 0\n1 2\n2\n\n1 2 3\n4 5\n6\n");

        assert!(result.is_infeasible());
        assert!(!result.has_incumbent());
        assert_eq!(result.objective, None);
    }

    #[test]
    fn test_negative_coefficients_still_cover() {
        // Every pair costs, but element 2 is only in subset 2 and element 1 only in subset 1
        let result = solve("2\n1 1\n1\n2\n-1 -3\n-2\n");

        assert_eq!(result.selection, Some(vec![true, true]));
        assert!((result.objective.unwrap() + 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_picks_cheapest_cover() {
        // Subset 3 covers everything alone; selecting 1 or 2 with it only adds cost
        let result = solve("3\n1 1 3\n1\n2\n1 2 3\n-4 0 0\n-4 0\n2\n");

        assert_eq!(result.selection, Some(vec![false, false, true]));
        assert!((result.objective.unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_written_to_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let instance = Instance::parse("2\n2 2\n1 2\n1 2\n0 5\n0\n").unwrap();
        let formulated = formulate(&instance);

        let mut log = RunLog::create(dir.path(), "scenario_a").unwrap();
        MicroLpOracle::default().solve(&formulated, &mut log).unwrap();
        drop(log);

        let text = std::fs::read_to_string(dir.path().join("scenario_a.log")).unwrap();
        assert!(text.contains("time limit 600s"));
        assert!(text.contains("Warm start objective 5.000000000000e0"));
        assert!(text.contains("Best objective 5.000000000000e0"));
        assert!(text.contains("Optimization status: Optimal"));
    }

    #[test]
    fn test_time_limit_is_enforced() {
        let instance = InstanceGenerator::new(42)
            .generate(25, SubsetSizeStrategy::Uniform, true)
            .unwrap();
        let formulated = formulate(&instance);
        let config = OracleConfig {
            time_limit: 0.5,
            ..Default::default()
        };

        let result = MicroLpOracle::new(config)
            .solve(&formulated, &mut RunLog::disabled())
            .unwrap();

        assert!(matches!(result.status, OracleStatus::TimeLimit | OracleStatus::Optimal));
        assert!(result.elapsed < 30.0, "took {:.1}s", result.elapsed);
        if let Some(selection) = &result.selection {
            assert!(instance.selection_covers(selection));
        }
        if result.status == OracleStatus::TimeLimit && result.has_incumbent() {
            let objective = result.objective.unwrap();
            if let Some(bound) = result.best_bound {
                assert!(bound >= objective - 1e-6);
            }
        }
    }

    #[test]
    fn test_negative_mip_gap_is_rejected() {
        let instance = Instance::parse("2\n2 2\n1 2\n1 2\n0 5\n0\n").unwrap();
        let config = OracleConfig {
            mip_gap: -1.0,
            ..Default::default()
        };

        let err = MicroLpOracle::new(config)
            .solve(&formulate(&instance), &mut RunLog::disabled())
            .unwrap_err();
        assert!(matches!(err, OracleError::Backend(_)));
    }
}

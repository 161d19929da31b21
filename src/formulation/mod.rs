//! Formulation of a Max-SC-QBF instance as a binary linear program.
//!
//! The model is assembled by three builders:
//! - [`QuadraticLinearizer`]: `pair[i][j]` variables and linking constraints
//! - [`SetCoverConstraintBuilder`]: one covering row per universe element
//! - [`ObjectiveAssembler`]: the linear maximize objective
//!
//! [`Formulation::build`] runs them in order and returns a [`FormulatedModel`]
//! that is never modified afterwards.

pub mod linearizer;
pub mod objective;
pub mod set_cover;

pub use linearizer::QuadraticLinearizer;
pub use objective::ObjectiveAssembler;
pub use set_cover::SetCoverConstraintBuilder;

use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::model::{LinearModel, VarId, VarRole};

/// Drives the three builders over an instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formulation {
    linearizer: QuadraticLinearizer,
    set_cover: SetCoverConstraintBuilder,
    objective: ObjectiveAssembler,
}

impl Formulation {
    pub fn new() -> Self {
        Formulation::default()
    }

    pub fn build(&self, instance: &Instance) -> FormulatedModel {
        let start = std::time::Instant::now();
        let n = instance.size();

        let mut model = LinearModel::with_capacity(
            "Max-SC-QBF",
            n + QuadraticLinearizer::pair_count(n),
            QuadraticLinearizer::constraint_count(n) + n,
        );

        let select: Vec<VarId> = (0..n)
            .map(|i| model.add_binary(format!("select_{}", i), VarRole::Select(i)))
            .collect();

        let pair = self.linearizer.linearize(&mut model, &select);
        self.set_cover.build(&mut model, instance, &select);
        self.objective.assemble(&mut model, instance, &pair);

        let formulated = FormulatedModel {
            model,
            select,
            pair,
        };
        log::info!(
            "Formulated model in {:.4}s: {}",
            start.elapsed().as_secs_f64(),
            formulated.summary()
        );
        formulated
    }
}

/// Formulate `instance` with the default builders.
pub fn formulate(instance: &Instance) -> FormulatedModel {
    Formulation::new().build(instance)
}

/// A complete model together with handles to its decision variables.
#[derive(Debug, Clone)]
pub struct FormulatedModel {
    model: LinearModel,
    select: Vec<VarId>,
    pair: Vec<Vec<VarId>>,
}

impl FormulatedModel {
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Number of source variables `n`.
    pub fn size(&self) -> usize {
        self.select.len()
    }

    pub fn select(&self) -> &[VarId] {
        &self.select
    }

    pub fn pair(&self, i: usize, j: usize) -> VarId {
        self.pair[i][j]
    }

    /// Full assignment for a selection, with every `pair` set to the product.
    /// Variables past the end of `selection` are left at zero.
    pub fn assignment_for(&self, selection: &[bool]) -> Vec<f64> {
        let chosen = |i: usize| selection.get(i).copied().unwrap_or(false);
        let mut values = vec![0.0; self.model.num_variables()];
        for (i, &var) in self.select.iter().enumerate() {
            values[var.0] = if chosen(i) { 1.0 } else { 0.0 };
        }
        for (i, row) in self.pair.iter().enumerate() {
            for (j, &var) in row.iter().enumerate() {
                values[var.0] = if chosen(i) && chosen(j) { 1.0 } else { 0.0 };
            }
        }
        values
    }

    /// Read the `select` part of a full assignment.
    pub fn selection_from(&self, values: &[f64]) -> Vec<bool> {
        self.select
            .iter()
            .map(|var| values.get(var.0).map_or(false, |&v| v > 0.5))
            .collect()
    }

    pub fn summary(&self) -> FormulationSummary {
        let n = self.size();
        FormulationSummary {
            select_variables: n,
            pair_variables: QuadraticLinearizer::pair_count(n),
            linking_constraints: QuadraticLinearizer::constraint_count(n),
            cover_constraints: self.model.num_constraints()
                - QuadraticLinearizer::constraint_count(n),
            objective_terms: self.model.objective().expr.terms.len(),
        }
    }
}

/// Size of a formulated model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulationSummary {
    pub select_variables: usize,
    pub pair_variables: usize,
    pub linking_constraints: usize,
    pub cover_constraints: usize,
    pub objective_terms: usize,
}

impl std::fmt::Display for FormulationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} select + {} pair binaries, {} linking + {} cover constraints, {} objective terms",
            self.select_variables,
            self.pair_variables,
            self.linking_constraints,
            self.cover_constraints,
            self.objective_terms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Comparison;

    const SCENARIO_A: &str = "2\n2 2\n1 2\n1 2\n0 5\n0\n";
    const SCENARIO_B: &str = "3\n2 1 0\n1 2\n2\n\n1 2 3\n4 5\n6\n";

    fn all_selections(n: usize) -> impl Iterator<Item = Vec<bool>> {
        (0..(1u32 << n)).map(move |mask| (0..n).map(|i| mask & (1 << i) != 0).collect())
    }

    #[test]
    fn test_model_shape() {
        let instance = Instance::parse(SCENARIO_B).unwrap();
        let formulated = formulate(&instance);
        let model = formulated.model();

        assert_eq!(model.num_variables(), 3 + 9);
        assert_eq!(model.num_constraints(), 27 + 3);
        assert_eq!(
            formulated.summary(),
            FormulationSummary {
                select_variables: 3,
                pair_variables: 9,
                linking_constraints: 27,
                cover_constraints: 3,
                objective_terms: 6,
            }
        );
        assert!(model
            .variables()
            .iter()
            .take(3)
            .all(|v| matches!(v.role, VarRole::Select(_))));
        assert_eq!(model.variable(formulated.pair(1, 2)).role, VarRole::Pair(1, 2));
    }

    #[test]
    fn test_objective_matches_quadratic_evaluation() {
        let instance = Instance::parse("3\n3 3 3\n1 2 3\n1 2 3\n1 2 3\n1 -2 3.5\n4 -5\n6\n").unwrap();
        let formulated = formulate(&instance);

        for selection in all_selections(3) {
            let values = formulated.assignment_for(&selection);
            assert!(formulated.model().is_feasible(&values));
            assert_eq!(
                formulated.model().evaluate_objective(&values),
                instance.quadratic_value(&selection)
            );
            assert_eq!(formulated.selection_from(&values), selection);
        }
    }

    #[test]
    fn test_scenario_a_best_assignment() {
        let instance = Instance::parse(SCENARIO_A).unwrap();
        let formulated = formulate(&instance);

        let best = all_selections(2)
            .map(|s| formulated.assignment_for(&s))
            .filter(|v| formulated.model().is_feasible(v))
            .map(|v| formulated.model().evaluate_objective(&v))
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best, 5.0);

        let both = formulated.assignment_for(&[true, true]);
        assert_eq!(formulated.model().evaluate_objective(&both), 5.0);
    }

    #[test]
    fn test_scenario_b_has_no_feasible_assignment() {
        let instance = Instance::parse(SCENARIO_B).unwrap();
        let formulated = formulate(&instance);

        let cover_3 = formulated
            .model()
            .constraints()
            .iter()
            .find(|c| c.name == "cover_3")
            .unwrap();
        assert!(cover_3.lhs.is_empty());
        assert_eq!(cover_3.comparison, Comparison::GreaterEq);

        assert!(all_selections(3)
            .map(|s| formulated.assignment_for(&s))
            .all(|v| !formulated.model().is_feasible(&v)));
    }

    #[test]
    fn test_short_selection_leaves_missing_variables_unselected() {
        let instance = Instance::parse(SCENARIO_A).unwrap();
        let formulated = formulate(&instance);

        let values = formulated.assignment_for(&[true]);
        assert_eq!(values, formulated.assignment_for(&[true, false]));
        assert_eq!(formulated.selection_from(&values), vec![true, false]);
        assert_eq!(formulated.selection_from(&[]), vec![false, false]);
    }
}

//! Set-cover constraints: every universe element must be covered by at least
//! one selected subset.

use crate::instance::Instance;
use crate::model::{Comparison, LinearExpr, LinearModel, VarId};

#[derive(Debug, Clone, Copy, Default)]
pub struct SetCoverConstraintBuilder;

impl SetCoverConstraintBuilder {
    pub fn new() -> Self {
        SetCoverConstraintBuilder
    }

    /// Emit `sum_{i : k in S_i} select[i] >= 1` for each element `k` in `1..=n`.
    ///
    /// An element that no subset contains still gets its row, with an empty
    /// left-hand side. Such a model is infeasible and the oracle reports it.
    pub fn build(&self, model: &mut LinearModel, instance: &Instance, select: &[VarId]) {
        let n = instance.size();

        // covering[k]: variables whose subset contains element k
        let mut covering: Vec<Vec<usize>> = vec![Vec::new(); n + 1];
        for (i, subset) in instance.variable_subsets().iter().enumerate() {
            for &k in subset {
                covering[k].push(i);
            }
        }

        for (k, variables) in covering.iter().enumerate().skip(1) {
            let mut lhs = LinearExpr::with_capacity(variables.len());
            for &i in variables {
                lhs.add_term(select[i], 1.0);
            }
            if lhs.is_empty() {
                log::warn!("Element {} is covered by no subset, the model is infeasible", k);
            }
            model.add_constraint(format!("cover_{}", k), lhs, Comparison::GreaterEq, 1.0);
        }
    }
}

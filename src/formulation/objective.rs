//! Linear objective over the `pair` variables.

use crate::instance::Instance;
use crate::model::{LinearExpr, LinearModel, Sense, VarId};

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectiveAssembler;

impl ObjectiveAssembler {
    pub fn new() -> Self {
        ObjectiveAssembler
    }

    /// Set `maximize sum_i sum_j c[i][j] * pair[i][j]` on `model`.
    ///
    /// Every ordered pair is visited; the matrix is not mirrored, so entries
    /// below the diagonal contribute their stored zero. Zero coefficients are
    /// left out of the term list.
    pub fn assemble(&self, model: &mut LinearModel, instance: &Instance, pair: &[Vec<VarId>]) {
        let n = instance.size();
        let mut expr = LinearExpr::with_capacity(n * (n + 1) / 2);

        for (i, row) in instance.coefficients_matrix().iter().enumerate() {
            for (j, &c) in row.iter().enumerate() {
                if c != 0.0 {
                    expr.add_term(pair[i][j], c);
                }
            }
        }

        log::debug!("Objective has {} non-zero terms", expr.terms.len());
        model.set_objective(Sense::Maximize, expr);
    }
}

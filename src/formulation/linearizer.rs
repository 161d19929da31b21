//! Exact linearization of products of binary variables.
//!
//! For every ordered pair `(i, j)`, including `i == j`, an auxiliary binary
//! `pair[i][j]` is tied to `select[i] AND select[j]` with:
//!
//! - `pair[i][j] <= select[i]`
//! - `pair[i][j] <= select[j]`
//! - `pair[i][j] >= select[i] + select[j] - 1`
//!
//! Over binary variables these three rows force `pair[i][j]` to equal the
//! product, so the quadratic objective becomes linear without a relaxation gap.

use crate::model::{Comparison, LinearExpr, LinearModel, VarId, VarRole};

#[derive(Debug, Clone, Copy, Default)]
pub struct QuadraticLinearizer;

impl QuadraticLinearizer {
    pub fn new() -> Self {
        QuadraticLinearizer
    }

    /// Number of auxiliary `pair` variables for `n` source variables.
    pub const fn pair_count(n: usize) -> usize {
        n * n
    }

    /// Number of linking constraints for `n` source variables.
    pub const fn constraint_count(n: usize) -> usize {
        3 * n * n
    }

    /// Add the `pair` variables and the three linking families to `model`.
    ///
    /// Returns the `pair` handles as an `n x n` matrix indexed `[i][j]`.
    pub fn linearize(&self, model: &mut LinearModel, select: &[VarId]) -> Vec<Vec<VarId>> {
        let n = select.len();

        let mut pair: Vec<Vec<VarId>> = Vec::with_capacity(n);
        for i in 0..n {
            let mut row = Vec::with_capacity(n);
            for j in 0..n {
                row.push(model.add_binary(format!("pair_{}_{}", i, j), VarRole::Pair(i, j)));
            }
            pair.push(row);
        }

        // select[i] = 0 forces pair[i][j] = 0
        for i in 0..n {
            for j in 0..n {
                model.add_constraint(
                    format!("i_0_implies_ij_0_{}_{}", i, j),
                    LinearExpr::with_capacity(2)
                        .term(pair[i][j], 1.0)
                        .term(select[i], -1.0),
                    Comparison::LessEq,
                    0.0,
                );
            }
        }

        // Same for select[j]
        for i in 0..n {
            for j in 0..n {
                model.add_constraint(
                    format!("j_0_implies_ij_0_{}_{}", i, j),
                    LinearExpr::with_capacity(2)
                        .term(pair[i][j], 1.0)
                        .term(select[j], -1.0),
                    Comparison::LessEq,
                    0.0,
                );
            }
        }

        // select[i] = select[j] = 1 forces pair[i][j] = 1
        for i in 0..n {
            for j in 0..n {
                let lhs = if i == j {
                    LinearExpr::with_capacity(2)
                        .term(pair[i][j], 1.0)
                        .term(select[i], -2.0)
                } else {
                    LinearExpr::with_capacity(3)
                        .term(pair[i][j], 1.0)
                        .term(select[i], -1.0)
                        .term(select[j], -1.0)
                };
                model.add_constraint(
                    format!("i_and_j_1_implies_ij_1_{}_{}", i, j),
                    lhs,
                    Comparison::GreaterEq,
                    -1.0,
                );
            }
        }

        log::debug!(
            "Linearized {} products with {} linking constraints",
            Self::pair_count(n),
            Self::constraint_count(n)
        );

        pair
    }
}

//! Solver-independent linear integer model.
//!
//! This is the hand-off format between the formulation and the optimization
//! oracle: binary variables, linear constraints `lhs (<=|>=) rhs` and one
//! linear objective. Oracle backends translate it into their own API, and
//! [`LinearModel::to_lp_string`] exports it in CPLEX LP format for any other
//! MILP solver.

use serde::{Deserialize, Serialize};

/// Feasibility tolerance used when checking assignments against constraints.
pub const FEASIBILITY_TOL: f64 = 1e-6;

/// Index of a variable inside a [`LinearModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// What a decision variable stands for in the Max-SC-QBF formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarRole {
    /// `select[i]`: variable `i` (and its subset) is chosen
    Select(usize),
    /// `pair[i][j]`: both `select[i]` and `select[j]` are chosen
    Pair(usize, usize),
}

/// A binary decision variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub role: VarRole,
}

/// Sparse linear expression `sum coef * var`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        LinearExpr { terms: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        LinearExpr {
            terms: Vec::with_capacity(capacity),
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    /// Builder-style variant of [`LinearExpr::add_term`].
    pub fn term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against a full assignment indexed by [`VarId`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(var, c)| c * values[var.0]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    LessEq,
    GreaterEq,
}

/// Linear constraint `lhs comparison rhs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub lhs: LinearExpr,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs = self.lhs.evaluate(values);
        match self.comparison {
            Comparison::LessEq => lhs <= self.rhs + FEASIBILITY_TOL,
            Comparison::GreaterEq => lhs >= self.rhs - FEASIBILITY_TOL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub sense: Sense,
    pub expr: LinearExpr,
}

/// Binary linear program: every variable is 0/1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl LinearModel {
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, 0, 0)
    }

    /// Create an empty model with containers pre-sized for the expected
    /// number of variables and constraints.
    pub fn with_capacity(name: &str, num_variables: usize, num_constraints: usize) -> Self {
        LinearModel {
            name: name.to_string(),
            variables: Vec::with_capacity(num_variables),
            constraints: Vec::with_capacity(num_constraints),
            objective: Objective {
                sense: Sense::Maximize,
                expr: LinearExpr::new(),
            },
        }
    }

    pub fn add_binary(&mut self, name: String, role: VarRole) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable { name, role });
        id
    }

    pub fn add_constraint(&mut self, name: String, lhs: LinearExpr, comparison: Comparison, rhs: f64) {
        self.constraints.push(Constraint {
            name,
            lhs,
            comparison,
            rhs,
        });
    }

    pub fn set_objective(&mut self, sense: Sense, expr: LinearExpr) {
        self.objective = Objective { sense, expr };
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective.expr.evaluate(values)
    }

    /// Constraints that the assignment violates.
    pub fn violated_constraints(&self, values: &[f64]) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values))
            .collect()
    }

    /// Check that `values` is a binary assignment satisfying every constraint.
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        values.len() == self.variables.len()
            && values
                .iter()
                .all(|&v| v.abs() < FEASIBILITY_TOL || (v - 1.0).abs() < FEASIBILITY_TOL)
            && self.constraints.iter().all(|c| c.is_satisfied(values))
    }

    /// Export in CPLEX LP format.
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("\\ Model {}\n", self.name));
        match self.objective.sense {
            Sense::Maximize => out.push_str("Maximize\n obj: "),
            Sense::Minimize => out.push_str("Minimize\n obj: "),
        }
        out.push_str(&self.fmt_lin(&self.objective.expr));
        out.push('\n');

        out.push_str("Subject To\n");
        for c in &self.constraints {
            out.push_str(&format!(
                " {}: {} {} {}\n",
                c.name,
                self.fmt_lin(&c.lhs),
                fmt_comparison(c.comparison),
                fmt_num(c.rhs)
            ));
        }

        out.push_str("Binary\n");
        for v in &self.variables {
            out.push_str(&format!(" {}\n", v.name));
        }
        out.push_str("End\n");
        out
    }

    fn fmt_lin(&self, e: &LinearExpr) -> String {
        if e.terms.is_empty() {
            // LP rows need at least one variable, a zero coefficient keeps the row
            return match self.variables.first() {
                Some(v) => format!("0 {}", v.name),
                None => "0".to_string(),
            };
        }
        let parts: Vec<String> = e
            .terms
            .iter()
            .map(|&(var, c)| {
                let name = &self.variables[var.0].name;
                if (c - 1.0).abs() < 1e-12 {
                    format!("+ {}", name)
                } else if (c + 1.0).abs() < 1e-12 {
                    format!("- {}", name)
                } else if c < 0.0 {
                    format!("- {} {}", fmt_num(-c), name)
                } else {
                    format!("+ {} {}", fmt_num(c), name)
                }
            })
            .collect();
        parts.join(" ")
    }
}

fn fmt_comparison(c: Comparison) -> &'static str {
    match c {
        Comparison::LessEq => "<=",
        Comparison::GreaterEq => ">=",
    }
}

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}

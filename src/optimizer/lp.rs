//! Solver-neutral linear program.
//!
//! Assembly writes into this model; a [`super::SolverBackend`] translates it
//! to a concrete solver. Keeping the model plain data lets tests inspect rows
//! and lets backends be swapped without touching the formulation.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub lower: f64,
    /// `None` is unbounded above
    pub upper: Option<f64>,
    pub kind: VarKind,
}

/// `Σ coef·x + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, var: VarId, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
        self
    }

    pub fn with(mut self, var: VarId, coef: f64) -> Self {
        self.add(var, coef);
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn eval(&self, value: impl Fn(VarId) -> f64) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, (var, coef)| acc + coef * value(*var))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::Le => "<=",
            Sense::Eq => "=",
            Sense::Ge => ">=",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Signed violation at `value`; zero when satisfied.
    pub fn violation(&self, value: impl Fn(VarId) -> f64) -> f64 {
        let lhs = self.expr.eval(value);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => lhs - self.rhs,
        }
    }
}

/// Minimization problem.
#[derive(Debug, Clone, Default)]
pub struct LinearProgram {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continuous(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> VarId {
        self.push(VariableDef {
            name: name.into(),
            lower,
            upper,
            kind: VarKind::Continuous,
        })
    }

    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.push(VariableDef {
            name: name.into(),
            lower: 0.0,
            upper: Some(1.0),
            kind: VarKind::Binary,
        })
    }

    fn push(&mut self, def: VariableDef) -> VarId {
        self.variables.push(def);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    pub fn add_cost(&mut self, var: VarId, coef: f64) {
        self.objective.add(var, coef);
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &VariableDef {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }
}

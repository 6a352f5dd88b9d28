use good_lp::{
    constraint, solvers::microlp::microlp, variable, Expression, ProblemVariables,
    ResolutionError, Solution, SolverModel, Variable,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use tracing::debug;

use super::lp::{LinearExpr, LinearProgram, Sense, VarId, VarKind};
use crate::config::SolverKind;
use crate::error::SolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Suboptimal,
    Infeasible,
    SolverError,
}

/// What the result extractor may ask of a finished solve.
///
/// Nothing is assumed present: a backend may report a status without an
/// objective, or omit values for some variables.
#[cfg_attr(test, mockall::automock)]
pub trait SolveOutcome: Send + Sync {
    fn status(&self) -> SolveStatus;
    fn objective(&self) -> Option<f64>;
    fn value(&self, var: VarId) -> Option<f64>;
    fn diagnostic(&self) -> Option<String>;
}

/// Concrete outcome produced by the bundled backends.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub values: Vec<f64>,
    pub diagnostic: Option<String>,
}

impl SolverReport {
    pub fn failed(status: SolveStatus, diagnostic: impl Into<String>) -> Self {
        Self {
            status,
            objective: None,
            values: Vec::new(),
            diagnostic: Some(diagnostic.into()),
        }
    }
}

impl SolveOutcome for SolverReport {
    fn status(&self) -> SolveStatus {
        self.status
    }

    fn objective(&self) -> Option<f64> {
        self.objective
    }

    fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.0).copied().filter(|v| v.is_finite())
    }

    fn diagnostic(&self) -> Option<String> {
        self.diagnostic.clone()
    }
}

/// A synchronous LP/MILP solver. Runs on a blocking thread; the optimizer
/// owns the wall-clock limit.
#[cfg_attr(test, mockall::automock)]
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn solve(&self, program: &LinearProgram) -> Result<SolverReport, SolverError>;
}

pub fn backend_for(kind: SolverKind) -> Arc<dyn SolverBackend> {
    match kind {
        SolverKind::Microlp => Arc::new(MicroLpBackend),
    }
}

/// Pure-Rust simplex with branch and bound for binaries, via `good_lp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpBackend;

impl MicroLpBackend {
    fn expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
        let mut out = Expression::from(expr.constant);
        for (var, coef) in &expr.terms {
            out += *coef * handles[var.0];
        }
        out
    }
}

impl SolverBackend for MicroLpBackend {
    fn name(&self) -> &'static str {
        SolverKind::Microlp.as_str()
    }

    fn solve(&self, program: &LinearProgram) -> Result<SolverReport, SolverError> {
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = program
            .variables()
            .iter()
            .map(|def| {
                let mut v = variable().min(def.lower);
                if let Some(upper) = def.upper {
                    v = v.max(upper);
                }
                if def.kind == VarKind::Binary {
                    v = v.binary();
                }
                vars.add(v)
            })
            .collect();

        let mut model = vars
            .minimise(Self::expression(program.objective(), &handles))
            .using(microlp);
        for row in program.constraints() {
            let lhs = Self::expression(&row.expr, &handles);
            let c = match row.sense {
                Sense::Le => constraint::leq(lhs, row.rhs),
                Sense::Ge => constraint::geq(lhs, row.rhs),
                Sense::Eq => constraint::eq(lhs, row.rhs),
            };
            model.add_constraint(c);
        }

        debug!(
            variables = program.variables().len(),
            constraints = program.constraints().len(),
            binaries = program.binary_count(),
            "microlp solve started"
        );

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|h| solution.value(*h)).collect();
                let objective = program.objective().eval(|v| values[v.0]);
                Ok(SolverReport {
                    status: SolveStatus::Optimal,
                    objective: Some(objective),
                    values,
                    diagnostic: None,
                })
            }
            Err(ResolutionError::Infeasible) => Ok(SolverReport::failed(
                SolveStatus::Infeasible,
                "microlp proved the program infeasible",
            )),
            Err(ResolutionError::Unbounded) => Ok(SolverReport::failed(
                SolveStatus::SolverError,
                "microlp reports an unbounded objective",
            )),
            Err(other) => Err(SolverError::Backend {
                backend: self.name().to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_lp() {
        // min x + 2y  s.t. x + y >= 4, x <= 3
        let mut lp = LinearProgram::new();
        let x = lp.continuous("x", 0.0, Some(3.0));
        let y = lp.continuous("y", 0.0, None);
        lp.add_cost(x, 1.0);
        lp.add_cost(y, 2.0);
        lp.add_constraint(
            "demand",
            LinearExpr::new().with(x, 1.0).with(y, 1.0),
            Sense::Ge,
            4.0,
        );

        let report = MicroLpBackend.solve(&lp).unwrap();
        assert_eq!(report.status, SolveStatus::Optimal);
        assert!((report.value(x).unwrap() - 3.0).abs() < 1e-6);
        assert!((report.value(y).unwrap() - 1.0).abs() < 1e-6);
        assert!((report.objective.unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn binary_blocks_fractional_split() {
        // max a + b with a <= 5u, b <= 5(1-u): only one side may be used
        let mut lp = LinearProgram::new();
        let a = lp.continuous("a", 0.0, Some(5.0));
        let b = lp.continuous("b", 0.0, Some(3.0));
        let u = lp.binary("u");
        lp.add_cost(a, -1.0);
        lp.add_cost(b, -1.0);
        lp.add_constraint("a_on", LinearExpr::new().with(a, 1.0).with(u, -5.0), Sense::Le, 0.0);
        lp.add_constraint("b_off", LinearExpr::new().with(b, 1.0).with(u, 5.0), Sense::Le, 5.0);

        let report = MicroLpBackend.solve(&lp).unwrap();
        assert!((report.value(a).unwrap() - 5.0).abs() < 1e-6);
        assert!(report.value(b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn infeasible_program_is_reported_not_raised() {
        let mut lp = LinearProgram::new();
        let x = lp.continuous("x", 0.0, Some(1.0));
        lp.add_constraint("impossible", LinearExpr::new().with(x, 1.0), Sense::Ge, 2.0);
        let report = MicroLpBackend.solve(&lp).unwrap();
        assert_eq!(report.status, SolveStatus::Infeasible);
        assert!(report.objective.is_none());
    }

    #[test]
    fn report_hides_missing_values() {
        let report = SolverReport {
            status: SolveStatus::Optimal,
            objective: Some(1.0),
            values: vec![1.0, f64::NAN],
            diagnostic: None,
        };
        assert_eq!(report.value(VarId(0)), Some(1.0));
        assert_eq!(report.value(VarId(1)), None);
        assert_eq!(report.value(VarId(7)), None);
    }
}

pub mod assemble;
pub mod backend;
pub mod dispatch;
pub mod lp;

pub use assemble::{
    AssembledProgram, BusSlackVars, ComponentVars, ExclusivitySet, SimultaneousUse, VariableMap,
};
#[cfg(test)]
pub use backend::{MockSolveOutcome, MockSolverBackend};
pub use backend::{backend_for, MicroLpBackend, SolveOutcome, SolveStatus, SolverBackend, SolverReport};
pub use dispatch::{dispatch, DispatchOptimizer, DispatchState, OptimizerSettings};
pub use lp::{LinearConstraint, LinearExpr, LinearProgram, Sense, VarId, VarKind, VariableDef};

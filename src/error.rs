use itertools::Itertools;
use thiserror::Error;

/// A technology parameter or exogenous input is missing or physically meaningless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{technology}: required key `{key}` is missing")]
    MissingKey { technology: String, key: String },

    #[error("{technology}: key `{key}` is not part of the `{kind}` key set")]
    UnknownKey {
        technology: String,
        kind: String,
        key: String,
    },

    #[error("technology `{0}` is not defined in the catalog")]
    MissingTechnology(String),

    #[error("{technology}: expected a `{expected}` spec, found `{actual}`")]
    KindMismatch {
        technology: String,
        expected: String,
        actual: String,
    },

    #[error("{technology}: `{field}` = {value} is out of domain (expected {expected})")]
    OutOfDomain {
        technology: String,
        field: String,
        value: f64,
        expected: &'static str,
    },

    #[error("{technology}: exogenous input `{input}` was not supplied")]
    MissingInput {
        technology: String,
        input: &'static str,
    },

    #[error("series `{series}` has {actual} values, horizon needs {expected}")]
    SeriesLength {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("horizon of {0} hours is not supported (use 168, 720 or 8760)")]
    UnsupportedHorizon(usize),
}

impl ParameterError {
    pub(crate) fn out_of_domain(
        technology: &str,
        field: impl Into<String>,
        value: f64,
        expected: &'static str,
    ) -> Self {
        Self::OutOfDomain {
            technology: technology.to_string(),
            field: field.into(),
            value,
            expected,
        }
    }
}

/// One defect found while building a network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralProblem {
    #[error("bus `{0}` has no attached components")]
    OrphanBus(String),

    #[error("component `{component}` is bound to undeclared bus `{bus}`")]
    UndeclaredBus { component: String, bus: String },

    #[error("component `{component}`: `{field}` is not a finite number")]
    UndefinedCoefficient { component: String, field: String },

    #[error(
        "component `{component}` ({formula}) needs {expected_inputs} input(s) and \
         {expected_outputs} output(s), got {inputs}/{outputs}"
    )]
    PortMismatch {
        component: String,
        formula: String,
        expected_inputs: usize,
        expected_outputs: usize,
        inputs: usize,
        outputs: usize,
    },

    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("load `{load}` repeats demand already declared by `{existing}` on bus `{bus}`")]
    DoubleCountedDemand {
        load: String,
        existing: String,
        bus: String,
    },

    #[error("bus `{bus}`: slack penalty must be strictly positive, got {value}")]
    NonPositivePenalty { bus: String, value: f64 },
}

/// A malformed network. Lists every problem, not just the first one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("network is malformed: {}", .problems.iter().join("; "))]
pub struct StructuralError {
    pub problems: Vec<StructuralProblem>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("solver `{backend}` exceeded the {seconds:.3}s wall-clock limit")]
    Timeout { backend: String, seconds: f64 },

    #[error("solver `{backend}` failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("solver task aborted: {0}")]
    Aborted(String),
}

/// Reported infeasibility. The slack design should make this unreachable,
/// so it points at the hard bounds that have no slack path.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("linear program is infeasible: {detail}")]
pub struct InfeasibleError {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown carbon tier `{0}` (expected VCC, CCC or PGC)")]
pub struct UnknownTierError(pub String);

#[derive(Debug, Error)]
pub enum NexusError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Infeasible(#[from] InfeasibleError),

    #[error(transparent)]
    UnknownTier(#[from] UnknownTierError),

    #[error("optimizer cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },
}

pub type Result<T, E = NexusError> = std::result::Result<T, E>;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use tracing::{debug, info, warn};

use super::assemble::{unslackened_buses, AssembledProgram, ExclusivitySet};
use super::backend::{SolveOutcome, SolveStatus, SolverBackend, SolverReport};
use crate::config::Config;
use crate::domain::{Horizon, SocPolicy};
use crate::error::{InfeasibleError, NexusError, SolverError};
use crate::network::Network;
use crate::results::{DispatchResult, ResultExtractor};

/// Optimizer lifecycle. `solve` is legal only from `Built`; the three
/// terminal states never move again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Unbuilt,
    Built,
    Solved(SolveStatus),
    Infeasible,
    SolverError,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Unbuilt => f.write_str("unbuilt"),
            DispatchState::Built => f.write_str("built"),
            DispatchState::Solved(status) => write!(f, "solved ({status})"),
            DispatchState::Infeasible => f.write_str("infeasible"),
            DispatchState::SolverError => f.write_str("in solver error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub horizon: Horizon,
    pub soc_policy: SocPolicy,
    pub timeout: Duration,
    pub storage_exclusivity: bool,
}

impl From<&Config> for OptimizerSettings {
    fn from(config: &Config) -> Self {
        Self {
            horizon: config.horizon.hours,
            soc_policy: config.horizon.soc_policy,
            timeout: config.solver.timeout(),
            storage_exclusivity: config.solver.storage_exclusivity,
        }
    }
}

/// Formulates one network as a linear program and solves it once.
///
/// Exclusivity of storage charge and discharge is enforced lazily: the
/// relaxation is solved first, and binaries are added only at the snapshots
/// where a unit was found doing both, until none remain.
pub struct DispatchOptimizer<'n> {
    network: &'n Network,
    backend: Arc<dyn SolverBackend>,
    settings: OptimizerSettings,
    state: DispatchState,
    exclusive: ExclusivitySet,
    program: Option<Arc<AssembledProgram>>,
}

impl<'n> DispatchOptimizer<'n> {
    pub fn new(
        network: &'n Network,
        backend: Arc<dyn SolverBackend>,
        settings: OptimizerSettings,
    ) -> Self {
        Self {
            network,
            backend,
            settings,
            state: DispatchState::Unbuilt,
            exclusive: ExclusivitySet::new(),
            program: None,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn program(&self) -> Option<&AssembledProgram> {
        self.program.as_deref()
    }

    /// Creates variables and constraints from the network.
    pub fn build(&mut self) -> Result<(), NexusError> {
        if self.state != DispatchState::Unbuilt {
            return Err(self.illegal("build"));
        }
        self.network.check()?;
        self.network.check_horizon(self.settings.horizon)?;
        self.assemble()?;
        self.state = DispatchState::Built;
        Ok(())
    }

    fn assemble(&mut self) -> Result<(), NexusError> {
        let assembled = AssembledProgram::assemble(
            self.network,
            self.settings.horizon,
            self.settings.soc_policy,
            &self.exclusive,
        )?;
        debug!(
            variables = assembled.program.variables().len(),
            constraints = assembled.program.constraints().len(),
            binaries = assembled.program.binary_count(),
            "program assembled"
        );
        self.program = Some(Arc::new(assembled));
        Ok(())
    }

    /// Solves the built program.
    ///
    /// Solver failures and timeouts come back as a failed [`DispatchResult`]
    /// with a diagnostic; infeasibility is an error naming the buses that
    /// have no slack path.
    pub async fn solve(&mut self) -> Result<DispatchResult, NexusError> {
        if self.state != DispatchState::Built {
            return Err(self.illegal("solve"));
        }

        // One limit for the whole dispatch, across every re-solve.
        let deadline = Instant::now() + self.settings.timeout;
        let mut attempts = 0usize;

        loop {
            let program = self
                .program
                .clone()
                .ok_or_else(|| self.illegal("solve"))?;

            attempts += 1;
            let report = match self.run_backend(Arc::clone(&program), deadline).await {
                Ok(report) => report,
                Err(err) => {
                    warn!(error = %err, attempts, "solve failed, returning empty dispatch");
                    self.state = DispatchState::SolverError;
                    return Ok(DispatchResult::failed(
                        self.settings.horizon,
                        SolveStatus::SolverError,
                        err.to_string(),
                    ));
                }
            };

            if report.status() == SolveStatus::Infeasible {
                self.state = DispatchState::Infeasible;
                let mut detail = report
                    .diagnostic()
                    .unwrap_or_else(|| "solver reported infeasibility".into());
                let exposed = unslackened_buses(self.network);
                if !exposed.is_empty() {
                    detail.push_str(&format!("; hard balances on {}", exposed.join(", ")));
                }
                warn!(%detail, "program infeasible");
                return Err(InfeasibleError { detail }.into());
            }

            if self.settings.storage_exclusivity
                && matches!(report.status(), SolveStatus::Optimal | SolveStatus::Suboptimal)
            {
                let overlaps = program.simultaneous_use(|v| report.value(v));
                let fresh: Vec<_> = overlaps
                    .iter()
                    .map(|o| (o.component, o.snapshot))
                    .filter(|key| !self.exclusive.contains(key))
                    .collect();
                if !fresh.is_empty() {
                    info!(
                        snapshots = fresh.len(),
                        "simultaneous charge and discharge found, gating with binaries"
                    );
                    self.exclusive.extend(fresh);
                    self.assemble()?;
                    continue;
                }
            }

            let result = ResultExtractor::extract(&report, &program, self.network);
            self.state = if result.is_failed() {
                DispatchState::SolverError
            } else {
                DispatchState::Solved(report.status())
            };
            info!(
                run_id = %result.run_id,
                status = %result.solver_status,
                objective = ?result.objective,
                "dispatch finished"
            );
            return Ok(result);
        }
    }

    async fn run_backend(
        &self,
        program: Arc<AssembledProgram>,
        deadline: Instant,
    ) -> Result<SolverReport, SolverError> {
        let backend = Arc::clone(&self.backend);
        let name = backend.name();
        let timed_out = || SolverError::Timeout {
            backend: name.to_string(),
            seconds: self.settings.timeout.as_secs_f64(),
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out());
        }
        // A timed-out blocking solve is detached and runs to completion.
        let task = tokio::task::spawn_blocking(move || backend.solve(&program.program));
        match tokio::time::timeout(remaining, task).await {
            Err(_) => Err(timed_out()),
            Ok(Err(join)) => Err(SolverError::Aborted(join.to_string())),
            Ok(Ok(outcome)) => outcome,
        }
    }

    fn illegal(&self, action: &'static str) -> NexusError {
        NexusError::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }
}

/// Builds and solves `network` in one call.
pub async fn dispatch(
    network: &Network,
    backend: Arc<dyn SolverBackend>,
    settings: OptimizerSettings,
) -> Result<DispatchResult, NexusError> {
    let mut optimizer = DispatchOptimizer::new(network, backend, settings);
    optimizer.build()?;
    optimizer.solve().await
}

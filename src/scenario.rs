//! What-if scenarios.
//!
//! Each scenario owns its configuration, catalog and inputs and builds its
//! own network, so scenarios run as independent tokio tasks with nothing
//! shared but the solver backend.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::carbon::{CarbonRevenueEngine, CarbonTier, RevenueBreakdown};
use crate::config::{Config, ScenarioConfig};
use crate::domain::TimeSeriesInputs;
use crate::economics::{EconomicsAssessor, EconomicsReport};
use crate::error::NexusError;
use crate::network::ReferenceNexus;
use crate::optimizer::{dispatch, OptimizerSettings, SolverBackend};
use crate::results::{DispatchResult, ResultSummary};
use crate::technology::TechnologyCatalog;
use crate::telemetry::scenario_span;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub config: Config,
    pub catalog: TechnologyCatalog,
    pub inputs: TimeSeriesInputs,
    pub carbon_tier: CarbonTier,
    pub water_access_improvement: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: DispatchResult,
    /// Absent when the dispatch failed
    pub revenue: Option<RevenueBreakdown>,
    pub economics: Option<EconomicsReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub summary: ResultSummary,
    pub revenue: Option<RevenueBreakdown>,
}

impl ScenarioOutcome {
    pub fn report(&self) -> ScenarioReport {
        let mut summary = self.result.summary();
        summary.economics = self.economics.clone();
        ScenarioReport {
            name: self.name.clone(),
            summary,
            revenue: self.revenue.clone(),
        }
    }
}

impl Scenario {
    /// Applies one scenario's overrides to the base run.
    pub fn from_config(
        base: &Config,
        scenario: &ScenarioConfig,
        catalog: &TechnologyCatalog,
        inputs: &TimeSeriesInputs,
    ) -> Result<Self, NexusError> {
        let mut config = base.clone();
        if let Some(policy) = scenario.soc_policy {
            config.horizon.soc_policy = policy;
        }
        config.scenarios.clear();

        let mut inputs = inputs.window(config.horizon.hours)?;
        scale(&mut inputs.electricity_demand, scenario.demand_scale);
        scale(&mut inputs.heat_demand, scenario.demand_scale);
        scale(&mut inputs.water_demand, scenario.demand_scale);
        scale(&mut inputs.pm10, scenario.pm10_scale);

        Ok(Self {
            name: scenario.name.clone(),
            config,
            catalog: catalog.clone(),
            inputs,
            carbon_tier: CarbonTier::from_name(&scenario.carbon_tier)?,
            water_access_improvement: scenario.water_access_improvement,
        })
    }

    /// The base run as a single scenario.
    pub fn baseline(
        config: &Config,
        catalog: &TechnologyCatalog,
        inputs: &TimeSeriesInputs,
    ) -> Result<Self, NexusError> {
        Self::from_config(
            config,
            &ScenarioConfig {
                name: "baseline".into(),
                soc_policy: None,
                demand_scale: 1.0,
                pm10_scale: 1.0,
                carbon_tier: CarbonTier::Vcc.to_string(),
                water_access_improvement: false,
            },
            catalog,
            inputs,
        )
    }

    pub async fn run(self, backend: Arc<dyn SolverBackend>) -> Result<ScenarioOutcome, NexusError> {
        let network = ReferenceNexus::build(&self.catalog, &self.inputs, &self.config)?;
        let result = dispatch(&network, backend, OptimizerSettings::from(&self.config)).await?;

        let (revenue, economics) = if result.is_failed() {
            (None, None)
        } else {
            let engine = CarbonRevenueEngine::from_config(&self.config.carbon);
            let revenue = engine.breakdown(
                result.co2_avoided_tons(),
                self.carbon_tier,
                self.water_access_improvement,
            )?;
            let economics = EconomicsAssessor::from_config(&self.config.economics).assess(
                &self.catalog,
                &network,
                &result,
            )?;
            (Some(revenue), Some(economics))
        };
        info!(
            scenario = %self.name,
            status = ?result.status,
            objective = ?result.objective,
            co2_avoided_t = result.co2_avoided_tons(),
            system_lcoe = ?economics.as_ref().and_then(|e| e.system_lcoe),
            "scenario finished"
        );
        Ok(ScenarioOutcome {
            name: self.name,
            result,
            revenue,
            economics,
        })
    }
}

fn scale(series: &mut [f64], factor: f64) {
    if factor != 1.0 {
        series.iter_mut().for_each(|v| *v *= factor);
    }
}

/// Runs every scenario on its own task. Outcomes keep the input order.
pub async fn run_scenarios(
    scenarios: Vec<Scenario>,
    backend: Arc<dyn SolverBackend>,
) -> Vec<(String, Result<ScenarioOutcome, NexusError>)> {
    let handles: Vec<_> = scenarios
        .into_iter()
        .map(|scenario| {
            let name = scenario.name.clone();
            let span = scenario_span(&name, scenario.config.horizon.hours.hours());
            let task = tokio::spawn(scenario.run(Arc::clone(&backend)).instrument(span));
            (name, task)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join) => {
                warn!(scenario = %name, error = %join, "scenario task aborted");
                Err(crate::error::SolverError::Aborted(join.to_string()).into())
            }
        };
        outcomes.push((name, outcome));
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Horizon, SocPolicy};

    fn inputs() -> TimeSeriesInputs {
        TimeSeriesInputs::constant(Horizon::Week, 400.0, 150.0, 20.0, 9.0, 120.0)
    }

    #[test]
    fn overrides_are_applied_to_a_private_copy() {
        let base = Config::default();
        let catalog = TechnologyCatalog::reference().unwrap();
        let sc = ScenarioConfig {
            name: "dusty".into(),
            soc_policy: Some(SocPolicy::Cyclic),
            demand_scale: 1.5,
            pm10_scale: 3.0,
            carbon_tier: "pgc".into(),
            water_access_improvement: true,
        };
        let scenario = Scenario::from_config(&base, &sc, &catalog, &inputs()).unwrap();
        assert_eq!(scenario.config.horizon.soc_policy, SocPolicy::Cyclic);
        assert_eq!(base.horizon.soc_policy, SocPolicy::Initial);
        assert_eq!(scenario.inputs.electricity_demand[0], 600.0);
        assert_eq!(scenario.inputs.pm10[10], 360.0);
        assert_eq!(scenario.inputs.wind_speed[10], 9.0);
        assert_eq!(scenario.carbon_tier, CarbonTier::Pgc);
    }

    #[test]
    fn unknown_tier_fails_before_solving() {
        let sc = ScenarioConfig {
            name: "bad".into(),
            soc_policy: None,
            demand_scale: 1.0,
            pm10_scale: 1.0,
            carbon_tier: "platinum".into(),
            water_access_improvement: false,
        };
        let err = Scenario::from_config(
            &Config::default(),
            &sc,
            &TechnologyCatalog::reference().unwrap(),
            &inputs(),
        )
        .unwrap_err();
        assert!(matches!(err, NexusError::UnknownTier(_)));
    }
}

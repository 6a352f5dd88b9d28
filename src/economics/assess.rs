use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::finance::{annualize, levelized_cost};
use crate::config::EconomicsConfig;
use crate::domain::Commodity;
use crate::error::{NexusError, ParameterError};
use crate::formulas::Direction;
use crate::network::{Component, Network};
use crate::results::{ComponentSeries, DispatchResult};
use crate::technology::TechnologyCatalog;

const HOURS_PER_YEAR: f64 = 8760.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnologyEconomics {
    pub capex: f64,
    pub lifetime_years: u32,
    pub annualized_capex: f64,
    /// Electricity plus heat delivered, kWh per year
    pub annual_energy_kwh: f64,
    /// USD/kWh, absent for units that deliver no energy
    pub lcoe: Option<f64>,
}

/// Yearly cost picture of one dispatch, scaled up from the solved horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicsReport {
    pub discount_rate: f64,
    pub technologies: BTreeMap<String, TechnologyEconomics>,
    pub annualized_capex: f64,
    /// Purchased energy, fuel, feedstock and storage cycling, USD per year.
    /// Slack penalties are not costs and are left out.
    pub annual_operating_cost: f64,
    /// Electricity and heat reaching the loads, kWh per year
    pub annual_energy_served_kwh: f64,
    /// Annualized capex plus operating cost per kWh served
    pub system_lcoe: Option<f64>,
}

/// Annualizes technology capex and levelizes it over dispatched energy.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicsAssessor {
    config: EconomicsConfig,
}

impl EconomicsAssessor {
    pub fn new(config: EconomicsConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &EconomicsConfig) -> Self {
        Self::new(config.clone())
    }

    pub fn lifetime(&self, technology: &str) -> u32 {
        self.config
            .lifetimes
            .get(technology)
            .copied()
            .unwrap_or(self.config.lifetime_years)
    }

    pub fn assess(
        &self,
        catalog: &TechnologyCatalog,
        network: &Network,
        result: &DispatchResult,
    ) -> Result<EconomicsReport, NexusError> {
        let rate = self.config.discount_rate;
        let to_year = HOURS_PER_YEAR / (result.horizon.hours() as f64 * result.horizon.step_hours());

        let mut technologies = BTreeMap::new();
        for spec in catalog.iter() {
            let capex = spec.get("capex")?;
            if !capex.is_finite() || capex < 0.0 {
                return Err(ParameterError::out_of_domain(&spec.name, "capex", capex, ">= 0").into());
            }
            let lifetime = self.lifetime(&spec.name);
            if lifetime == 0 {
                return Err(ParameterError::out_of_domain(
                    &spec.name,
                    "lifetime_years",
                    0.0,
                    "at least one year",
                )
                .into());
            }
            let annual_energy = energy_delivered(network, result, &spec.name) * to_year;
            technologies.insert(
                spec.name.clone(),
                TechnologyEconomics {
                    capex,
                    lifetime_years: lifetime,
                    annualized_capex: annualize(capex, rate, lifetime),
                    annual_energy_kwh: annual_energy,
                    lcoe: levelized_cost(capex, 0.0, annual_energy, rate, lifetime),
                },
            );
        }

        let annualized_capex = technologies.values().map(|t| t.annualized_capex).sum::<f64>();
        let annual_operating_cost = operating_cost(network, result) * to_year;
        let served = energy_served(network, result) * to_year;
        let system_lcoe =
            (served > 0.0).then(|| (annualized_capex + annual_operating_cost) / served);
        debug!(
            annualized_capex,
            annual_operating_cost,
            served_kwh = served,
            ?system_lcoe,
            "economics assessed"
        );
        Ok(EconomicsReport {
            discount_rate: rate,
            technologies,
            annualized_capex,
            annual_operating_cost,
            annual_energy_served_kwh: served,
            system_lcoe,
        })
    }
}

fn carries_energy(network: &Network, bus: &str) -> bool {
    network.bus_id(bus).is_some_and(|id| {
        matches!(network.bus(id).commodity, Commodity::Electricity | Commodity::Heat)
    })
}

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Electricity and heat put on the network by one component over the horizon.
fn energy_delivered(network: &Network, result: &DispatchResult, name: &str) -> f64 {
    let Some(id) = network.component_id(name) else {
        return 0.0;
    };
    let dt = result.horizon.step_hours();
    let delivered = match (network.component(id), result.components.get(name)) {
        (Component::Generator(g), Some(ComponentSeries::Flow { values }))
            if carries_energy(network, &g.bus) =>
        {
            sum(values)
        }
        (Component::Converter(c), Some(ComponentSeries::Flow { values })) => c
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Output && carries_energy(network, &p.bus))
            .map(|p| {
                values
                    .iter()
                    .enumerate()
                    .map(|(t, v)| p.coefficient.at(t) * v)
                    .sum::<f64>()
            })
            .sum(),
        (Component::Storage(s), Some(ComponentSeries::Storage { discharge, .. }))
            if carries_energy(network, &s.bus) =>
        {
            sum(discharge)
        }
        _ => 0.0,
    };
    delivered * dt
}

/// Marginal and cycling costs of the dispatch, without slack penalties.
fn operating_cost(network: &Network, result: &DispatchResult) -> f64 {
    let dt = result.horizon.step_hours();
    network
        .components()
        .map(|(_, component)| {
            match (component, result.components.get(component.name())) {
                (Component::Generator(g), Some(ComponentSeries::Flow { values })) => {
                    g.marginal_cost * sum(values)
                }
                (Component::Converter(c), Some(ComponentSeries::Flow { values })) => {
                    c.marginal_cost * sum(values)
                }
                (
                    Component::Storage(s),
                    Some(ComponentSeries::Storage {
                        charge, discharge, ..
                    }),
                ) => s.cycle_cost * (sum(charge) + sum(discharge)),
                _ => 0.0,
            }
        })
        .sum::<f64>()
        * dt
}

/// Electricity and heat demand less what went unserved.
fn energy_served(network: &Network, result: &DispatchResult) -> f64 {
    let dt = result.horizon.step_hours();
    let demand = network
        .components()
        .filter_map(|(_, component)| match component {
            Component::Load(l) if carries_energy(network, &l.bus) => Some(
                result
                    .horizon
                    .snapshots()
                    .map(|t| l.demand.at(t))
                    .sum::<f64>(),
            ),
            _ => None,
        })
        .sum::<f64>()
        * dt;
    let unserved = network
        .buses()
        .filter(|(_, bus)| carries_energy(network, &bus.name))
        .map(|(_, bus)| result.unserved(&bus.name))
        .sum::<f64>();
    (demand - unserved).max(0.0)
}

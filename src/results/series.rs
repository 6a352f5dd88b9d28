use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Horizon;
use crate::economics::EconomicsReport;
use crate::formulas::Direction;
use crate::network::{Component, Network};
use crate::optimizer::SolveStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Optimal,
    Suboptimal,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentSeries {
    /// Generator output or converter reference flow
    Flow { values: Vec<f64> },
    Storage {
        charge: Vec<f64>,
        discharge: Vec<f64>,
        /// Stored amount at each snapshot boundary, horizon + 1 points.
        /// Absolute, in the bus unit times hours (kWh, kWh thermal, m3),
        /// not a fraction of capacity.
        soc: Vec<f64>,
    },
    Load { demand: Vec<f64> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusSlackSeries {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortage: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surplus: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceResidual {
    pub bus: String,
    pub snapshot: usize,
    pub residual: f64,
    /// Series with no value at this snapshot
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// Outcome of one dispatch run. A failed run has the same shape with empty
/// series, so callers never branch on missing fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub horizon: Horizon,
    pub status: ResultStatus,
    pub solver_status: SolveStatus,
    pub objective: Option<f64>,
    pub diagnostic: Option<String>,
    pub components: BTreeMap<String, ComponentSeries>,
    pub slacks: BTreeMap<String, BusSlackSeries>,
    /// kg CO2 avoided per snapshot
    pub co2_avoided_kg: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub run_id: Uuid,
    pub status: ResultStatus,
    pub objective: Option<f64>,
    pub diagnostic: Option<String>,
    pub totals: BTreeMap<String, f64>,
    pub unserved: BTreeMap<String, f64>,
    pub co2_avoided_t: f64,
    /// Filled in by the scenario runner for successful runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub economics: Option<EconomicsReport>,
}

impl DispatchResult {
    pub fn failed(horizon: Horizon, solver_status: SolveStatus, diagnostic: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            horizon,
            status: ResultStatus::Failed,
            solver_status,
            objective: None,
            diagnostic: Some(diagnostic.into()),
            components: BTreeMap::new(),
            slacks: BTreeMap::new(),
            co2_avoided_kg: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ResultStatus::Failed
    }

    /// Energy or mass moved over the horizon: output for flows, discharge
    /// for storage, demand for loads.
    pub fn total(&self, component: &str) -> Option<f64> {
        let dt = self.horizon.step_hours();
        let sum = match self.components.get(component)? {
            ComponentSeries::Flow { values } => values.iter().sum::<f64>(),
            ComponentSeries::Storage { discharge, .. } => discharge.iter().sum(),
            ComponentSeries::Load { demand } => demand.iter().sum(),
        };
        Some(sum * dt)
    }

    pub fn unserved(&self, bus: &str) -> f64 {
        self.slacks
            .get(bus)
            .and_then(|s| s.shortage.as_ref())
            .map_or(0.0, |v| v.iter().sum::<f64>() * self.horizon.step_hours())
    }

    pub fn co2_avoided_tons(&self) -> f64 {
        crate::carbon::avoided_tons(&self.co2_avoided_kg)
    }

    /// Balance of every bus and snapshot recomputed from the extracted
    /// series. Components skipped during extraction count as zero; series
    /// too short for the horizon count as zero and are named in
    /// [`BalanceResidual::missing`].
    pub fn balance_residuals(&self, network: &Network) -> Vec<BalanceResidual> {
        if self.is_failed() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for (_, bus) in network.buses() {
            for t in self.horizon.snapshots() {
                let mut net = 0.0;
                let mut missing = Vec::new();
                let mut value = |name: &str, series: &[f64]| {
                    series.get(t).copied().unwrap_or_else(|| {
                        missing.push(name.to_string());
                        0.0
                    })
                };
                for (_, component) in network.components() {
                    let name = component.name();
                    match (component, self.components.get(name)) {
                        (Component::Generator(g), Some(ComponentSeries::Flow { values }))
                            if g.bus == bus.name =>
                        {
                            net += value(name, values);
                        }
                        (Component::Converter(c), Some(ComponentSeries::Flow { values }))
                            if c.ports.iter().any(|p| p.bus == bus.name) =>
                        {
                            let flow = value(name, values);
                            for port in c.ports.iter().filter(|p| p.bus == bus.name) {
                                let port_flow = port.coefficient.at(t) * flow;
                                net += match port.direction {
                                    Direction::Output => port_flow,
                                    Direction::Input => -port_flow,
                                };
                            }
                        }
                        (
                            Component::Storage(s),
                            Some(ComponentSeries::Storage {
                                charge, discharge, ..
                            }),
                        ) if s.bus == bus.name => {
                            net += value(name, discharge) - value(name, charge);
                        }
                        (Component::Load(l), _) if l.bus == bus.name => {
                            net -= l.demand.at(t);
                        }
                        _ => {}
                    }
                }
                if let Some(slack) = self.slacks.get(&bus.name) {
                    let slack_name = format!("{}.slack", bus.name);
                    if let Some(shortage) = &slack.shortage {
                        net += value(&slack_name, shortage);
                    }
                    if let Some(surplus) = &slack.surplus {
                        net -= value(&slack_name, surplus);
                    }
                }
                missing.dedup();
                if !missing.is_empty() {
                    debug!(bus = %bus.name, snapshot = t, ?missing, "series shorter than horizon");
                }
                out.push(BalanceResidual {
                    bus: bus.name.clone(),
                    snapshot: t,
                    residual: net,
                    missing,
                });
            }
        }
        out
    }

    pub fn max_balance_residual(&self, network: &Network) -> f64 {
        self.balance_residuals(network)
            .iter()
            .map(|r| r.residual.abs())
            .fold(0.0, f64::max)
    }

    pub fn summary(&self) -> ResultSummary {
        let totals = self
            .components
            .keys()
            .filter_map(|name| self.total(name).map(|v| (name.clone(), v)))
            .collect();
        let unserved = self
            .slacks
            .iter()
            .filter(|(_, s)| s.shortage.is_some())
            .map(|(bus, _)| (bus.clone(), self.unserved(bus)))
            .collect();
        ResultSummary {
            run_id: self.run_id,
            status: self.status,
            objective: self.objective,
            diagnostic: self.diagnostic.clone(),
            totals,
            unserved,
            co2_avoided_t: self.co2_avoided_tons(),
            economics: None,
        }
    }
}

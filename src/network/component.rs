use serde::{Deserialize, Serialize};

use crate::domain::{Commodity, Horizon};
use crate::error::ParameterError;
use crate::formulas::{Direction, Exogenous, PortSignature, StorageParams, Technology};

/// A per-snapshot value, either flat or one value per snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Constant(f64),
    Series(Vec<f64>),
}

impl Profile {
    /// Value at snapshot `t`. Series shorter than the horizon are caught by
    /// [`crate::network::Network::check_horizon`] before this is used.
    pub fn at(&self, t: usize) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Series(s) => s.get(t).copied().unwrap_or(f64::NAN),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Profile::Constant(v) => v.is_finite(),
            Profile::Series(s) => s.iter().all(|v| v.is_finite()),
        }
    }

    pub fn series_len(&self) -> Option<usize> {
        match self {
            Profile::Constant(_) => None,
            Profile::Series(s) => Some(s.len()),
        }
    }

    fn check_len(&self, series: String, horizon: Horizon) -> Result<(), ParameterError> {
        match self.series_len() {
            Some(actual) if actual != horizon.hours() => Err(ParameterError::SeriesLength {
                series,
                expected: horizon.hours(),
                actual,
            }),
            _ => Ok(()),
        }
    }
}

impl From<f64> for Profile {
    fn from(v: f64) -> Self {
        Profile::Constant(v)
    }
}

impl From<Vec<f64>> for Profile {
    fn from(v: Vec<f64>) -> Self {
        Profile::Series(v)
    }
}

/// Binding of a converter to a bus. `coefficient` is the flow across the
/// port per unit of the converter's reference flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub bus: String,
    pub direction: Direction,
    pub coefficient: Profile,
}

impl Port {
    pub fn input(bus: impl Into<String>, coefficient: impl Into<Profile>) -> Self {
        Self {
            bus: bus.into(),
            direction: Direction::Input,
            coefficient: coefficient.into(),
        }
    }

    pub fn output(bus: impl Into<String>, coefficient: impl Into<Profile>) -> Self {
        Self {
            bus: bus.into(),
            direction: Direction::Output,
            coefficient: coefficient.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    pub bus: String,
    pub nominal_power: f64,
    /// Fraction of `nominal_power` available per snapshot
    pub availability: Profile,
    pub marginal_cost: f64,
    /// kg CO2 avoided per unit produced
    pub avoided_co2_kg_per_unit: f64,
}

impl Generator {
    pub fn new(name: impl Into<String>, bus: impl Into<String>, nominal_power: f64) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            nominal_power,
            availability: Profile::Constant(1.0),
            marginal_cost: 0.0,
            avoided_co2_kg_per_unit: 0.0,
        }
    }

    pub fn with_availability(mut self, availability: impl Into<Profile>) -> Self {
        self.availability = availability.into();
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    pub fn with_avoided_co2(mut self, kg_per_unit: f64) -> Self {
        self.avoided_co2_kg_per_unit = kg_per_unit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Converter {
    pub name: String,
    /// Formula label, for diagnostics
    pub formula: String,
    pub signature: PortSignature,
    pub ports: Vec<Port>,
    /// Upper bound of the reference flow
    pub nominal_flow: f64,
    pub availability: Profile,
    /// Cost per unit of reference flow
    pub marginal_cost: f64,
    pub avoided_co2_kg_per_unit: f64,
}

impl Converter {
    pub fn new(
        name: impl Into<String>,
        formula: impl Into<String>,
        signature: PortSignature,
        nominal_flow: f64,
    ) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            signature,
            ports: Vec::new(),
            nominal_flow,
            availability: Profile::Constant(1.0),
            marginal_cost: 0.0,
            avoided_co2_kg_per_unit: 0.0,
        }
    }

    /// Converter whose ports come from evaluating `technology` at unit
    /// reference flow. `bus_for` names the bus carrying each commodity.
    pub fn from_technology(
        technology: &Technology,
        exogenous: &Exogenous,
        bus_for: impl Fn(Commodity) -> String,
    ) -> Result<Self, ParameterError> {
        let mut converter = Converter::new(
            technology.name(),
            technology.label(),
            technology.signature(),
            technology.nominal_flow(),
        );
        converter.ports = technology
            .evaluate(1.0, exogenous)?
            .into_iter()
            .map(|flow| Port {
                bus: bus_for(flow.commodity),
                direction: flow.direction,
                coefficient: Profile::Constant(flow.amount),
            })
            .collect();
        Ok(converter)
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    pub fn with_avoided_co2(mut self, kg_per_unit: f64) -> Self {
        self.avoided_co2_kg_per_unit = kg_per_unit;
        self
    }

    pub fn port_counts(&self) -> PortSignature {
        let inputs = self
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Input)
            .count();
        PortSignature::new(inputs, self.ports.len() - inputs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUnit {
    pub name: String,
    pub bus: String,
    pub params: StorageParams,
    /// Wear cost per unit charged or discharged
    pub cycle_cost: f64,
}

impl StorageUnit {
    pub fn new(bus: impl Into<String>, params: StorageParams, cycle_cost: f64) -> Self {
        Self {
            name: params.name.clone(),
            bus: bus.into(),
            params,
            cycle_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub name: String,
    pub bus: String,
    pub demand: Profile,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: impl Into<String>, demand: impl Into<Profile>) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            demand: demand.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Generator(Generator),
    Converter(Converter),
    Storage(StorageUnit),
    Load(Load),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Generator(g) => &g.name,
            Component::Converter(c) => &c.name,
            Component::Storage(s) => &s.name,
            Component::Load(l) => &l.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Component::Generator(_) => "generator",
            Component::Converter(_) => "converter",
            Component::Storage(_) => "storage",
            Component::Load(_) => "load",
        }
    }

    /// Every bus this component is bound to, in port order.
    pub fn buses(&self) -> Vec<&str> {
        match self {
            Component::Generator(g) => vec![g.bus.as_str()],
            Component::Converter(c) => c.ports.iter().map(|p| p.bus.as_str()).collect(),
            Component::Storage(s) => vec![s.bus.as_str()],
            Component::Load(l) => vec![l.bus.as_str()],
        }
    }

    /// Named numeric fields, for NaN screening.
    pub(crate) fn numeric_fields(&self) -> Vec<(String, bool)> {
        match self {
            Component::Generator(g) => vec![
                ("nominal_power".into(), g.nominal_power.is_finite()),
                ("availability".into(), g.availability.is_finite()),
                ("marginal_cost".into(), g.marginal_cost.is_finite()),
                (
                    "avoided_co2_kg_per_unit".into(),
                    g.avoided_co2_kg_per_unit.is_finite(),
                ),
            ],
            Component::Converter(c) => {
                let mut fields = vec![
                    ("nominal_flow".into(), c.nominal_flow.is_finite()),
                    ("availability".into(), c.availability.is_finite()),
                    ("marginal_cost".into(), c.marginal_cost.is_finite()),
                    (
                        "avoided_co2_kg_per_unit".into(),
                        c.avoided_co2_kg_per_unit.is_finite(),
                    ),
                ];
                fields.extend(c.ports.iter().map(|p| {
                    (format!("coefficient[{}]", p.bus), p.coefficient.is_finite())
                }));
                fields
            }
            Component::Storage(s) => {
                let p = &s.params;
                [
                    ("energy_capacity", p.energy_capacity),
                    ("power_capacity", p.power_capacity),
                    ("charge_efficiency", p.charge_efficiency),
                    ("discharge_efficiency", p.discharge_efficiency),
                    ("self_discharge", p.self_discharge),
                    ("soc_min", p.soc_min),
                    ("soc_max", p.soc_max),
                    ("soc_initial", p.soc_initial),
                    ("cycle_cost", s.cycle_cost),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.is_finite()))
                .collect()
            }
            Component::Load(l) => vec![("demand".into(), l.demand.is_finite())],
        }
    }

    pub(crate) fn check_horizon(&self, horizon: Horizon) -> Result<(), ParameterError> {
        let name = self.name();
        match self {
            Component::Generator(g) => g
                .availability
                .check_len(format!("{name}.availability"), horizon),
            Component::Converter(c) => {
                c.availability
                    .check_len(format!("{name}.availability"), horizon)?;
                c.ports.iter().try_for_each(|p| {
                    p.coefficient
                        .check_len(format!("{name}.coefficient[{}]", p.bus), horizon)
                })
            }
            Component::Storage(_) => Ok(()),
            Component::Load(l) => l.demand.check_len(format!("{name}.demand"), horizon),
        }
    }
}

impl From<Generator> for Component {
    fn from(g: Generator) -> Self {
        Component::Generator(g)
    }
}

impl From<Converter> for Component {
    fn from(c: Converter) -> Self {
        Component::Converter(c)
    }
}

impl From<StorageUnit> for Component {
    fn from(s: StorageUnit) -> Self {
        Component::Storage(s)
    }
}

impl From<Load> for Component {
    fn from(l: Load) -> Self {
        Component::Load(l)
    }
}

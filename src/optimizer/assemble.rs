//! Network to linear program.
//!
//! Per snapshot `t` (step `dt` hours):
//!
//! * generator output `g[t] ∈ [0, P·avail(t)]`
//! * converter reference flow `x[t] ∈ [0, F·avail(t)]`; each port moves
//!   `coef(t)·x[t]` into (output) or out of (input) its bus
//! * storage `charge[t], discharge[t] ∈ [0, P]`, `soc[0..=T] ∈ [min, max]`
//!   with `soc[t+1] = r·soc[t] + (ηc/E)·dt·charge[t] − dt/(ηd·E)·discharge[t]`
//! * shortage and surplus slack per bus where the bus declares a penalty
//!
//! and one equality row per bus and snapshot: inflows minus outflows equals
//! the summed load.

use std::collections::BTreeSet;

use serde::Serialize;

use super::lp::{LinearExpr, LinearProgram, Sense, VarId};
use crate::domain::{Horizon, SocPolicy};
use crate::error::ParameterError;
use crate::formulas::Direction;
use crate::network::{BusId, Component, ComponentId, Network};

/// Decision variables of one component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentVars {
    /// Generator output or converter reference flow
    Flow(Vec<VarId>),
    Storage {
        charge: Vec<VarId>,
        discharge: Vec<VarId>,
        /// Horizon + 1 points; `soc[0]` is the opening state
        soc: Vec<VarId>,
        /// Charging indicator where exclusivity is enforced
        charging: Vec<Option<VarId>>,
    },
    /// Loads are parameters, not variables
    Fixed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusSlackVars {
    pub shortage: Option<Vec<VarId>>,
    pub surplus: Option<Vec<VarId>>,
}

/// Maps network entities to LP variables, indexed by [`ComponentId`] and
/// [`BusId`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMap {
    pub components: Vec<ComponentVars>,
    pub slacks: Vec<BusSlackVars>,
}

impl VariableMap {
    pub fn component(&self, id: ComponentId) -> &ComponentVars {
        &self.components[id.0]
    }

    pub fn slack(&self, id: BusId) -> &BusSlackVars {
        &self.slacks[id.0]
    }
}

/// Storage unit and snapshot where charge and discharge must not coexist.
pub type ExclusivitySet = BTreeSet<(ComponentId, usize)>;

#[derive(Debug, Clone)]
pub struct AssembledProgram {
    pub program: LinearProgram,
    pub map: VariableMap,
    pub horizon: Horizon,
    pub soc_policy: SocPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimultaneousUse {
    pub component: ComponentId,
    pub snapshot: usize,
    pub charge: f64,
    pub discharge: f64,
}

/// Charge or discharge below this is treated as idle.
pub const ACTIVITY_TOLERANCE: f64 = 1e-6;

impl AssembledProgram {
    pub fn assemble(
        network: &Network,
        horizon: Horizon,
        soc_policy: SocPolicy,
        exclusive: &ExclusivitySet,
    ) -> Result<Self, ParameterError> {
        let steps = horizon.hours();
        let dt = horizon.step_hours();
        let mut lp = LinearProgram::new();
        let mut components = Vec::with_capacity(network.component_count());

        for (id, component) in network.components() {
            let vars = match component {
                Component::Generator(g) => {
                    let flows = (0..steps)
                        .map(|t| {
                            let upper = g.nominal_power * availability(g.availability.at(t), &g.name)?;
                            let v = lp.continuous(format!("{}[{t}]", g.name), 0.0, Some(upper));
                            lp.add_cost(v, g.marginal_cost * dt);
                            Ok(v)
                        })
                        .collect::<Result<Vec<_>, ParameterError>>()?;
                    ComponentVars::Flow(flows)
                }
                Component::Converter(c) => {
                    let flows = (0..steps)
                        .map(|t| {
                            let upper = c.nominal_flow * availability(c.availability.at(t), &c.name)?;
                            let v = lp.continuous(format!("{}[{t}]", c.name), 0.0, Some(upper));
                            lp.add_cost(v, c.marginal_cost * dt);
                            Ok(v)
                        })
                        .collect::<Result<Vec<_>, ParameterError>>()?;
                    ComponentVars::Flow(flows)
                }
                Component::Storage(s) => {
                    let p = &s.params;
                    let name = &s.name;
                    let min = p.soc_min * p.energy_capacity;
                    let max = p.soc_max * p.energy_capacity;
                    let mut charge = Vec::with_capacity(steps);
                    let mut discharge = Vec::with_capacity(steps);
                    let mut charging = Vec::with_capacity(steps);
                    for t in 0..steps {
                        let ch = lp.continuous(format!("{name}.charge[{t}]"), 0.0, Some(p.power_capacity));
                        let dis =
                            lp.continuous(format!("{name}.discharge[{t}]"), 0.0, Some(p.power_capacity));
                        lp.add_cost(ch, s.cycle_cost * dt);
                        lp.add_cost(dis, s.cycle_cost * dt);

                        let indicator = exclusive.contains(&(id, t)).then(|| {
                            let u = lp.binary(format!("{name}.charging[{t}]"));
                            lp.add_constraint(
                                format!("{name}.charge_gate[{t}]"),
                                LinearExpr::new().with(ch, 1.0).with(u, -p.power_capacity),
                                Sense::Le,
                                0.0,
                            );
                            lp.add_constraint(
                                format!("{name}.discharge_gate[{t}]"),
                                LinearExpr::new().with(dis, 1.0).with(u, p.power_capacity),
                                Sense::Le,
                                p.power_capacity,
                            );
                            u
                        });
                        charge.push(ch);
                        discharge.push(dis);
                        charging.push(indicator);
                    }

                    let soc: Vec<VarId> = (0..=steps)
                        .map(|t| lp.continuous(format!("{name}.soc[{t}]"), min, Some(max)))
                        .collect();

                    for t in 0..steps {
                        lp.add_constraint(
                            format!("{name}.soc_step[{t}]"),
                            LinearExpr::new()
                                .with(soc[t + 1], 1.0)
                                .with(soc[t], -p.retention())
                                .with(charge[t], -p.charge_coefficient() * dt)
                                .with(discharge[t], p.discharge_coefficient() * dt),
                            Sense::Eq,
                            0.0,
                        );
                    }

                    match soc_policy {
                        SocPolicy::Initial => lp.add_constraint(
                            format!("{name}.soc_initial"),
                            LinearExpr::new().with(soc[0], 1.0),
                            Sense::Eq,
                            p.soc_initial * p.energy_capacity,
                        ),
                        SocPolicy::Cyclic => lp.add_constraint(
                            format!("{name}.soc_cyclic"),
                            LinearExpr::new().with(soc[0], 1.0).with(soc[steps], -1.0),
                            Sense::Eq,
                            0.0,
                        ),
                    }

                    ComponentVars::Storage {
                        charge,
                        discharge,
                        soc,
                        charging,
                    }
                }
                Component::Load(_) => ComponentVars::Fixed,
            };
            components.push(vars);
        }

        let mut slacks = Vec::with_capacity(network.bus_count());
        for (_, bus) in network.buses() {
            let mut vars = BusSlackVars::default();
            if let Some(policy) = &bus.slack {
                if let Some(penalty) = policy.shortage_penalty {
                    vars.shortage = Some(
                        (0..steps)
                            .map(|t| {
                                let v = lp.continuous(format!("{}.shortage[{t}]", bus.name), 0.0, None);
                                lp.add_cost(v, penalty * dt);
                                v
                            })
                            .collect(),
                    );
                }
                if let Some(penalty) = policy.surplus_penalty {
                    vars.surplus = Some(
                        (0..steps)
                            .map(|t| {
                                let v = lp.continuous(format!("{}.surplus[{t}]", bus.name), 0.0, None);
                                lp.add_cost(v, penalty * dt);
                                v
                            })
                            .collect(),
                    );
                }
            }
            slacks.push(vars);
        }

        let map = VariableMap { components, slacks };
        for (bus_id, bus) in network.buses() {
            for t in 0..steps {
                let row = balance_row(network, &map, bus_id, t);
                lp.add_constraint(
                    format!("{}.balance[{t}]", bus.name),
                    row,
                    Sense::Eq,
                    0.0,
                );
            }
        }

        Ok(Self {
            program: lp,
            map,
            horizon,
            soc_policy,
        })
    }

    /// Snapshots where a storage unit both charges and discharges.
    pub fn simultaneous_use(&self, value: impl Fn(VarId) -> Option<f64>) -> Vec<SimultaneousUse> {
        let mut found = Vec::new();
        for (i, vars) in self.map.components.iter().enumerate() {
            let ComponentVars::Storage {
                charge, discharge, ..
            } = vars
            else {
                continue;
            };
            for (t, (ch, dis)) in charge.iter().zip(discharge).enumerate() {
                let (Some(c), Some(d)) = (value(*ch), value(*dis)) else {
                    continue;
                };
                if c > ACTIVITY_TOLERANCE && d > ACTIVITY_TOLERANCE {
                    found.push(SimultaneousUse {
                        component: ComponentId(i),
                        snapshot: t,
                        charge: c,
                        discharge: d,
                    });
                }
            }
        }
        found
    }
}

fn availability(value: f64, component: &str) -> Result<f64, ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ParameterError::out_of_domain(
            component,
            "availability",
            value,
            "finite value >= 0",
        ))
    }
}

/// Net inflow into `bus` at `t`, with the summed load as a negative constant.
pub(crate) fn balance_row(network: &Network, map: &VariableMap, bus: BusId, t: usize) -> LinearExpr {
    let name = network.bus(bus).name.as_str();
    let mut row = LinearExpr::new();

    for (id, component) in network.components() {
        match (component, map.component(id)) {
            (Component::Generator(g), ComponentVars::Flow(v)) if g.bus == name => {
                row.add(v[t], 1.0);
            }
            (Component::Converter(c), ComponentVars::Flow(v)) => {
                for port in c.ports.iter().filter(|p| p.bus == name) {
                    let coef = port.coefficient.at(t);
                    match port.direction {
                        Direction::Output => row.add(v[t], coef),
                        Direction::Input => row.add(v[t], -coef),
                    };
                }
            }
            (
                Component::Storage(s),
                ComponentVars::Storage {
                    charge, discharge, ..
                },
            ) if s.bus == name => {
                row.add(discharge[t], 1.0).add(charge[t], -1.0);
            }
            (Component::Load(l), _) if l.bus == name => {
                row.add_constant(-l.demand.at(t));
            }
            _ => {}
        }
    }

    let slack = map.slack(bus);
    if let Some(shortage) = &slack.shortage {
        row.add(shortage[t], 1.0);
    }
    if let Some(surplus) = &slack.surplus {
        row.add(surplus[t], -1.0);
    }
    row
}

/// Buses whose balance has no penalized escape in one or both directions.
pub fn unslackened_buses(network: &Network) -> Vec<String> {
    network
        .buses()
        .filter_map(|(_, bus)| match &bus.slack {
            Some(p) if p.shortage_penalty.is_some() && p.surplus_penalty.is_some() => None,
            Some(p) if p.shortage_penalty.is_some() => Some(format!("{} (no surplus)", bus.name)),
            Some(p) if p.surplus_penalty.is_some() => Some(format!("{} (no shortage)", bus.name)),
            _ => Some(format!("{} (no slack)", bus.name)),
        })
        .collect()
}

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::{Bus, Component, ConsistencyChecker};
use crate::domain::{Commodity, Horizon};
use crate::error::{ParameterError, StructuralError};

/// Stable position of a bus in the built network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BusId(pub usize);

/// Stable position of a component in the built network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(pub usize);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Collects buses and components; [`NetworkBuilder::build`] validates them.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    buses: Vec<Bus>,
    components: Vec<Component>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&mut self, name: impl Into<String>, commodity: Commodity) -> &mut Bus {
        self.buses.push(Bus::new(name, commodity));
        let last = self.buses.len() - 1;
        &mut self.buses[last]
    }

    /// Adds a component. Its bus bindings are the bus names it carries.
    pub fn add_component(&mut self, component: impl Into<Component>) -> &mut Self {
        self.components.push(component.into());
        self
    }

    pub fn build(self) -> Result<Network, StructuralError> {
        ConsistencyChecker::check(&self.buses, &self.components)?;

        let bus_index: HashMap<String, BusId> = self
            .buses
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), BusId(i)))
            .collect();
        let component_index: HashMap<String, ComponentId> = self
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_string(), ComponentId(i)))
            .collect();

        tracing::debug!(
            buses = self.buses.len(),
            components = self.components.len(),
            "network built"
        );

        Ok(Network {
            buses: self.buses,
            components: self.components,
            bus_index,
            component_index,
        })
    }
}

/// A validated commodity network. Owns all buses and components of one solve.
#[derive(Debug, Clone)]
pub struct Network {
    buses: Vec<Bus>,
    components: Vec<Component>,
    bus_index: HashMap<String, BusId>,
    component_index: HashMap<String, ComponentId>,
}

impl Network {
    pub fn buses(&self) -> impl Iterator<Item = (BusId, &Bus)> {
        self.buses.iter().enumerate().map(|(i, b)| (BusId(i), b))
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId(i), c))
    }

    pub fn bus(&self, id: BusId) -> &Bus {
        &self.buses[id.0]
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub fn bus_id(&self, name: &str) -> Option<BusId> {
        self.bus_index.get(name).copied()
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.component_index.get(name).copied()
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Re-runs the structural checks.
    pub fn check(&self) -> Result<(), StructuralError> {
        ConsistencyChecker::check(&self.buses, &self.components)
    }

    /// Every per-snapshot series matches the horizon length.
    pub fn check_horizon(&self, horizon: Horizon) -> Result<(), ParameterError> {
        self.components
            .iter()
            .try_for_each(|c| c.check_horizon(horizon))
    }
}

//! Commodity Network
//!
//! Buses carry one commodity each; generators, converters, storage units and
//! loads are bound to buses by name. [`NetworkBuilder::build`] runs the
//! [`ConsistencyChecker`] so a [`Network`] is always structurally sound.

pub mod builder;
pub mod bus;
pub mod component;
pub mod consistency;
pub mod reference;

pub use builder::{BusId, ComponentId, Network, NetworkBuilder};
pub use bus::{Bus, SlackPolicy};
pub use component::{Component, Converter, Generator, Load, Port, Profile, StorageUnit};
pub use consistency::ConsistencyChecker;
pub use reference::ReferenceNexus;

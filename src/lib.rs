//! Multi-commodity dispatch for wind-water-biogas nexus systems.
//!
//! Technologies are described by key-validated specs, turned into port
//! flows by the formula library, wired into a commodity network and
//! dispatched as one linear program per horizon. Avoided CO2 is priced on
//! the carbon credit tiers and capex is levelized over the dispatched energy.

pub mod carbon;
pub mod config;
pub mod domain;
pub mod economics;
pub mod error;
pub mod formulas;
pub mod network;
pub mod optimizer;
pub mod results;
pub mod scenario;
pub mod technology;
pub mod telemetry;

pub use error::{NexusError, Result};

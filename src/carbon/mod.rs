//! Carbon Revenue Engine
//!
//! Converts avoided CO2 into market revenue under the VCC, CCC and PGC tiers.

pub mod revenue;
pub mod tier;

pub use revenue::{avoided_tons, CarbonRevenueEngine, RevenueBreakdown};
pub use tier::CarbonTier;

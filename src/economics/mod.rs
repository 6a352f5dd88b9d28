//! Capital economics.
//!
//! Technology capex is annualized with the capital recovery factor and
//! levelized over the energy the dispatch delivers, scaled from the solved
//! horizon to a year.

pub mod assess;
pub mod finance;

pub use assess::{EconomicsAssessor, EconomicsReport, TechnologyEconomics};
pub use finance::{annualize, capital_recovery_factor, levelized_cost, present_value};

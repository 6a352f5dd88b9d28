pub mod commodity;
pub mod horizon;
pub mod timeseries;

pub use commodity::*;
pub use horizon::*;
pub use timeseries::*;

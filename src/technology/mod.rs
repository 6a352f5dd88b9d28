//! Technology specifications
//!
//! Immutable, key-validated parameter records. Every technology family has a
//! fixed key set; formulas read their parameters only through
//! [`TechnologySpec::get`].

pub mod catalog;
pub mod kind;
pub mod spec;

pub use catalog::TechnologyCatalog;
pub use kind::TechnologyKind;
pub use spec::{SpecValue, TechnologySpec};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::error::ParameterError;

/// Optimization horizon. Snapshots are contiguous one-hour steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Horizon {
    /// 168 snapshots
    Week,
    /// 720 snapshots
    Month,
    /// 8760 snapshots
    Year,
}

impl Horizon {
    pub const fn hours(self) -> usize {
        match self {
            Horizon::Week => 168,
            Horizon::Month => 720,
            Horizon::Year => 8760,
        }
    }

    /// Length of one snapshot in hours.
    pub const fn step_hours(self) -> f64 {
        1.0
    }

    pub fn snapshots(self) -> Range<usize> {
        0..self.hours()
    }
}

impl TryFrom<usize> for Horizon {
    type Error = ParameterError;

    fn try_from(hours: usize) -> Result<Self, Self::Error> {
        match hours {
            168 => Ok(Horizon::Week),
            720 => Ok(Horizon::Month),
            8760 => Ok(Horizon::Year),
            other => Err(ParameterError::UnsupportedHorizon(other)),
        }
    }
}

impl From<Horizon> for usize {
    fn from(h: Horizon) -> Self {
        h.hours()
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours())
    }
}

/// How the first storage state of the horizon is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocPolicy {
    /// Each storage starts at its configured `soc_initial`.
    #[default]
    Initial,
    /// Storage must end the horizon where it started.
    Cyclic,
}

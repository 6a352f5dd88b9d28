use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::Horizon;
use crate::error::ParameterError;

/// Exogenous hourly profiles supplied by the caller.
///
/// Profiles may be longer than the solved horizon (a year of data can feed a
/// week-long solve); [`TimeSeriesInputs::window`] cuts them to length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesInputs {
    /// Electricity demand, kWh per hour
    pub electricity_demand: Vec<f64>,
    /// Heat demand, kWh thermal per hour
    pub heat_demand: Vec<f64>,
    /// Treated water demand, m3 per hour
    pub water_demand: Vec<f64>,
    /// Hub-height wind speed, m/s
    pub wind_speed: Vec<f64>,
    /// PM10 concentration, ug/m3
    pub pm10: Vec<f64>,
}

impl TimeSeriesInputs {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading time series from {}", path.display()))?;
        let inputs: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing time series in {}", path.display()))?;
        Ok(inputs)
    }

    fn named(&self) -> [(&'static str, &[f64]); 5] {
        [
            ("electricity_demand", &self.electricity_demand),
            ("heat_demand", &self.heat_demand),
            ("water_demand", &self.water_demand),
            ("wind_speed", &self.wind_speed),
            ("pm10", &self.pm10),
        ]
    }

    /// Checks every profile has exactly one finite, non-negative value per snapshot.
    pub fn validate(&self, horizon: Horizon) -> Result<(), ParameterError> {
        for (name, series) in self.named() {
            if series.len() != horizon.hours() {
                return Err(ParameterError::SeriesLength {
                    series: name.to_string(),
                    expected: horizon.hours(),
                    actual: series.len(),
                });
            }
            if let Some(bad) = series.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(ParameterError::out_of_domain(
                    "time series",
                    name,
                    *bad,
                    "finite value >= 0",
                ));
            }
        }
        Ok(())
    }

    /// Returns the first `horizon.hours()` values of every profile.
    pub fn window(&self, horizon: Horizon) -> Result<Self, ParameterError> {
        let n = horizon.hours();
        for (name, series) in self.named() {
            if series.len() < n {
                return Err(ParameterError::SeriesLength {
                    series: name.to_string(),
                    expected: n,
                    actual: series.len(),
                });
            }
        }
        let cut = |s: &[f64]| s[..n].to_vec();
        let windowed = Self {
            electricity_demand: cut(&self.electricity_demand),
            heat_demand: cut(&self.heat_demand),
            water_demand: cut(&self.water_demand),
            wind_speed: cut(&self.wind_speed),
            pm10: cut(&self.pm10),
        };
        windowed.validate(horizon)?;
        Ok(windowed)
    }

    /// Flat profiles, handy for fixtures and smoke runs.
    pub fn constant(
        horizon: Horizon,
        electricity: f64,
        heat: f64,
        water: f64,
        wind_speed: f64,
        pm10: f64,
    ) -> Self {
        let n = horizon.hours();
        Self {
            electricity_demand: vec![electricity; n],
            heat_demand: vec![heat; n],
            water_demand: vec![water; n],
            wind_speed: vec![wind_speed; n],
            pm10: vec![pm10; n],
        }
    }
}

//! Groundwater pumping and water/wastewater treatment.

use serde::{Deserialize, Serialize};

use super::{efficiency, expect_kind, non_negative, positive};
use crate::domain::Commodity;
use crate::error::ParameterError;
use crate::technology::{TechnologyKind, TechnologySpec};

/// kg/m3
pub const WATER_DENSITY: f64 = 1000.0;
/// m/s2
pub const GRAVITY: f64 = 9.81;
/// Pump-power conversion constant of the m3/h, m, kW convention.
pub const PUMP_POWER_CONSTANT: f64 = 367.0;

const PUMP: &str = "pump";

/// `P = rho * g * Q * H / (eta * 367)` with Q taken in m3/s.
pub fn pumping_power(
    flow_m3_h: f64,
    head_m: f64,
    pump_efficiency: f64,
) -> Result<f64, ParameterError> {
    let q = non_negative(PUMP, "flow", flow_m3_h)? / 3600.0;
    let head = positive(PUMP, "head", head_m)?;
    let eta = efficiency(PUMP, "efficiency", pump_efficiency)?;
    Ok(WATER_DENSITY * GRAVITY * q * head / (eta * PUMP_POWER_CONSTANT))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterWell {
    pub name: String,
    pub pump_efficiency: f64,
    pub power_rating_kw: f64,
    /// Pumping head, m
    pub head_m: f64,
    pub max_extraction_m3_h: f64,
}

impl GroundwaterWell {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::GroundwaterWell)?;
        let n = spec.name.as_str();
        Ok(Self {
            name: n.to_string(),
            pump_efficiency: efficiency(
                n,
                "pump_specs.efficiency",
                spec.get("pump_specs.efficiency")?,
            )?,
            power_rating_kw: positive(
                n,
                "pump_specs.power_rating",
                spec.get("pump_specs.power_rating")?,
            )?,
            head_m: positive(n, "well_specs.depth", spec.get("well_specs.depth")?)?,
            max_extraction_m3_h: positive(
                n,
                "well_specs.max_extraction",
                spec.get("well_specs.max_extraction")?,
            )?,
        })
    }

    pub fn power(&self, flow_m3_h: f64) -> Result<f64, ParameterError> {
        let q = non_negative(&self.name, "flow", flow_m3_h)?;
        pumping_power(q, self.head_m, self.pump_efficiency)
    }

    /// Highest flow allowed by both the aquifer and the pump rating. Zero
    /// for a pump outside its domain; [`GroundwaterWell::power`] names the field.
    pub fn max_flow(&self) -> f64 {
        match pumping_power(1.0, self.head_m, self.pump_efficiency) {
            Ok(per_unit) => self.max_extraction_m3_h.min(self.power_rating_kw / per_unit),
            Err(_) => 0.0,
        }
    }
}

/// Treatment stage turning an influent water stream into treated water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub name: String,
    pub influent: Commodity,
    pub energy_kwh_per_m3: f64,
    pub recovery_rate: f64,
    pub capacity_m3_h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOutputs {
    pub treated_m3_h: f64,
    pub electricity_kwh: f64,
}

impl Treatment {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        let influent = match spec.kind {
            TechnologyKind::WastewaterTreatment => Commodity::Wastewater,
            _ => {
                expect_kind(spec, TechnologyKind::WaterTreatment)?;
                Commodity::RawWater
            }
        };
        let n = spec.name.as_str();
        Ok(Self {
            name: n.to_string(),
            influent,
            energy_kwh_per_m3: non_negative(
                n,
                "energy_kwh_per_m3",
                spec.get("energy_kwh_per_m3")?,
            )?,
            recovery_rate: efficiency(n, "recovery_rate", spec.get("recovery_rate")?)?,
            capacity_m3_h: positive(n, "capacity_m3_h", spec.get("capacity_m3_h")?)?,
        })
    }

    pub fn treat(&self, influent_m3_h: f64) -> Result<TreatmentOutputs, ParameterError> {
        let v = non_negative(&self.name, "influent", influent_m3_h)?;
        Ok(TreatmentOutputs {
            treated_m3_h: v * self.recovery_rate,
            electricity_kwh: v * self.energy_kwh_per_m3,
        })
    }
}

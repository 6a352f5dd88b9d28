//! Gas-fired conversion: microturbine, exhaust heat recovery, boilers.
//!
//! Fuel flows are volumetric (m3/h) and heating values are lower heating
//! values in kWh/m3, so every power below is in kW.

use serde::{Deserialize, Serialize};

use super::{efficiency, expect_kind, non_negative, positive};
use crate::domain::Commodity;
use crate::error::ParameterError;
use crate::technology::{TechnologyKind, TechnologySpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Microturbine {
    pub name: String,
    pub rated_capacity_kw: f64,
    pub electrical_efficiency: f64,
    /// kWh per m3 of fuel
    pub fuel_lhv: f64,
    /// kg CO2 per kWh of fuel energy
    pub emission_factor: f64,
    pub fuel: Commodity,
    pub recovery: Option<HeatRecovery>,
}

impl Microturbine {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::GasMicroturbine)?;
        let name = spec.name.as_str();
        Ok(Self {
            name: name.to_string(),
            rated_capacity_kw: positive(name, "rated_capacity_kw", spec.get("rated_capacity_kw")?)?,
            electrical_efficiency: efficiency(
                name,
                "electrical_efficiency",
                spec.get("electrical_efficiency")?,
            )?,
            fuel_lhv: positive(name, "fuel_lhv", spec.get("fuel_lhv")?)?,
            emission_factor: non_negative(name, "emission_factor", spec.get("emission_factor")?)?,
            fuel: Commodity::NaturalGas,
            recovery: None,
        })
    }

    pub fn burning(mut self, fuel: Commodity) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn with_recovery(mut self, recovery: HeatRecovery) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// `P = electrical_efficiency * fuel_flow * LHV`
    pub fn electrical_power(&self, fuel_flow: f64) -> Result<f64, ParameterError> {
        let q = non_negative(&self.name, "fuel_flow", fuel_flow)?;
        Ok(self.electrical_efficiency * q * self.fuel_lhv)
    }

    pub fn co2_emissions(&self, fuel_flow: f64) -> Result<f64, ParameterError> {
        let q = non_negative(&self.name, "fuel_flow", fuel_flow)?;
        Ok(q * self.fuel_lhv * self.emission_factor)
    }

    /// Heat recovered from the exhaust, zero without a recovery unit.
    pub fn recovered_heat(&self, fuel_flow: f64) -> Result<f64, ParameterError> {
        let power = self.electrical_power(fuel_flow)?;
        match &self.recovery {
            Some(r) => r.recovered_heat(power, self.electrical_efficiency),
            None => Ok(0.0),
        }
    }

    /// Fuel flow at rated electrical output.
    pub fn rated_fuel_flow(&self) -> f64 {
        self.rated_capacity_kw / (self.electrical_efficiency * self.fuel_lhv)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatRecovery {
    pub name: String,
    pub recovery_efficiency: f64,
}

impl HeatRecovery {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::HeatRecovery)?;
        let name = spec.name.as_str();
        Ok(Self {
            name: name.to_string(),
            recovery_efficiency: efficiency(
                name,
                "recovery_efficiency",
                spec.get("recovery_efficiency")?,
            )?,
        })
    }

    /// `H = P_gt * recovery_efficiency * (1 - eta_el) / eta_el`
    pub fn recovered_heat(
        &self,
        turbine_power: f64,
        electrical_efficiency: f64,
    ) -> Result<f64, ParameterError> {
        let p = non_negative(&self.name, "turbine_power", turbine_power)?;
        let eta = efficiency(&self.name, "electrical_efficiency", electrical_efficiency)?;
        Ok(p * self.recovery_efficiency * (1.0 - eta) / eta)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasBoiler {
    pub name: String,
    pub rated_capacity_kw: f64,
    pub thermal_efficiency: f64,
    pub fuel_lhv: f64,
    pub emission_factor: f64,
    pub fuel: Commodity,
}

impl GasBoiler {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::GasBoiler)?;
        let name = spec.name.as_str();
        Ok(Self {
            name: name.to_string(),
            rated_capacity_kw: positive(name, "rated_capacity_kw", spec.get("rated_capacity_kw")?)?,
            thermal_efficiency: efficiency(
                name,
                "thermal_efficiency",
                spec.get("thermal_efficiency")?,
            )?,
            fuel_lhv: positive(name, "fuel_lhv", spec.get("fuel_lhv")?)?,
            emission_factor: non_negative(name, "emission_factor", spec.get("emission_factor")?)?,
            fuel: Commodity::NaturalGas,
        })
    }

    pub fn burning(mut self, fuel: Commodity) -> Self {
        self.fuel = fuel;
        self
    }

    /// `Q = thermal_efficiency * fuel_flow * LHV`
    pub fn thermal_power(&self, fuel_flow: f64) -> Result<f64, ParameterError> {
        let q = non_negative(&self.name, "fuel_flow", fuel_flow)?;
        Ok(self.thermal_efficiency * q * self.fuel_lhv)
    }

    pub fn co2_emissions(&self, fuel_flow: f64) -> Result<f64, ParameterError> {
        let q = non_negative(&self.name, "fuel_flow", fuel_flow)?;
        Ok(q * self.fuel_lhv * self.emission_factor)
    }

    pub fn rated_fuel_flow(&self) -> f64 {
        self.rated_capacity_kw / (self.thermal_efficiency * self.fuel_lhv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turbine(eta: f64) -> Microturbine {
        let spec = TechnologySpec::new("mt", TechnologyKind::GasMicroturbine)
            .with("rated_capacity_kw", 200.0)
            .with("electrical_efficiency", eta)
            .with("fuel_lhv", 9.97)
            .with("emission_factor", 0.2)
            .with("capex", 1800.0);
        Microturbine::from_spec(&spec).unwrap()
    }

    fn recovery() -> HeatRecovery {
        HeatRecovery {
            name: "hr".into(),
            recovery_efficiency: 0.75,
        }
    }

    #[test]
    fn microturbine_power() {
        let p = turbine(0.28).electrical_power(100.0).unwrap();
        assert!((p - 279.16).abs() < 0.01, "got {p}");
    }

    #[test]
    fn heat_recovery_from_turbine_exhaust() {
        let mt = turbine(0.28).with_recovery(recovery());
        let h = mt.recovered_heat(100.0).unwrap();
        // 279.16 * 0.75 * 0.72 / 0.28
        assert!((h - 538.38).abs() < 0.01, "got {h}");

        let direct = recovery().recovered_heat(279.16, 0.28).unwrap();
        assert!((direct - 279.16 * 0.75 * (0.72 / 0.28)).abs() < 1e-9);
    }

    #[test]
    fn without_recovery_unit_no_heat() {
        assert_eq!(turbine(0.3).recovered_heat(10.0).unwrap(), 0.0);
    }

    #[test]
    fn negative_fuel_flow_is_rejected() {
        let err = turbine(0.28).electrical_power(-1.0).unwrap_err();
        assert!(matches!(err, ParameterError::OutOfDomain { ref field, .. } if field == "fuel_flow"));
    }

    #[test]
    fn efficiency_above_one_is_rejected() {
        let spec = TechnologySpec::new("mt", TechnologyKind::GasMicroturbine)
            .with("rated_capacity_kw", 200.0)
            .with("electrical_efficiency", 1.2)
            .with("fuel_lhv", 9.97)
            .with("emission_factor", 0.2)
            .with("capex", 1800.0);
        let err = Microturbine::from_spec(&spec).unwrap_err();
        assert!(err.to_string().contains("electrical_efficiency"));
    }

    #[test]
    fn boiler_output_and_rated_fuel() {
        let boiler = GasBoiler {
            name: "gb".into(),
            rated_capacity_kw: 500.0,
            thermal_efficiency: 0.85,
            fuel_lhv: 10.0,
            emission_factor: 0.2,
            fuel: Commodity::NaturalGas,
        };
        assert!((boiler.thermal_power(10.0).unwrap() - 85.0).abs() < 1e-12);
        let q = boiler.rated_fuel_flow();
        assert!((boiler.thermal_power(q).unwrap() - 500.0).abs() < 1e-9);
    }
}

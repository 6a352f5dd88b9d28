//! Wind turbine power curve with dust derating.
//!
//! The curve is zero below cut-in and from cut-out upward, follows
//! `P_r * ((v - v_ci) / (v_r - v_ci))^k` up to rated speed and stays at
//! `P_r` until cut-out. Airborne dust (PM10) derates the output:
//!
//! ```text
//! dust = clamp(1 - alpha * (PM10 / 100)^beta * exp(-v / gamma), 0.5, 1.0)
//! P    = min(curve(v) * dust * availability, P_r)
//! ```
//!
//! Horizontal-axis rotors use k = 3, vertical-axis and bladeless units k = 2.

use serde::{Deserialize, Serialize};

use super::{efficiency, expect_kind, non_negative, positive};
use crate::error::ParameterError;
use crate::technology::{TechnologyKind, TechnologySpec};

const DUST_FLOOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DustSensitivity {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindTurbine {
    pub name: String,
    pub rated_capacity_kw: f64,
    pub cut_in_speed: f64,
    pub rated_speed: f64,
    pub cut_out_speed: f64,
    pub curve_exponent: f64,
    pub availability: f64,
    pub dust: DustSensitivity,
    /// kg CO2 per kWh over the turbine's life cycle
    pub lifecycle_emissions: f64,
}

impl WindTurbine {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::WindTurbine)?;
        let n = spec.name.as_str();
        let turbine = Self {
            name: n.to_string(),
            rated_capacity_kw: positive(n, "rated_capacity_kw", spec.get("rated_capacity_kw")?)?,
            cut_in_speed: non_negative(n, "cut_in_speed", spec.get("cut_in_speed")?)?,
            rated_speed: positive(n, "rated_speed", spec.get("rated_speed")?)?,
            cut_out_speed: positive(n, "cut_out_speed", spec.get("cut_out_speed")?)?,
            curve_exponent: positive(n, "curve_exponent", spec.get("curve_exponent")?)?,
            availability: efficiency(n, "availability", spec.get("availability")?)?,
            dust: DustSensitivity {
                alpha: non_negative(n, "dust_alpha", spec.get("dust_alpha")?)?,
                beta: positive(n, "dust_beta", spec.get("dust_beta")?)?,
                gamma: positive(n, "dust_gamma", spec.get("dust_gamma")?)?,
            },
            lifecycle_emissions: non_negative(
                n,
                "lifecycle_emissions",
                spec.get("lifecycle_emissions")?,
            )?,
        };
        if !(turbine.cut_in_speed < turbine.rated_speed
            && turbine.rated_speed < turbine.cut_out_speed)
        {
            return Err(ParameterError::out_of_domain(
                n,
                "rated_speed",
                turbine.rated_speed,
                "cut_in_speed < rated_speed < cut_out_speed",
            ));
        }
        Ok(turbine)
    }

    /// Undisturbed power curve, kW.
    pub fn curve_power(&self, wind_speed: f64) -> Result<f64, ParameterError> {
        let v = non_negative(&self.name, "wind_speed", wind_speed)?;
        let p = if v < self.cut_in_speed || v >= self.cut_out_speed {
            0.0
        } else if v < self.rated_speed {
            let x = (v - self.cut_in_speed) / (self.rated_speed - self.cut_in_speed);
            self.rated_capacity_kw * x.powf(self.curve_exponent)
        } else {
            self.rated_capacity_kw
        };
        Ok(p)
    }

    pub fn dust_factor(&self, wind_speed: f64, pm10: f64) -> Result<f64, ParameterError> {
        let v = non_negative(&self.name, "wind_speed", wind_speed)?;
        let pm = non_negative(&self.name, "pm10", pm10)?;
        let DustSensitivity { alpha, beta, gamma } = self.dust;
        let loss = alpha * (pm / 100.0).powf(beta) * (-v / gamma).exp();
        Ok((1.0 - loss).clamp(DUST_FLOOR, 1.0))
    }

    pub fn available_power(&self, wind_speed: f64, pm10: f64) -> Result<f64, ParameterError> {
        let p = self.curve_power(wind_speed)? * self.dust_factor(wind_speed, pm10)? * self.availability;
        Ok(p.min(self.rated_capacity_kw))
    }

    pub fn capacity_factor(&self, wind_speed: f64, pm10: f64) -> Result<f64, ParameterError> {
        Ok(self.available_power(wind_speed, pm10)? / self.rated_capacity_kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn hawt() -> WindTurbine {
        WindTurbine {
            name: "hawt".into(),
            rated_capacity_kw: 500.0,
            cut_in_speed: 3.0,
            rated_speed: 12.0,
            cut_out_speed: 25.0,
            curve_exponent: 3.0,
            availability: 0.95,
            dust: DustSensitivity {
                alpha: 0.15,
                beta: 1.2,
                gamma: 10.0,
            },
            lifecycle_emissions: 0.011,
        }
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(2.9, 0.0)]
    #[case(7.5, 500.0 * 0.125)]
    #[case(12.0, 500.0)]
    #[case(20.0, 500.0)]
    #[case(25.0, 0.0)]
    #[case(30.0, 0.0)]
    fn curve_regions(#[case] v: f64, #[case] expected: f64) {
        let p = hawt().curve_power(v).unwrap();
        assert!((p - expected).abs() < 1e-9, "v={v}: {p}");
    }

    #[test]
    fn clean_air_only_applies_availability() {
        let t = hawt();
        assert_eq!(t.dust_factor(10.0, 0.0).unwrap(), 1.0);
        assert!((t.available_power(15.0, 0.0).unwrap() - 475.0).abs() < 1e-9);
    }

    #[test]
    fn dust_factor_is_clamped() {
        let mut t = hawt();
        t.dust.alpha = 5.0;
        assert_eq!(t.dust_factor(0.0, 1000.0).unwrap(), 0.5);
    }

    #[test]
    fn dust_storm_derates_output() {
        let t = hawt();
        let clean = t.available_power(8.0, 0.0).unwrap();
        let dusty = t.available_power(8.0, 300.0).unwrap();
        let factor = 1.0 - 0.15 * 3.0f64.powf(1.2) * (-0.8f64).exp();
        assert!((dusty - clean * factor).abs() < 1e-9);
    }

    #[test]
    fn capacity_factor_is_a_fraction() {
        let t = hawt();
        for v in [0.0, 4.0, 9.0, 13.0, 26.0] {
            let cf = t.capacity_factor(v, 150.0).unwrap();
            assert!((0.0..=1.0).contains(&cf));
        }
    }

    #[test]
    fn inverted_speeds_are_rejected() {
        let spec = TechnologySpec::new("bad", TechnologyKind::WindTurbine)
            .with("rated_capacity_kw", 100.0)
            .with("cut_in_speed", 5.0)
            .with("rated_speed", 4.0)
            .with("cut_out_speed", 25.0)
            .with("curve_exponent", 2.0)
            .with("availability", 0.9)
            .with("dust_alpha", 0.1)
            .with("dust_beta", 1.0)
            .with("dust_gamma", 10.0)
            .with("lifecycle_emissions", 0.011)
            .with("capex", 1.0);
        let err = WindTurbine::from_spec(&spec).unwrap_err();
        assert!(err.to_string().contains("rated_speed"));
    }
}

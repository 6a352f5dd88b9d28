//! Formula Library
//!
//! One pure formula per technology family. [`Technology`] is the tagged union
//! the network builder dispatches on: every variant maps a reference
//! throughput and the current snapshot's exogenous conditions to the flows on
//! its ports.

pub mod biogas;
pub mod storage;
pub mod thermal;
pub mod water;
pub mod wind;

pub use biogas::{
    AnaerobicDigester, CarbonCapture, CaptureOutputs, DewateringOutputs, Dewatering,
    DigestateComposition, DigesterOutputs,
};
pub use storage::StorageParams;
pub use thermal::{GasBoiler, HeatRecovery, Microturbine};
pub use water::{pumping_power, GroundwaterWell, Treatment, TreatmentOutputs};
pub use wind::{DustSensitivity, WindTurbine};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Commodity;
use crate::error::ParameterError;
use crate::technology::{TechnologyKind, TechnologySpec};

// ============================================================================
// Domain checks
// ============================================================================

pub(crate) fn expect_kind(
    spec: &TechnologySpec,
    expected: TechnologyKind,
) -> Result<(), ParameterError> {
    if spec.kind == expected {
        Ok(())
    } else {
        Err(ParameterError::KindMismatch {
            technology: spec.name.clone(),
            expected: expected.to_string(),
            actual: spec.kind.to_string(),
        })
    }
}

/// 0 < value <= 1
pub(crate) fn efficiency(technology: &str, field: &str, value: f64) -> Result<f64, ParameterError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ParameterError::out_of_domain(technology, field, value, "0 < value <= 1"))
    }
}

/// 0 <= value <= 1
pub(crate) fn fraction(technology: &str, field: &str, value: f64) -> Result<f64, ParameterError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ParameterError::out_of_domain(technology, field, value, "0 <= value <= 1"))
    }
}

pub(crate) fn non_negative(
    technology: &str,
    field: &str,
    value: f64,
) -> Result<f64, ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ParameterError::out_of_domain(technology, field, value, "finite value >= 0"))
    }
}

pub(crate) fn positive(technology: &str, field: &str, value: f64) -> Result<f64, ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ParameterError::out_of_domain(technology, field, value, "finite value > 0"))
    }
}

// ============================================================================
// Port flows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

/// Flow of one commodity across one port of a component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortFlow {
    pub commodity: Commodity,
    pub direction: Direction,
    pub amount: f64,
}

impl PortFlow {
    pub fn input(commodity: Commodity, amount: f64) -> Self {
        Self {
            commodity,
            direction: Direction::Input,
            amount,
        }
    }

    pub fn output(commodity: Commodity, amount: f64) -> Self {
        Self {
            commodity,
            direction: Direction::Output,
            amount,
        }
    }

    /// Direction picked by sign, amount made non-negative.
    pub fn signed_input(commodity: Commodity, amount: f64) -> Self {
        if amount >= 0.0 {
            Self::input(commodity, amount)
        } else {
            Self::output(commodity, -amount)
        }
    }
}

/// Number of input and output ports a formula requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSignature {
    pub inputs: usize,
    pub outputs: usize,
}

impl PortSignature {
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

impl fmt::Display for PortSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in / {} out", self.inputs, self.outputs)
    }
}

/// Current-snapshot inputs that are not decision variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Exogenous {
    pub wind_speed: f64,
    pub pm10: f64,
    pub digestate: Option<DigestateComposition>,
}

// ============================================================================
// Technology dispatch
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technology", rename_all = "snake_case")]
pub enum Technology {
    Wind(WindTurbine),
    Microturbine(Microturbine),
    Boiler(GasBoiler),
    Digester(AnaerobicDigester),
    Dewatering(Dewatering),
    Ccu(CarbonCapture),
    Well(GroundwaterWell),
    Treatment(Treatment),
}

impl Technology {
    /// Builds the formula for a non-storage spec. Heat recovery is attached
    /// to a microturbine with [`Microturbine::with_recovery`] instead.
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        Ok(match spec.kind {
            TechnologyKind::WindTurbine => Technology::Wind(WindTurbine::from_spec(spec)?),
            TechnologyKind::GasMicroturbine => {
                Technology::Microturbine(Microturbine::from_spec(spec)?)
            }
            TechnologyKind::GasBoiler => Technology::Boiler(GasBoiler::from_spec(spec)?),
            TechnologyKind::AnaerobicDigester => {
                Technology::Digester(AnaerobicDigester::from_spec(spec)?)
            }
            TechnologyKind::Dewatering => Technology::Dewatering(Dewatering::from_spec(spec)?),
            TechnologyKind::Ccu => Technology::Ccu(CarbonCapture::from_spec(spec)?),
            TechnologyKind::GroundwaterWell => Technology::Well(GroundwaterWell::from_spec(spec)?),
            TechnologyKind::WaterTreatment | TechnologyKind::WastewaterTreatment => {
                Technology::Treatment(Treatment::from_spec(spec)?)
            }
            other => {
                return Err(ParameterError::KindMismatch {
                    technology: spec.name.clone(),
                    expected: "a conversion technology".into(),
                    actual: other.to_string(),
                })
            }
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Technology::Wind(t) => &t.name,
            Technology::Microturbine(t) => &t.name,
            Technology::Boiler(t) => &t.name,
            Technology::Digester(t) => &t.name,
            Technology::Dewatering(t) => &t.name,
            Technology::Ccu(t) => &t.name,
            Technology::Well(t) => &t.name,
            Technology::Treatment(t) => &t.name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Technology::Wind(_) => "wind_turbine",
            Technology::Microturbine(_) => "gas_microturbine",
            Technology::Boiler(_) => "gas_boiler",
            Technology::Digester(_) => "anaerobic_digester",
            Technology::Dewatering(_) => "dewatering",
            Technology::Ccu(_) => "ccu",
            Technology::Well(_) => "groundwater_well",
            Technology::Treatment(_) => "treatment",
        }
    }

    pub fn signature(&self) -> PortSignature {
        match self {
            Technology::Wind(_) => PortSignature::new(0, 1),
            Technology::Microturbine(mt) if mt.recovery.is_some() => PortSignature::new(1, 3),
            Technology::Microturbine(_) => PortSignature::new(1, 2),
            Technology::Boiler(_) => PortSignature::new(1, 2),
            Technology::Digester(d) => {
                let (m_s, m_bm) = d.split_feed(1.0);
                let makeup = m_s * (d.sludge_ts / d.digestate_ts - 1.0)
                    + m_bm * (d.biomass_ts / d.digestate_ts - 1.0);
                if makeup >= 0.0 {
                    PortSignature::new(2, 2)
                } else {
                    PortSignature::new(1, 3)
                }
            }
            Technology::Dewatering(_) => PortSignature::new(1, 2),
            Technology::Ccu(_) => PortSignature::new(2, 2),
            Technology::Well(_) => PortSignature::new(1, 1),
            Technology::Treatment(_) => PortSignature::new(2, 1),
        }
    }

    /// Upper bound of the reference throughput.
    pub fn nominal_flow(&self) -> f64 {
        match self {
            Technology::Wind(t) => t.rated_capacity_kw,
            Technology::Microturbine(t) => t.rated_fuel_flow(),
            Technology::Boiler(t) => t.rated_fuel_flow(),
            Technology::Digester(t) => t.nominal_feed(),
            Technology::Dewatering(t) => t.max_throughput,
            Technology::Ccu(t) => t.max_influent,
            Technology::Well(t) => t.max_flow(),
            Technology::Treatment(t) => t.capacity_m3_h,
        }
    }

    /// Port flows at reference throughput `reference`.
    ///
    /// Reference throughput is fuel flow for combustion units, total feed for
    /// the digester, digestate for dewatering, influent CO2 for capture and
    /// water flow for the well and treatment stages. For wind it is the number
    /// of turbines.
    pub fn evaluate(
        &self,
        reference: f64,
        exogenous: &Exogenous,
    ) -> Result<Vec<PortFlow>, ParameterError> {
        use Commodity::*;

        let flows = match self {
            Technology::Wind(t) => {
                let units = non_negative(&t.name, "units", reference)?;
                let p = t.available_power(exogenous.wind_speed, exogenous.pm10)?;
                vec![PortFlow::output(Electricity, units * p)]
            }
            Technology::Microturbine(t) => {
                let mut flows = vec![
                    PortFlow::input(t.fuel, reference),
                    PortFlow::output(Electricity, t.electrical_power(reference)?),
                    PortFlow::output(Co2, t.co2_emissions(reference)?),
                ];
                if t.recovery.is_some() {
                    flows.push(PortFlow::output(Heat, t.recovered_heat(reference)?));
                }
                flows
            }
            Technology::Boiler(t) => vec![
                PortFlow::input(t.fuel, reference),
                PortFlow::output(Heat, t.thermal_power(reference)?),
                PortFlow::output(Co2, t.co2_emissions(reference)?),
            ],
            Technology::Digester(t) => {
                let total = non_negative(&t.name, "feed", reference)?;
                let (m_s, m_bm) = t.split_feed(total);
                let out = t.digest(m_s, m_bm)?;
                vec![
                    PortFlow::input(Heat, out.heat_kwh),
                    PortFlow::signed_input(TreatedWater, out.fresh_water_m3_h),
                    PortFlow::output(Biogas, out.biogas_m3_h),
                    PortFlow::output(Digestate, out.digestate_t_h),
                ]
            }
            Technology::Dewatering(t) => {
                let composition =
                    exogenous
                        .digestate
                        .ok_or_else(|| ParameterError::MissingInput {
                            technology: t.name.clone(),
                            input: "digestate composition",
                        })?;
                let digestate = non_negative(&t.name, "digestate_mass", reference)?;
                let out = t.dewater(
                    digestate,
                    digestate * composition.makeup_per_tonne,
                    composition.total_solids,
                )?;
                vec![
                    PortFlow::input(Digestate, digestate),
                    PortFlow::output(Wastewater, out.wastewater_m3_h),
                    PortFlow::output(TreatedWater, out.recycled_water_m3_h),
                ]
            }
            Technology::Ccu(t) => {
                let out = t.capture(reference)?;
                vec![
                    PortFlow::input(Co2, reference),
                    PortFlow::input(Electricity, out.electricity_kwh),
                    PortFlow::output(CapturedCo2, out.captured_kg),
                    PortFlow::output(Co2, out.released_kg),
                ]
            }
            Technology::Well(t) => vec![
                PortFlow::input(Electricity, t.power(reference)?),
                PortFlow::output(RawWater, reference),
            ],
            Technology::Treatment(t) => {
                let out = t.treat(reference)?;
                vec![
                    PortFlow::input(t.influent, reference),
                    PortFlow::input(Electricity, out.electricity_kwh),
                    PortFlow::output(TreatedWater, out.treated_m3_h),
                ]
            }
        };
        Ok(flows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technology::TechnologyCatalog;

    fn counts(flows: &[PortFlow]) -> PortSignature {
        let inputs = flows
            .iter()
            .filter(|f| f.direction == Direction::Input)
            .count();
        PortSignature::new(inputs, flows.len() - inputs)
    }

    #[test]
    fn evaluated_ports_match_signature() {
        let catalog = TechnologyCatalog::reference().unwrap();
        let digester = AnaerobicDigester::from_spec(catalog.get("digester").unwrap()).unwrap();
        let exo = Exogenous {
            wind_speed: 9.0,
            pm10: 120.0,
            digestate: Some(digester.composition().unwrap()),
        };
        for spec in catalog.iter().filter(|s| {
            !s.kind.is_storage() && s.kind != TechnologyKind::HeatRecovery
        }) {
            let tech = Technology::from_spec(spec).unwrap();
            let flows = tech.evaluate(1.0, &exo).unwrap();
            assert_eq!(counts(&flows), tech.signature(), "{}", tech.name());
        }
    }

    #[test]
    fn microturbine_with_recovery_has_tertiary_heat_port() {
        let catalog = TechnologyCatalog::reference().unwrap();
        let mt = Microturbine::from_spec(catalog.get("microturbine").unwrap())
            .unwrap()
            .with_recovery(HeatRecovery::from_spec(catalog.get("heat_recovery").unwrap()).unwrap());
        let tech = Technology::Microturbine(mt);
        let flows = tech.evaluate(2.0, &Exogenous::default()).unwrap();
        assert_eq!(tech.signature(), PortSignature::new(1, 3));
        assert!(flows
            .iter()
            .any(|f| f.commodity == Commodity::Heat && f.amount > 0.0));
    }

    #[test]
    fn dewatering_needs_composition() {
        let tech = Technology::Dewatering(Dewatering {
            name: "dw".into(),
            wastewater_fraction: 0.25,
            cake_ts: 0.75,
            max_throughput: 100.0,
        });
        let err = tech.evaluate(1.0, &Exogenous::default()).unwrap_err();
        assert!(matches!(err, ParameterError::MissingInput { .. }));
    }

    #[test]
    fn linear_in_reference_flow() {
        let catalog = TechnologyCatalog::reference().unwrap();
        let tech = Technology::from_spec(catalog.get("well").unwrap()).unwrap();
        let one = tech.evaluate(1.0, &Exogenous::default()).unwrap();
        let ten = tech.evaluate(10.0, &Exogenous::default()).unwrap();
        for (a, b) in one.iter().zip(&ten) {
            assert!((b.amount - 10.0 * a.amount).abs() < 1e-9);
        }
    }

    #[test]
    fn storage_specs_are_not_conversion_technologies() {
        let catalog = TechnologyCatalog::reference().unwrap();
        assert!(Technology::from_spec(catalog.get("battery").unwrap()).is_err());
    }
}

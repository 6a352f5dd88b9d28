//! Biogas chain: anaerobic digestion, digestate dewatering, carbon capture.
//!
//! Feed and digestate masses are in t/h and water in m3/h (1 t = 1 m3).
//! Biogas yields are per tonne of volatile solids, so biogas comes out in m3/h.

use serde::{Deserialize, Serialize};

use super::{efficiency, expect_kind, fraction, non_negative, positive};
use crate::error::ParameterError;
use crate::technology::{TechnologyKind, TechnologySpec};

/// kJ per kWh
const KJ_PER_KWH: f64 = 3600.0;
const KG_PER_TONNE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnaerobicDigester {
    pub name: String,
    /// m3
    pub volume: f64,
    pub digestion_efficiency: f64,
    pub sludge_ts: f64,
    pub sludge_vs: f64,
    pub sludge_yield: f64,
    pub biomass_ts: f64,
    pub biomass_vs: f64,
    pub biomass_yield: f64,
    pub digestate_ts: f64,
    /// Nominal sludge feed, t/h
    pub sludge_feed: f64,
    /// Nominal biomass feed, t/h
    pub biomass_feed: f64,
    pub target_temp: f64,
    pub ambient_temp: f64,
    /// kJ/(kg degC)
    pub specific_heat: f64,
    pub loss_factor: f64,
    /// kg VS / (m3 day)
    pub olr_max: f64,
    /// days
    pub hrt_min: f64,
}

/// Four coupled outputs plus the two operating-window indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DigesterOutputs {
    pub biogas_m3_h: f64,
    pub fresh_water_m3_h: f64,
    pub heat_kwh: f64,
    pub digestate_t_h: f64,
    pub olr: f64,
    pub hrt_days: f64,
}

/// Digestate properties a downstream dewatering stage needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DigestateComposition {
    pub total_solids: f64,
    /// Fresh-water makeup carried per tonne of digestate.
    pub makeup_per_tonne: f64,
}

impl AnaerobicDigester {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::AnaerobicDigester)?;
        let n = spec.name.as_str();
        let solid = |key: &str| -> Result<f64, ParameterError> { efficiency(n, key, spec.get(key)?) };
        let digester = Self {
            name: n.to_string(),
            volume: positive(n, "V_digester", spec.get("V_digester")?)?,
            digestion_efficiency: solid("eta_ad")?,
            sludge_ts: solid("TS_s")?,
            sludge_vs: solid("VS_s")?,
            sludge_yield: positive(n, "Y_s", spec.get("Y_s")?)?,
            biomass_ts: solid("TS_bm")?,
            biomass_vs: solid("VS_bm")?,
            biomass_yield: positive(n, "Y_bm", spec.get("Y_bm")?)?,
            digestate_ts: solid("TS_digestate")?,
            sludge_feed: non_negative(n, "m_s", spec.get("m_s")?)?,
            biomass_feed: non_negative(n, "m_bm", spec.get("m_bm")?)?,
            target_temp: spec.get("T_target")?,
            ambient_temp: spec.get("T_amb")?,
            specific_heat: positive(n, "Cp_feed", spec.get("Cp_feed")?)?,
            loss_factor: positive(n, "alpha_loss", spec.get("alpha_loss")?)?,
            olr_max: positive(n, "OLR_max", spec.get("OLR_max")?)?,
            hrt_min: positive(n, "HRT_min", spec.get("HRT_min")?)?,
        };
        if digester.target_temp < digester.ambient_temp {
            return Err(ParameterError::out_of_domain(
                n,
                "T_target",
                digester.target_temp,
                "T_target >= T_amb",
            ));
        }
        positive(n, "m_s + m_bm", digester.nominal_feed())?;
        Ok(digester)
    }

    pub fn nominal_feed(&self) -> f64 {
        self.sludge_feed + self.biomass_feed
    }

    /// Evaluates the digester for one hour of feed.
    pub fn digest(&self, sludge: f64, biomass: f64) -> Result<DigesterOutputs, ParameterError> {
        let m_s = non_negative(&self.name, "sludge_mass", sludge)?;
        let m_bm = non_negative(&self.name, "biomass_mass", biomass)?;

        let vs_sludge = m_s * self.sludge_ts * self.sludge_vs;
        let vs_biomass = m_bm * self.biomass_ts * self.biomass_vs;
        let biogas = self.digestion_efficiency
            * (vs_sludge * self.sludge_yield + vs_biomass * self.biomass_yield);

        let makeup = m_s * (self.sludge_ts / self.digestate_ts - 1.0)
            + m_bm * (self.biomass_ts / self.digestate_ts - 1.0);
        let total = m_s + m_bm + makeup;

        let heat = self.loss_factor
            * total
            * KG_PER_TONNE
            * self.specific_heat
            * (self.target_temp - self.ambient_temp)
            / KJ_PER_KWH;

        let olr = (vs_sludge + vs_biomass) * 24.0 * KG_PER_TONNE / self.volume;
        let hrt_days = if total > 0.0 {
            self.volume / (total * 24.0)
        } else {
            f64::INFINITY
        };

        Ok(DigesterOutputs {
            biogas_m3_h: biogas,
            fresh_water_m3_h: makeup,
            heat_kwh: heat,
            digestate_t_h: m_s + m_bm + makeup,
            olr,
            hrt_days,
        })
    }

    /// Organic loading and retention limits.
    pub fn check_operating_window(&self, out: &DigesterOutputs) -> Result<(), ParameterError> {
        if out.olr > self.olr_max {
            return Err(ParameterError::out_of_domain(
                &self.name,
                "OLR",
                out.olr,
                "OLR <= OLR_max",
            ));
        }
        if out.hrt_days < self.hrt_min {
            return Err(ParameterError::out_of_domain(
                &self.name,
                "HRT",
                out.hrt_days,
                "HRT >= HRT_min",
            ));
        }
        Ok(())
    }

    /// Splits a total feed at the nominal sludge/biomass ratio.
    pub fn split_feed(&self, total_feed: f64) -> (f64, f64) {
        let share = self.sludge_feed / self.nominal_feed();
        (total_feed * share, total_feed * (1.0 - share))
    }

    pub fn composition(&self) -> Result<DigestateComposition, ParameterError> {
        let (m_s, m_bm) = self.split_feed(1.0);
        let out = self.digest(m_s, m_bm)?;
        let digestate = positive(&self.name, "digestate_mass", out.digestate_t_h)?;
        Ok(DigestateComposition {
            total_solids: self.digestate_ts,
            makeup_per_tonne: out.fresh_water_m3_h / digestate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dewatering {
    pub name: String,
    pub wastewater_fraction: f64,
    pub cake_ts: f64,
    /// Digestate throughput limit, m3/h
    pub max_throughput: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DewateringOutputs {
    pub wastewater_m3_h: f64,
    pub recycled_water_m3_h: f64,
    pub solid_cake_t_h: f64,
}

impl Dewatering {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::Dewatering)?;
        let n = spec.name.as_str();
        Ok(Self {
            name: n.to_string(),
            wastewater_fraction: fraction(
                n,
                "wastewater_fraction",
                spec.get("wastewater_fraction")?,
            )?,
            cake_ts: efficiency(n, "TS_cake", spec.get("TS_cake")?)?,
            max_throughput: positive(n, "V_d_max", spec.get("V_d_max")?)?,
        })
    }

    /// Splits the makeup water carried by the digestate.
    ///
    /// A negative makeup is a feed wetter than the digestate target: the
    /// digester already releases that surplus on its treated-water port, so
    /// the press receives no makeup water to split and only produces cake.
    pub fn dewater(
        &self,
        digestate_mass: f64,
        fresh_water_makeup: f64,
        digestate_ts: f64,
    ) -> Result<DewateringOutputs, ParameterError> {
        let m_d = non_negative(&self.name, "digestate_mass", digestate_mass)?;
        if !fresh_water_makeup.is_finite() {
            return Err(ParameterError::out_of_domain(
                &self.name,
                "fresh_water_makeup",
                fresh_water_makeup,
                "finite value",
            ));
        }
        let makeup = fresh_water_makeup.max(0.0);
        let ts_d = efficiency(&self.name, "digestate_ts", digestate_ts)?;
        let wastewater = self.wastewater_fraction * makeup;
        Ok(DewateringOutputs {
            wastewater_m3_h: wastewater,
            recycled_water_m3_h: makeup - wastewater,
            solid_cake_t_h: m_d * ts_d / self.cake_ts,
        })
    }
}

/// Post-combustion carbon capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonCapture {
    pub name: String,
    pub capture_efficiency: f64,
    /// kWh per kg captured, proportional to capture rate
    pub capture_kwh_per_kg: f64,
    /// kWh per kg captured, auxiliary load of the plant
    pub stationary_kwh_per_kg: f64,
    /// Influent CO2 limit, kg/h
    pub max_influent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureOutputs {
    pub captured_kg: f64,
    pub released_kg: f64,
    pub electricity_kwh: f64,
}

impl CarbonCapture {
    pub fn from_spec(spec: &TechnologySpec) -> Result<Self, ParameterError> {
        expect_kind(spec, TechnologyKind::Ccu)?;
        let n = spec.name.as_str();
        Ok(Self {
            name: n.to_string(),
            capture_efficiency: efficiency(
                n,
                "capture_efficiency",
                spec.get("capture_efficiency")?,
            )?,
            capture_kwh_per_kg: non_negative(
                n,
                "capture_kwh_per_kg",
                spec.get("capture_kwh_per_kg")?,
            )?,
            stationary_kwh_per_kg: non_negative(
                n,
                "stationary_kwh_per_kg",
                spec.get("stationary_kwh_per_kg")?,
            )?,
            max_influent: positive(n, "max_co2_kg_h", spec.get("max_co2_kg_h")?)?,
        })
    }

    /// Energy per kg captured, both terms included.
    pub fn energy_per_kg(&self) -> f64 {
        self.stationary_kwh_per_kg + self.capture_kwh_per_kg
    }

    pub fn capture(&self, influent_kg: f64) -> Result<CaptureOutputs, ParameterError> {
        let influent = non_negative(&self.name, "influent_co2", influent_kg)?;
        let captured = influent * self.capture_efficiency;
        Ok(CaptureOutputs {
            captured_kg: captured,
            released_kg: influent * (1.0 - self.capture_efficiency),
            electricity_kwh: self.energy_per_kg() * captured,
        })
    }
}

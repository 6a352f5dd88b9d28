use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Technology family. Each family has one fixed key set; nested
/// (two-level) keys are written `table.key`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TechnologyKind {
    WindTurbine,
    GasMicroturbine,
    HeatRecovery,
    GasBoiler,
    AnaerobicDigester,
    Dewatering,
    Ccu,
    GroundwaterWell,
    WaterTreatment,
    WastewaterTreatment,
    Battery,
    ThermalStorage,
    ElevatedTank,
}

const WIND_TURBINE: &[&str] = &[
    "rated_capacity_kw",
    "cut_in_speed",
    "rated_speed",
    "cut_out_speed",
    "curve_exponent",
    "availability",
    "dust_alpha",
    "dust_beta",
    "dust_gamma",
    "lifecycle_emissions",
    "capex",
];

const GAS_MICROTURBINE: &[&str] = &[
    "rated_capacity_kw",
    "electrical_efficiency",
    "fuel_lhv",
    "emission_factor",
    "capex",
];

const HEAT_RECOVERY: &[&str] = &["recovery_efficiency", "capex"];

const GAS_BOILER: &[&str] = &[
    "rated_capacity_kw",
    "thermal_efficiency",
    "fuel_lhv",
    "emission_factor",
    "capex",
];

const ANAEROBIC_DIGESTER: &[&str] = &[
    "V_digester",
    "eta_ad",
    "TS_s",
    "VS_s",
    "Y_s",
    "TS_bm",
    "VS_bm",
    "Y_bm",
    "TS_digestate",
    "m_s",
    "m_bm",
    "T_target",
    "T_amb",
    "Cp_feed",
    "alpha_loss",
    "OLR_max",
    "HRT_min",
    "capex",
];

const DEWATERING: &[&str] = &["wastewater_fraction", "TS_cake", "V_d_max", "capex"];

const CCU: &[&str] = &[
    "capture_efficiency",
    "capture_kwh_per_kg",
    "stationary_kwh_per_kg",
    "max_co2_kg_h",
    "capex",
];

const GROUNDWATER_WELL: &[&str] = &[
    "pump_specs.efficiency",
    "pump_specs.power_rating",
    "well_specs.depth",
    "well_specs.max_extraction",
    "capex",
];

const TREATMENT: &[&str] = &["energy_kwh_per_m3", "recovery_rate", "capacity_m3_h", "capex"];

const STORAGE: &[&str] = &[
    "energy_capacity",
    "power_capacity",
    "charge_efficiency",
    "discharge_efficiency",
    "self_discharge",
    "soc_min",
    "soc_max",
    "soc_initial",
    "capex",
];

impl TechnologyKind {
    /// The complete key set of this family. Every key is required.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            TechnologyKind::WindTurbine => WIND_TURBINE,
            TechnologyKind::GasMicroturbine => GAS_MICROTURBINE,
            TechnologyKind::HeatRecovery => HEAT_RECOVERY,
            TechnologyKind::GasBoiler => GAS_BOILER,
            TechnologyKind::AnaerobicDigester => ANAEROBIC_DIGESTER,
            TechnologyKind::Dewatering => DEWATERING,
            TechnologyKind::Ccu => CCU,
            TechnologyKind::GroundwaterWell => GROUNDWATER_WELL,
            TechnologyKind::WaterTreatment | TechnologyKind::WastewaterTreatment => TREATMENT,
            TechnologyKind::Battery
            | TechnologyKind::ThermalStorage
            | TechnologyKind::ElevatedTank => STORAGE,
        }
    }

    pub fn accepts(self, key: &str) -> bool {
        self.required_keys().contains(&key)
    }

    pub fn is_storage(self) -> bool {
        matches!(
            self,
            TechnologyKind::Battery | TechnologyKind::ThermalStorage | TechnologyKind::ElevatedTank
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_kind_carries_capex() {
        for kind in TechnologyKind::iter() {
            assert!(kind.accepts("capex"), "{kind} lacks capex");
        }
    }

    #[test]
    fn well_uses_nested_keys_only() {
        let kind = TechnologyKind::GroundwaterWell;
        assert!(kind.accepts("pump_specs.efficiency"));
        assert!(!kind.accepts("efficiency"));
        assert!(!kind.accepts("pump_efficiency"));
    }
}

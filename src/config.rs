use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::domain::{Horizon, SocPolicy};

/// Immutable run configuration, passed explicitly into network construction
/// and the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub solver: SolverConfig,
    pub horizon: HorizonConfig,
    #[validate(nested)]
    pub prices: PriceConfig,
    #[validate(nested)]
    pub penalties: PenaltyConfig,
    #[validate(nested)]
    pub carbon: CarbonConfig,
    #[validate(nested)]
    pub economics: EconomicsConfig,
    pub inputs: InputConfig,
    #[serde(default)]
    #[validate(nested)]
    pub scenarios: Vec<ScenarioConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Pure-Rust simplex with branch and bound
    Microlp,
}

impl SolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Microlp => "microlp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SolverConfig {
    pub backend: SolverKind,
    #[validate(range(min = 1, max = 86_400))]
    pub timeout_seconds: u64,
    /// Forbid simultaneous charge and discharge with a binary indicator.
    pub storage_exclusivity: bool,
}

impl SolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonConfig {
    pub hours: Horizon,
    pub soc_policy: SocPolicy,
}

/// Operating costs, USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PriceConfig {
    #[validate(range(min = 0.0))]
    pub natural_gas_per_m3: f64,
    #[validate(range(min = 0.0))]
    pub grid_per_kwh: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub grid_capacity_kw: f64,
    #[validate(range(min = 0.0))]
    pub digester_feed_per_t: f64,
    #[validate(range(min = 0.0))]
    pub battery_cycle_per_kwh: f64,
    #[validate(range(min = 0.0))]
    pub thermal_cycle_per_kwh: f64,
    #[validate(range(min = 0.0))]
    pub tank_cycle_per_m3: f64,
}

/// Slack penalties, USD per unit of the bus commodity. All strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PenaltyConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub unserved_electricity: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub unserved_heat: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub unserved_water: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub curtailment: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub wastewater_discharge: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub co2_venting: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub captured_co2_handling: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub biogas_flaring: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub digestate_disposal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TierTerms {
    #[validate(range(min = 0.0))]
    pub price_per_ton: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub transaction_cost: f64,
    #[validate(range(min = 0.0))]
    pub verification_cost: f64,
    /// Applied only to PGC with a water-access improvement.
    #[validate(range(min = 1.0))]
    pub social_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TierTable {
    #[validate(nested)]
    pub vcc: TierTerms,
    #[validate(nested)]
    pub ccc: TierTerms,
    #[validate(nested)]
    pub pgc: TierTerms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CarbonConfig {
    #[validate(nested)]
    pub tiers: TierTable,
    /// Grid emission factor displaced by renewable output, kg CO2/kWh
    #[validate(range(min = 0.0))]
    pub baseline_kg_per_kwh: f64,
}

/// Capital cost annualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EconomicsConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub discount_rate: f64,
    /// Default asset lifetime, years
    #[validate(range(min = 1, max = 100))]
    pub lifetime_years: u32,
    /// Lifetime overrides by technology name
    #[serde(default)]
    pub lifetimes: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub timeseries: Option<PathBuf>,
    pub technologies: Option<PathBuf>,
}

/// One independent what-if run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ScenarioConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub soc_policy: Option<SocPolicy>,
    #[serde(default = "one")]
    #[validate(range(min = 0.0))]
    pub demand_scale: f64,
    #[serde(default = "one")]
    #[validate(range(min = 0.0))]
    pub pm10_scale: f64,
    pub carbon_tier: String,
    #[serde(default)]
    pub water_access_improvement: bool,
}

fn one() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver: SolverConfig {
                backend: SolverKind::Microlp,
                timeout_seconds: 300,
                storage_exclusivity: true,
            },
            horizon: HorizonConfig {
                hours: Horizon::Week,
                soc_policy: SocPolicy::Initial,
            },
            prices: PriceConfig {
                natural_gas_per_m3: 0.08,
                grid_per_kwh: 0.12,
                grid_capacity_kw: 5000.0,
                digester_feed_per_t: 2.0,
                battery_cycle_per_kwh: 0.01,
                thermal_cycle_per_kwh: 0.002,
                tank_cycle_per_m3: 0.0001,
            },
            penalties: PenaltyConfig {
                unserved_electricity: 2.0,
                unserved_heat: 1.0,
                unserved_water: 5.0,
                curtailment: 0.0001,
                wastewater_discharge: 5.0,
                co2_venting: 0.035,
                captured_co2_handling: 0.001,
                biogas_flaring: 0.01,
                digestate_disposal: 1.0,
            },
            carbon: CarbonConfig {
                tiers: TierTable {
                    vcc: TierTerms {
                        price_per_ton: 15.0,
                        transaction_cost: 0.05,
                        verification_cost: 5000.0,
                        social_multiplier: 1.0,
                    },
                    ccc: TierTerms {
                        price_per_ton: 35.0,
                        transaction_cost: 0.10,
                        verification_cost: 15000.0,
                        social_multiplier: 1.0,
                    },
                    pgc: TierTerms {
                        price_per_ton: 50.0,
                        transaction_cost: 0.08,
                        verification_cost: 12000.0,
                        social_multiplier: 1.3,
                    },
                },
                baseline_kg_per_kwh: 0.550,
            },
            economics: EconomicsConfig {
                discount_rate: 0.08,
                lifetime_years: 20,
                lifetimes: BTreeMap::from([
                    ("battery".to_string(), 15),
                    ("dewatering".to_string(), 15),
                    ("thermal_storage".to_string(), 25),
                ]),
            },
            inputs: InputConfig::default(),
            scenarios: Vec::new(),
        }
    }
}

impl Config {
    /// Built-in defaults, then `config/default.toml`, then `NEXUS__*` variables.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("NEXUS__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("loading configuration")?;
        config.validate().context("validating configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn toml_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/default.toml",
                r#"
                [horizon]
                hours = 720
                soc_policy = "cyclic"

                [[scenarios]]
                name = "dusty"
                pm10_scale = 2.0
                carbon_tier = "PGC"
                water_access_improvement = true
                "#,
            )?;
            jail.set_env("NEXUS__SOLVER__TIMEOUT_SECONDS", "45");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.horizon.hours, Horizon::Month);
            assert_eq!(config.horizon.soc_policy, SocPolicy::Cyclic);
            assert_eq!(config.solver.timeout_seconds, 45);
            assert_eq!(config.scenarios.len(), 1);
            assert_eq!(config.scenarios[0].demand_scale, 1.0);
            assert_eq!(config.carbon.tiers.pgc.price_per_ton, 50.0);
            Ok(())
        });
    }

    #[test]
    fn unsupported_horizon_fails_to_load() {
        Jail::expect_with(|jail| {
            jail.set_env("NEXUS__HORIZON__HOURS", "24");
            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn economics_section_layers_like_the_rest() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/default.toml",
                r#"
                [economics]
                discount_rate = 0.05

                [economics.lifetimes]
                ccu = 12
                "#,
            )?;
            jail.set_env("NEXUS__ECONOMICS__LIFETIME_YEARS", "25");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.economics.discount_rate, 0.05);
            assert_eq!(config.economics.lifetime_years, 25);
            assert_eq!(config.economics.lifetimes["ccu"], 12);
            Ok(())
        });
    }

    #[test]
    fn discount_rate_above_one_fails_validation() {
        let mut config = Config::default();
        config.economics.discount_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_penalty_fails_validation() {
        let mut config = Config::default();
        config.penalties.unserved_heat = 0.0;
        assert!(config.validate().is_err());
    }
}

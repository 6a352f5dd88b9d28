//! Saravan wind-water-biogas nexus.
//!
//! One bus per commodity. Converter coefficients come from the formula
//! library evaluated at unit reference flow, so every balance row is derived
//! from declared ports only.

use strum::IntoEnumIterator;
use tracing::info;

use super::{Converter, Generator, Load, Network, NetworkBuilder, SlackPolicy, StorageUnit};
use crate::config::Config;
use crate::domain::{Commodity, TimeSeriesInputs};
use crate::error::NexusError;
use crate::formulas::{
    AnaerobicDigester, CarbonCapture, Exogenous, GasBoiler, HeatRecovery, Microturbine,
    StorageParams, Technology, WindTurbine,
};
use crate::technology::TechnologyCatalog;

pub const WIND_TURBINES: [&str; 2] = ["hawt", "bladeless"];
pub const GRID: &str = "grid_backup";
pub const GAS_SUPPLY: &str = "gas_supply";

fn bus_for(commodity: Commodity) -> String {
    commodity.to_string()
}

pub struct ReferenceNexus;

impl ReferenceNexus {
    pub fn build(
        catalog: &TechnologyCatalog,
        inputs: &TimeSeriesInputs,
        config: &Config,
    ) -> Result<Network, NexusError> {
        let horizon = config.horizon.hours;
        inputs.validate(horizon)?;
        catalog.validate()?;

        let mut builder = NetworkBuilder::new();
        let p = &config.penalties;
        for commodity in Commodity::iter() {
            let bus = builder.add_bus(bus_for(commodity), commodity);
            let slack = match commodity {
                Commodity::Electricity => Some(SlackPolicy::both(
                    p.unserved_electricity,
                    p.curtailment,
                )),
                Commodity::Heat => Some(SlackPolicy::both(p.unserved_heat, p.curtailment)),
                Commodity::TreatedWater => {
                    Some(SlackPolicy::both(p.unserved_water, p.curtailment))
                }
                Commodity::Biogas => Some(SlackPolicy::surplus(p.biogas_flaring)),
                Commodity::Digestate => Some(SlackPolicy::surplus(p.digestate_disposal)),
                Commodity::Co2 => Some(SlackPolicy::surplus(p.co2_venting)),
                Commodity::CapturedCo2 => Some(SlackPolicy::surplus(p.captured_co2_handling)),
                Commodity::Wastewater => Some(SlackPolicy::surplus(p.wastewater_discharge)),
                Commodity::NaturalGas | Commodity::RawWater => None,
            };
            if let Some(slack) = slack {
                bus.with_slack(slack);
            }
        }

        // Wind
        for name in WIND_TURBINES {
            let turbine = WindTurbine::from_spec(catalog.get(name)?)?;
            let availability = inputs
                .wind_speed
                .iter()
                .zip(&inputs.pm10)
                .map(|(v, pm)| turbine.capacity_factor(*v, *pm))
                .collect::<Result<Vec<_>, _>>()?;
            let avoided =
                (config.carbon.baseline_kg_per_kwh - turbine.lifecycle_emissions).max(0.0);
            builder.add_component(
                Generator::new(name, bus_for(Commodity::Electricity), turbine.rated_capacity_kw)
                    .with_availability(availability)
                    .with_avoided_co2(avoided),
            );
        }

        builder.add_component(
            Generator::new(
                GRID,
                bus_for(Commodity::Electricity),
                config.prices.grid_capacity_kw,
            )
            .with_marginal_cost(config.prices.grid_per_kwh),
        );

        // Gas-fired units
        let microturbine = Microturbine::from_spec(catalog.get("microturbine")?)?
            .with_recovery(HeatRecovery::from_spec(catalog.get("heat_recovery")?)?);
        let gas_boiler = GasBoiler::from_spec(catalog.get("gas_boiler")?)?;
        let biogas_boiler =
            GasBoiler::from_spec(catalog.get("biogas_boiler")?)?.burning(Commodity::Biogas);

        builder.add_component(
            Generator::new(
                GAS_SUPPLY,
                bus_for(Commodity::NaturalGas),
                microturbine.rated_fuel_flow() + gas_boiler.rated_fuel_flow(),
            )
            .with_marginal_cost(config.prices.natural_gas_per_m3),
        );

        let exogenous = Exogenous::default();
        for technology in [
            Technology::Microturbine(microturbine),
            Technology::Boiler(gas_boiler),
            Technology::Boiler(biogas_boiler),
        ] {
            builder.add_component(Converter::from_technology(&technology, &exogenous, bus_for)?);
        }

        // Biogas chain
        let digester = AnaerobicDigester::from_spec(catalog.get("digester")?)?;
        let (m_s, m_bm) = digester.split_feed(digester.nominal_feed());
        digester.check_operating_window(&digester.digest(m_s, m_bm)?)?;
        let chain = Exogenous {
            digestate: Some(digester.composition()?),
            ..Exogenous::default()
        };
        builder.add_component(
            Converter::from_technology(&Technology::Digester(digester), &chain, bus_for)?
                .with_marginal_cost(config.prices.digester_feed_per_t),
        );
        builder.add_component(Converter::from_technology(
            &Technology::from_spec(catalog.get("dewatering")?)?,
            &chain,
            bus_for,
        )?);

        let ccu = CarbonCapture::from_spec(catalog.get("ccu")?)?;
        let captured_per_kg = ccu.capture_efficiency;
        builder.add_component(
            Converter::from_technology(&Technology::Ccu(ccu), &exogenous, bus_for)?
                .with_avoided_co2(captured_per_kg),
        );

        // Water
        for name in ["well", "water_treatment", "wastewater_treatment"] {
            builder.add_component(Converter::from_technology(
                &Technology::from_spec(catalog.get(name)?)?,
                &exogenous,
                bus_for,
            )?);
        }

        // Storage
        let prices = &config.prices;
        for (name, commodity, cycle_cost) in [
            ("battery", Commodity::Electricity, prices.battery_cycle_per_kwh),
            ("thermal_storage", Commodity::Heat, prices.thermal_cycle_per_kwh),
            ("elevated_tank", Commodity::TreatedWater, prices.tank_cycle_per_m3),
        ] {
            let params = StorageParams::from_spec(catalog.get(name)?)?;
            builder.add_component(StorageUnit::new(bus_for(commodity), params, cycle_cost));
        }

        // Demand
        for (name, commodity, series) in [
            ("electricity_demand", Commodity::Electricity, &inputs.electricity_demand),
            ("heat_demand", Commodity::Heat, &inputs.heat_demand),
            ("water_demand", Commodity::TreatedWater, &inputs.water_demand),
        ] {
            builder.add_component(Load::new(name, bus_for(commodity), series.clone()));
        }

        let network = builder.build()?;
        network.check_horizon(horizon)?;
        info!(
            horizon = %horizon,
            buses = network.bus_count(),
            components = network.component_count(),
            "reference nexus assembled"
        );
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Horizon;
    use crate::error::ParameterError;
    use crate::network::Component;

    fn inputs() -> TimeSeriesInputs {
        TimeSeriesInputs::constant(Horizon::Week, 400.0, 150.0, 20.0, 9.0, 120.0)
    }

    #[test]
    fn builds_every_commodity_bus() {
        let catalog = TechnologyCatalog::reference().unwrap();
        let network = ReferenceNexus::build(&catalog, &inputs(), &Config::default()).unwrap();
        assert_eq!(network.bus_count(), Commodity::iter().count());
        assert!(network.component_id("microturbine").is_some());
        assert!(network.component_id("elevated_tank").is_some());
    }

    #[test]
    fn wind_availability_follows_dust_derated_curve() {
        let catalog = TechnologyCatalog::reference().unwrap();
        let network = ReferenceNexus::build(&catalog, &inputs(), &Config::default()).unwrap();
        let id = network.component_id("hawt").unwrap();
        let Component::Generator(g) = network.component(id) else {
            panic!("hawt should be a generator");
        };
        let turbine = WindTurbine::from_spec(catalog.get("hawt").unwrap()).unwrap();
        let expected = turbine.capacity_factor(9.0, 120.0).unwrap();
        assert!((g.availability.at(5) - expected).abs() < 1e-12);
        assert!((g.avoided_co2_kg_per_unit - (0.550 - 0.011)).abs() < 1e-12);
    }

    #[test]
    fn sludge_heavy_digester_still_builds() {
        let mut catalog = TechnologyCatalog::reference().unwrap();
        let wet = catalog.get("digester").unwrap().clone().with("m_bm", 0.1);
        catalog.upsert(wet);
        let network = ReferenceNexus::build(&catalog, &inputs(), &Config::default()).unwrap();

        let port = |component: &str, bus: Commodity| {
            let Component::Converter(c) = network.component(network.component_id(component).unwrap())
            else {
                panic!("{component} should be a converter");
            };
            c.ports
                .iter()
                .find(|p| p.bus == bus.to_string())
                .map(|p| (p.direction, p.coefficient.at(0)))
        };
        let (direction, released) = port("digester", Commodity::TreatedWater).unwrap();
        assert_eq!(direction, crate::formulas::Direction::Output);
        assert!(released > 0.0);
        let (_, wastewater) = port("dewatering", Commodity::Wastewater).unwrap();
        assert_eq!(wastewater, 0.0);
    }

    #[test]
    fn missing_technology_is_named() {
        let catalog = TechnologyCatalog::new(Vec::new());
        let err = ReferenceNexus::build(&catalog, &inputs(), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("hawt"));
    }

    #[test]
    fn short_series_is_rejected() {
        let catalog = TechnologyCatalog::reference().unwrap();
        let mut short = inputs();
        short.pm10.pop();
        let err = ReferenceNexus::build(&catalog, &short, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            NexusError::Parameter(ParameterError::SeriesLength { .. })
        ));
    }
}

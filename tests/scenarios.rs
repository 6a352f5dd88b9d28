use nexus_dispatch::carbon::CarbonTier;
use nexus_dispatch::config::{Config, ScenarioConfig};
use nexus_dispatch::domain::{Horizon, TimeSeriesInputs};
use nexus_dispatch::optimizer::backend_for;
use nexus_dispatch::scenario::{run_scenarios, Scenario};
use nexus_dispatch::technology::TechnologyCatalog;

fn scenario(name: &str, pm10_scale: f64, tier: &str, water: bool) -> ScenarioConfig {
    ScenarioConfig {
        name: name.into(),
        soc_policy: None,
        demand_scale: 1.0,
        pm10_scale,
        carbon_tier: tier.into(),
        water_access_improvement: water,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenarios_run_independently_and_keep_order() {
    let config = Config::default();
    let catalog = TechnologyCatalog::reference().unwrap();
    let inputs = TimeSeriesInputs::constant(Horizon::Week, 450.0, 140.0, 22.0, 10.0, 100.0);

    let scenarios = [
        scenario("clear", 1.0, "PGC", true),
        scenario("dust_storm", 4.0, "PGC", true),
    ]
    .iter()
    .map(|sc| Scenario::from_config(&config, sc, &catalog, &inputs).unwrap())
    .collect();

    let outcomes = run_scenarios(scenarios, backend_for(config.solver.backend)).await;
    let names: Vec<_> = outcomes.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["clear", "dust_storm"]);

    let clear = outcomes[0].1.as_ref().unwrap();
    let dusty = outcomes[1].1.as_ref().unwrap();
    assert!(!clear.result.is_failed());
    assert!(!dusty.result.is_failed());

    let wind = |o: &nexus_dispatch::scenario::ScenarioOutcome| {
        o.result.total("hawt").unwrap() + o.result.total("bladeless").unwrap()
    };
    assert!(wind(dusty) < wind(clear));

    let revenue = clear.revenue.as_ref().unwrap();
    assert_eq!(revenue.tier, CarbonTier::Pgc);
    assert!(revenue.social_bonus > 0.0);
    assert!((revenue.co2_avoided_t - clear.result.co2_avoided_tons()).abs() < 1e-9);

    let hawt_lcoe = |o: &nexus_dispatch::scenario::ScenarioOutcome| {
        o.economics.as_ref().unwrap().technologies["hawt"].lcoe.unwrap()
    };
    assert!(hawt_lcoe(dusty) > hawt_lcoe(clear));
    let economics = clear.economics.as_ref().unwrap();
    assert!(economics.annualized_capex > 0.0);
    assert!(economics.system_lcoe.unwrap() > 0.0);

    let report = serde_json::to_value(clear.report()).unwrap();
    assert_eq!(report["name"], "clear");
    assert_eq!(report["summary"]["status"], "optimal");
    assert!(report["summary"]["economics"]["system_lcoe"].as_f64().unwrap() > 0.0);
}

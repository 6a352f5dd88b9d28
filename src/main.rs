use anyhow::{Context, Result};
use nexus_dispatch::{config, optimizer, scenario, technology, telemetry};
use config::Config;
use nexus_dispatch::domain::TimeSeriesInputs;
use scenario::{run_scenarios, Scenario};
use technology::TechnologyCatalog;
use telemetry::init_tracing;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut cfg = Config::load()?;

    // nexus-dispatch [TIMESERIES_JSON] [TECHNOLOGIES_TOML]
    let mut args = std::env::args().skip(1);
    if let Some(path) = args.next() {
        cfg.inputs.timeseries = Some(path.into());
    }
    if let Some(path) = args.next() {
        cfg.inputs.technologies = Some(path.into());
    }

    let catalog = match &cfg.inputs.technologies {
        Some(path) => TechnologyCatalog::from_toml_file(path)?,
        None => TechnologyCatalog::reference().context("parsing bundled technology catalog")?,
    };
    catalog.validate()?;

    let Some(path) = &cfg.inputs.timeseries else {
        anyhow::bail!(
            "no time series configured: set inputs.timeseries in config/default.toml \
             or NEXUS__INPUTS__TIMESERIES"
        );
    };
    let inputs = TimeSeriesInputs::from_json_file(path)?;

    let scenarios = if cfg.scenarios.is_empty() {
        vec![Scenario::baseline(&cfg, &catalog, &inputs)?]
    } else {
        cfg.scenarios
            .iter()
            .map(|sc| Scenario::from_config(&cfg, sc, &catalog, &inputs))
            .collect::<Result<Vec<_>, _>>()?
    };

    info!(
        scenarios = scenarios.len(),
        horizon = %cfg.horizon.hours,
        backend = cfg.solver.backend.as_str(),
        "starting nexus dispatch"
    );

    let backend = optimizer::backend_for(cfg.solver.backend);
    let mut failures = 0;
    for (name, outcome) in run_scenarios(scenarios, backend).await {
        match outcome {
            Ok(outcome) => {
                if outcome.result.is_failed() {
                    warn!(scenario = %name, diagnostic = ?outcome.result.diagnostic, "dispatch failed");
                }
                println!("{}", serde_json::to_string_pretty(&outcome.report())?);
            }
            Err(err) => {
                failures += 1;
                error!(scenario = %name, error = %err, "scenario aborted");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} scenario(s) aborted");
    }
    Ok(())
}

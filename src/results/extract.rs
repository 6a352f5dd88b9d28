use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::series::{BusSlackSeries, ComponentSeries, DispatchResult, ResultStatus};
use crate::network::{Component, Network};
use crate::optimizer::{AssembledProgram, ComponentVars, SolveOutcome, SolveStatus, VarId};

pub struct ResultExtractor;

impl ResultExtractor {
    /// Whether a solve may be read at all.
    ///
    /// Optimal needs an objective; suboptimal needs a strictly positive one.
    /// Every other combination is rejected with a reason.
    pub fn accept(outcome: &dyn SolveOutcome) -> Result<ResultStatus, String> {
        match (outcome.status(), outcome.objective()) {
            (SolveStatus::Optimal, Some(obj)) if obj.is_finite() => Ok(ResultStatus::Optimal),
            (SolveStatus::Suboptimal, Some(obj)) if obj.is_finite() && obj > 0.0 => {
                Ok(ResultStatus::Suboptimal)
            }
            (SolveStatus::Suboptimal, Some(obj)) => Err(format!(
                "suboptimal solve with non-positive objective {obj}"
            )),
            (status, None) => Err(format!("solver status `{status}` without an objective value")),
            (status, Some(obj)) => Err(format!(
                "solver status `{status}` (objective {obj}) cannot be extracted"
            )),
        }
    }

    pub fn extract(
        outcome: &dyn SolveOutcome,
        program: &AssembledProgram,
        network: &Network,
    ) -> DispatchResult {
        let horizon = program.horizon;
        let status = match Self::accept(outcome) {
            Ok(status) => status,
            Err(reason) => {
                let diagnostic = match outcome.diagnostic() {
                    Some(extra) => format!("{reason}: {extra}"),
                    None => reason,
                };
                warn!(%diagnostic, "solve not extractable");
                return DispatchResult::failed(horizon, outcome.status(), diagnostic);
            }
        };

        let dt = horizon.step_hours();
        let read = |vars: &[VarId]| -> Option<Vec<f64>> {
            vars.iter().map(|v| outcome.value(*v)).collect()
        };

        let mut components = BTreeMap::new();
        let mut co2_avoided_kg = vec![0.0; horizon.hours()];

        for (id, component) in network.components() {
            let series = match (component, program.map.component(id)) {
                (_, ComponentVars::Flow(vars)) => read(vars).map(|values| ComponentSeries::Flow { values }),
                (
                    _,
                    ComponentVars::Storage {
                        charge,
                        discharge,
                        soc,
                        ..
                    },
                ) => match (read(charge), read(discharge), read(soc)) {
                    (Some(charge), Some(discharge), Some(soc)) => Some(ComponentSeries::Storage {
                        charge,
                        discharge,
                        soc,
                    }),
                    _ => None,
                },
                (Component::Load(l), ComponentVars::Fixed) => Some(ComponentSeries::Load {
                    demand: horizon.snapshots().map(|t| l.demand.at(t)).collect(),
                }),
                (_, ComponentVars::Fixed) => None,
            };

            let Some(series) = series else {
                debug!(component = component.name(), "no solver values, skipped");
                continue;
            };

            let factor = match component {
                Component::Generator(g) => g.avoided_co2_kg_per_unit,
                Component::Converter(c) => c.avoided_co2_kg_per_unit,
                _ => 0.0,
            };
            if let (ComponentSeries::Flow { values }, true) = (&series, factor != 0.0) {
                for (acc, v) in co2_avoided_kg.iter_mut().zip(values) {
                    *acc += v * factor * dt;
                }
            }
            components.insert(component.name().to_string(), series);
        }

        let mut slacks = BTreeMap::new();
        for (id, bus) in network.buses() {
            let vars = program.map.slack(id);
            if vars.shortage.is_none() && vars.surplus.is_none() {
                continue;
            }
            let shortage = vars.shortage.as_deref().map(read);
            let surplus = vars.surplus.as_deref().map(read);
            if matches!(shortage, Some(None)) || matches!(surplus, Some(None)) {
                debug!(bus = %bus.name, "no slack values, skipped");
                continue;
            }
            slacks.insert(
                bus.name.clone(),
                BusSlackSeries {
                    shortage: shortage.flatten(),
                    surplus: surplus.flatten(),
                },
            );
        }

        DispatchResult {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            horizon,
            status,
            solver_status: outcome.status(),
            objective: outcome.objective(),
            diagnostic: outcome.diagnostic(),
            components,
            slacks,
            co2_avoided_kg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Commodity, Horizon, SocPolicy};
    use crate::network::{Generator, Load, NetworkBuilder, SlackPolicy};
    use crate::optimizer::{ExclusivitySet, MockSolveOutcome};
    use rstest::rstest;

    fn fixture() -> (Network, AssembledProgram) {
        let mut b = NetworkBuilder::new();
        b.add_bus("el", Commodity::Electricity)
            .with_slack(SlackPolicy::shortage(2.0));
        b.add_component(Generator::new("wind", "el", 10.0).with_avoided_co2(0.5))
            .add_component(Generator::new("grid", "el", 100.0))
            .add_component(Load::new("demand", "el", 4.0));
        let net = b.build().unwrap();
        let lp = AssembledProgram::assemble(&net, Horizon::Week, SocPolicy::Initial, &ExclusivitySet::new())
            .unwrap();
        (net, lp)
    }

    fn outcome(status: SolveStatus, objective: Option<f64>) -> MockSolveOutcome {
        let mut o = MockSolveOutcome::new();
        o.expect_status().return_const(status);
        o.expect_objective().return_const(objective);
        o.expect_diagnostic().return_const(None::<String>);
        o
    }

    #[rstest]
    #[case(SolveStatus::Optimal, Some(0.0), Ok(ResultStatus::Optimal))]
    #[case(SolveStatus::Optimal, None, Err(()))]
    #[case(SolveStatus::Suboptimal, Some(12.5), Ok(ResultStatus::Suboptimal))]
    #[case(SolveStatus::Suboptimal, Some(0.0), Err(()))]
    #[case(SolveStatus::Suboptimal, None, Err(()))]
    #[case(SolveStatus::Infeasible, Some(3.0), Err(()))]
    #[case(SolveStatus::SolverError, None, Err(()))]
    fn acceptance_rule(
        #[case] status: SolveStatus,
        #[case] objective: Option<f64>,
        #[case] expected: Result<ResultStatus, ()>,
    ) {
        let o = outcome(status, objective);
        assert_eq!(ResultExtractor::accept(&o).map_err(|_| ()), expected);
    }

    #[test]
    fn suboptimal_without_objective_is_a_failed_result() {
        let (net, lp) = fixture();
        let o = outcome(SolveStatus::Suboptimal, None);
        let result = ResultExtractor::extract(&o, &lp, &net);
        assert!(result.is_failed());
        assert_eq!(result.solver_status, SolveStatus::Suboptimal);
        assert!(result.components.is_empty());
        assert!(result
            .diagnostic
            .as_deref()
            .unwrap()
            .contains("without an objective"));
    }

    #[test]
    fn missing_values_skip_only_that_component() {
        let (net, lp) = fixture();
        let ComponentVars::Flow(wind) = lp.map.component(net.component_id("wind").unwrap()).clone()
        else {
            panic!("wind should be a flow");
        };
        let mut o = outcome(SolveStatus::Optimal, Some(1.0));
        o.expect_value()
            .returning(move |v| if wind.contains(&v) { None } else { Some(1.0) });

        let result = ResultExtractor::extract(&o, &lp, &net);
        assert_eq!(result.status, ResultStatus::Optimal);
        assert!(!result.components.contains_key("wind"));
        assert!(result.components.contains_key("grid"));
        assert!(result.components.contains_key("demand"));
        assert!(result.co2_avoided_kg.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn co2_avoided_follows_flow() {
        let (net, lp) = fixture();
        let mut o = outcome(SolveStatus::Optimal, Some(1.0));
        o.expect_value().returning(|_| Some(2.0));
        let result = ResultExtractor::extract(&o, &lp, &net);
        assert!(result.co2_avoided_kg.iter().all(|v| (*v - 1.0).abs() < 1e-12));
        assert!((result.co2_avoided_tons() - 0.168).abs() < 1e-12);
        assert_eq!(result.slacks["el"].shortage.as_ref().unwrap().len(), 168);
    }
}

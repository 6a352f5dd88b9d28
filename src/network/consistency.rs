use std::collections::{HashMap, HashSet};

use super::{Bus, Component};
use crate::error::{StructuralError, StructuralProblem};

/// Pre-solve structural validation.
///
/// Collects every problem instead of stopping at the first, so a broken
/// network is fixed in one pass.
pub struct ConsistencyChecker;

impl ConsistencyChecker {
    pub fn check(buses: &[Bus], components: &[Component]) -> Result<(), StructuralError> {
        let mut problems = Vec::new();

        Self::duplicate_names(
            "bus",
            buses.iter().map(|b| b.name.as_str()),
            &mut problems,
        );
        Self::duplicate_names(
            "component",
            components.iter().map(Component::name),
            &mut problems,
        );

        let declared: HashSet<&str> = buses.iter().map(|b| b.name.as_str()).collect();
        let mut attached: HashSet<&str> = HashSet::new();

        for component in components {
            for bus in component.buses() {
                if declared.contains(bus) {
                    attached.insert(bus);
                } else {
                    problems.push(StructuralProblem::UndeclaredBus {
                        component: component.name().to_string(),
                        bus: bus.to_string(),
                    });
                }
            }

            for (field, finite) in component.numeric_fields() {
                if !finite {
                    problems.push(StructuralProblem::UndefinedCoefficient {
                        component: component.name().to_string(),
                        field,
                    });
                }
            }

            if let Component::Converter(c) = component {
                let actual = c.port_counts();
                if actual != c.signature {
                    problems.push(StructuralProblem::PortMismatch {
                        component: c.name.clone(),
                        formula: c.formula.clone(),
                        expected_inputs: c.signature.inputs,
                        expected_outputs: c.signature.outputs,
                        inputs: actual.inputs,
                        outputs: actual.outputs,
                    });
                }
            }
        }

        for bus in buses {
            if !attached.contains(bus.name.as_str()) {
                problems.push(StructuralProblem::OrphanBus(bus.name.clone()));
            }
            if let Some(slack) = &bus.slack {
                for value in slack.penalties() {
                    if !(value.is_finite() && value > 0.0) {
                        problems.push(StructuralProblem::NonPositivePenalty {
                            bus: bus.name.clone(),
                            value,
                        });
                    }
                }
            }
        }

        Self::double_counted_demand(components, &mut problems);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(StructuralError { problems })
        }
    }

    fn duplicate_names<'a>(
        kind: &'static str,
        names: impl Iterator<Item = &'a str>,
        problems: &mut Vec<StructuralProblem>,
    ) {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                problems.push(StructuralProblem::DuplicateName {
                    kind,
                    name: name.to_string(),
                });
            }
        }
    }

    /// Two loads on one bus with the same demand profile describe the same
    /// consumption twice.
    fn double_counted_demand(components: &[Component], problems: &mut Vec<StructuralProblem>) {
        let mut seen: HashMap<&str, Vec<(&str, &super::Profile)>> = HashMap::new();
        for component in components {
            let Component::Load(load) = component else {
                continue;
            };
            let on_bus = seen.entry(load.bus.as_str()).or_default();
            if let Some((existing, _)) = on_bus.iter().find(|(_, d)| **d == load.demand) {
                problems.push(StructuralProblem::DoubleCountedDemand {
                    load: load.name.clone(),
                    existing: existing.to_string(),
                    bus: load.bus.clone(),
                });
            }
            on_bus.push((load.name.as_str(), &load.demand));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Commodity;
    use crate::formulas::PortSignature;
    use crate::network::{Converter, Generator, Load, Port, SlackPolicy};

    fn bus(name: &str, commodity: Commodity) -> Bus {
        Bus::new(name, commodity)
    }

    #[test]
    fn clean_network_passes() {
        let buses = vec![bus("el", Commodity::Electricity)];
        let components = vec![
            Generator::new("grid", "el", 100.0).into(),
            Load::new("demand", "el", 50.0).into(),
        ];
        assert!(ConsistencyChecker::check(&buses, &components).is_ok());
    }

    #[test]
    fn reports_every_problem_at_once() {
        let buses = vec![
            bus("el", Commodity::Electricity),
            bus("heat", Commodity::Heat),
        ];
        let boiler = Converter::new("boiler", "gas_boiler", PortSignature::new(1, 2), 10.0)
            .with_port(Port::input("gas", 1.0))
            .with_port(Port::output("el", f64::NAN));
        let components = vec![boiler.into(), Load::new("demand", "el", 5.0).into()];

        let err = ConsistencyChecker::check(&buses, &components).unwrap_err();
        assert!(err.problems.contains(&StructuralProblem::UndeclaredBus {
            component: "boiler".into(),
            bus: "gas".into()
        }));
        assert!(err.problems.contains(&StructuralProblem::OrphanBus("heat".into())));
        assert!(err.problems.contains(&StructuralProblem::UndefinedCoefficient {
            component: "boiler".into(),
            field: "coefficient[el]".into()
        }));
        assert!(err
            .problems
            .iter()
            .any(|p| matches!(p, StructuralProblem::PortMismatch { outputs: 1, .. })));
    }

    #[test]
    fn duplicate_demand_is_flagged() {
        let buses = vec![bus("el", Commodity::Electricity)];
        let components = vec![
            Generator::new("grid", "el", 100.0).into(),
            Load::new("households", "el", vec![1.0, 2.0]).into(),
            Load::new("households_again", "el", vec![1.0, 2.0]).into(),
        ];
        let err = ConsistencyChecker::check(&buses, &components).unwrap_err();
        assert_eq!(
            err.problems,
            vec![StructuralProblem::DoubleCountedDemand {
                load: "households_again".into(),
                existing: "households".into(),
                bus: "el".into()
            }]
        );
    }

    #[test]
    fn zero_slack_penalty_is_rejected() {
        let mut el = bus("el", Commodity::Electricity);
        el.with_slack(SlackPolicy::both(1000.0, 0.0));
        let components = vec![Load::new("demand", "el", 5.0).into()];
        let err = ConsistencyChecker::check(&[el], &components).unwrap_err();
        assert!(matches!(
            err.problems[0],
            StructuralProblem::NonPositivePenalty { value, .. } if value == 0.0
        ));
    }

    #[test]
    fn duplicate_names() {
        let buses = vec![
            bus("el", Commodity::Electricity),
            bus("el", Commodity::Electricity),
        ];
        let components = vec![
            Generator::new("g", "el", 1.0).into(),
            Load::new("g", "el", 1.0).into(),
        ];
        let err = ConsistencyChecker::check(&buses, &components).unwrap_err();
        assert_eq!(
            err.problems
                .iter()
                .filter(|p| matches!(p, StructuralProblem::DuplicateName { .. }))
                .count(),
            2
        );
    }
}

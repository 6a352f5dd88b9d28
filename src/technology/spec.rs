use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TechnologyKind;
use crate::error::ParameterError;

/// A spec value: a number, or a one-level table of numbers for nested specs
/// such as `pump_specs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Table(BTreeMap<String, f64>),
}

/// Immutable parameter record of one technology instance.
///
/// Lookups go through [`TechnologySpec::get`], which refuses keys outside the
/// family's fixed key set and names the missing key otherwise. There is no
/// defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologySpec {
    pub name: String,
    pub kind: TechnologyKind,
    #[serde(default)]
    params: BTreeMap<String, SpecValue>,
}

impl TechnologySpec {
    pub fn new(name: impl Into<String>, kind: TechnologyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style setter. `key` may be nested (`pump_specs.efficiency`).
    pub fn with(mut self, key: &str, value: f64) -> Self {
        match key.split_once('.') {
            Some((table, inner)) => {
                let entry = self
                    .params
                    .entry(table.to_string())
                    .or_insert_with(|| SpecValue::Table(BTreeMap::new()));
                if let SpecValue::Table(map) = entry {
                    map.insert(inner.to_string(), value);
                } else {
                    *entry = SpecValue::Table(BTreeMap::from([(inner.to_string(), value)]));
                }
            }
            None => {
                self.params.insert(key.to_string(), SpecValue::Number(value));
            }
        }
        self
    }

    /// Drops a key, for exercising missing-key paths.
    pub fn without(mut self, key: &str) -> Self {
        match key.split_once('.') {
            Some((table, inner)) => {
                if let Some(SpecValue::Table(map)) = self.params.get_mut(table) {
                    map.remove(inner);
                }
            }
            None => {
                self.params.remove(key);
            }
        }
        self
    }

    fn missing(&self, key: &str) -> ParameterError {
        ParameterError::MissingKey {
            technology: self.name.clone(),
            key: key.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Result<f64, ParameterError> {
        if !self.kind.accepts(key) {
            return Err(ParameterError::UnknownKey {
                technology: self.name.clone(),
                kind: self.kind.to_string(),
                key: key.to_string(),
            });
        }
        let value = match key.split_once('.') {
            Some((table, inner)) => match self.params.get(table) {
                Some(SpecValue::Table(map)) => map.get(inner).copied(),
                _ => None,
            },
            None => match self.params.get(key) {
                Some(SpecValue::Number(v)) => Some(*v),
                _ => None,
            },
        };
        value.ok_or_else(|| self.missing(key))
    }

    /// Every key present is known to the family, and every required key is present.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (key, value) in &self.params {
            let unknown = |k: String| ParameterError::UnknownKey {
                technology: self.name.clone(),
                kind: self.kind.to_string(),
                key: k,
            };
            match value {
                SpecValue::Number(_) if !self.kind.accepts(key) => {
                    return Err(unknown(key.clone()))
                }
                SpecValue::Table(map) => {
                    for inner in map.keys() {
                        let full = format!("{key}.{inner}");
                        if !self.kind.accepts(&full) {
                            return Err(unknown(full));
                        }
                    }
                }
                SpecValue::Number(_) => {}
            }
        }
        for key in self.kind.required_keys() {
            self.get(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well() -> TechnologySpec {
        TechnologySpec::new("well", TechnologyKind::GroundwaterWell)
            .with("pump_specs.efficiency", 0.75)
            .with("pump_specs.power_rating", 30.0)
            .with("well_specs.depth", 100.0)
            .with("well_specs.max_extraction", 50.0)
            .with("capex", 80_000.0)
    }

    #[test]
    fn nested_lookup() {
        let spec = well();
        assert_eq!(spec.get("pump_specs.efficiency").unwrap(), 0.75);
        assert_eq!(spec.get("well_specs.depth").unwrap(), 100.0);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn missing_key_is_named() {
        let spec = well().without("pump_specs.power_rating");
        assert_eq!(
            spec.validate().unwrap_err(),
            ParameterError::MissingKey {
                technology: "well".into(),
                key: "pump_specs.power_rating".into()
            }
        );
    }

    #[test]
    fn legacy_key_name_is_rejected_even_when_present() {
        let spec = well().with("pump_efficiency", 0.8);
        assert!(matches!(
            spec.validate(),
            Err(ParameterError::UnknownKey { key, .. }) if key == "pump_efficiency"
        ));
        assert!(matches!(
            spec.get("pump_efficiency"),
            Err(ParameterError::UnknownKey { .. })
        ));
    }

    #[test]
    fn deserializes_nested_tables_from_toml() {
        let spec: TechnologySpec = toml::from_str(
            r#"
            name = "well"
            kind = "groundwater_well"
            [params]
            capex = 80000.0
            pump_specs = { efficiency = 0.75, power_rating = 30.0 }
            well_specs = { depth = 100.0, max_extraction = 50.0 }
            "#,
        )
        .unwrap();
        assert_eq!(spec, well());
    }
}

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::TechnologySpec;
use crate::error::ParameterError;

const REFERENCE_CATALOG: &str = include_str!("../../data/saravan_technologies.toml");

/// The set of technology specs one network is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyCatalog {
    #[serde(rename = "technology", default)]
    technologies: Vec<TechnologySpec>,
}

impl TechnologyCatalog {
    pub fn new(technologies: Vec<TechnologySpec>) -> Self {
        Self { technologies }
    }

    /// The Saravan wind-water-biogas reference installation.
    pub fn reference() -> Result<Self, toml::de::Error> {
        toml::from_str(REFERENCE_CATALOG)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading technology specs from {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("parsing technology specs in {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Result<&TechnologySpec, ParameterError> {
        self.technologies
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ParameterError::MissingTechnology(name.to_string()))
    }

    /// Replaces (or adds) the spec with the same name.
    pub fn upsert(&mut self, spec: TechnologySpec) {
        match self.technologies.iter_mut().find(|t| t.name == spec.name) {
            Some(slot) => *slot = spec,
            None => self.technologies.push(spec),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TechnologySpec> {
        self.technologies.iter()
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        self.technologies.iter().try_for_each(TechnologySpec::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technology::TechnologyKind;

    #[test]
    fn reference_catalog_is_complete() {
        let catalog = TechnologyCatalog::reference().unwrap();
        catalog.validate().unwrap();
        assert_eq!(
            catalog.get("microturbine").unwrap().kind,
            TechnologyKind::GasMicroturbine
        );
        assert_eq!(
            catalog
                .get("well")
                .unwrap()
                .get("pump_specs.efficiency")
                .unwrap(),
            0.75
        );
    }

    #[test]
    fn unknown_technology() {
        let catalog = TechnologyCatalog::reference().unwrap();
        assert_eq!(
            catalog.get("fuel_cell").unwrap_err(),
            ParameterError::MissingTechnology("fuel_cell".into())
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::Commodity;

/// Penalized escape flows for a bus balance. `shortage` injects the
/// commodity (unserved demand), `surplus` removes it (spill, discharge, vent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlackPolicy {
    pub shortage_penalty: Option<f64>,
    pub surplus_penalty: Option<f64>,
}

impl SlackPolicy {
    pub fn both(shortage_penalty: f64, surplus_penalty: f64) -> Self {
        Self {
            shortage_penalty: Some(shortage_penalty),
            surplus_penalty: Some(surplus_penalty),
        }
    }

    pub fn shortage(penalty: f64) -> Self {
        Self {
            shortage_penalty: Some(penalty),
            surplus_penalty: None,
        }
    }

    pub fn surplus(penalty: f64) -> Self {
        Self {
            shortage_penalty: None,
            surplus_penalty: Some(penalty),
        }
    }

    pub(crate) fn penalties(&self) -> impl Iterator<Item = f64> {
        self.shortage_penalty.into_iter().chain(self.surplus_penalty)
    }
}

/// A commodity pool balanced at every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,
    pub commodity: Commodity,
    pub slack: Option<SlackPolicy>,
}

impl Bus {
    pub fn new(name: impl Into<String>, commodity: Commodity) -> Self {
        Self {
            name: name.into(),
            commodity,
            slack: None,
        }
    }

    pub fn with_slack(&mut self, slack: SlackPolicy) -> &mut Self {
        self.slack = Some(slack);
        self
    }
}

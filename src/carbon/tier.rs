use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::config::{TierTable, TierTerms};
use crate::error::UnknownTierError;

/// Carbon credit market tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CarbonTier {
    /// Voluntary carbon credits
    Vcc,
    /// Compliance carbon credits
    Ccc,
    /// Premium green credits, eligible for the social co-benefit multiplier
    Pgc,
}

impl CarbonTier {
    /// Parses a tier name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Result<Self, UnknownTierError> {
        name.trim()
            .parse()
            .map_err(|_| UnknownTierError(name.to_string()))
    }

    pub fn terms(self, table: &TierTable) -> &TierTerms {
        match self {
            CarbonTier::Vcc => &table.vcc,
            CarbonTier::Ccc => &table.ccc,
            CarbonTier::Pgc => &table.pgc,
        }
    }

    pub fn has_social_cobenefit(self) -> bool {
        self == CarbonTier::Pgc
    }
}

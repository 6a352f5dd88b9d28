use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Physical commodity carried by a bus.
///
/// Flows are expressed per hour; the unit is fixed per commodity so that
/// converter coefficients stay dimensionally consistent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Commodity {
    Electricity,
    Heat,
    NaturalGas,
    Biogas,
    RawWater,
    TreatedWater,
    Digestate,
    Co2,
    #[strum(serialize = "co2_captured")]
    #[serde(rename = "co2_captured")]
    CapturedCo2,
    Wastewater,
}

impl Commodity {
    /// Flow unit of this commodity.
    pub fn unit(&self) -> &'static str {
        match self {
            Commodity::Electricity => "kW",
            Commodity::Heat => "kWth",
            Commodity::NaturalGas | Commodity::Biogas => "m3/h",
            Commodity::RawWater | Commodity::TreatedWater | Commodity::Wastewater => "m3/h",
            Commodity::Digestate => "t/h",
            Commodity::Co2 | Commodity::CapturedCo2 => "kg/h",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_round_trip_through_strum() {
        for commodity in Commodity::iter() {
            let parsed = Commodity::from_str(&commodity.to_string()).unwrap();
            assert_eq!(parsed, commodity);
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(Commodity::from_str("Treated_Water").unwrap(), Commodity::TreatedWater);
        assert_eq!(Commodity::from_str("CO2_CAPTURED").unwrap(), Commodity::CapturedCo2);
        assert!(Commodity::from_str("steam").is_err());
    }

    #[test]
    fn units() {
        assert_eq!(Commodity::Electricity.unit(), "kW");
        assert_eq!(Commodity::Digestate.unit(), "t/h");
        assert_eq!(Commodity::Co2.unit(), "kg/h");
    }
}

/// Capital recovery factor `r(1+r)^n / ((1+r)^n − 1)`; `1/n` at a zero rate.
pub fn capital_recovery_factor(discount_rate: f64, lifetime_years: u32) -> f64 {
    let n = f64::from(lifetime_years);
    if discount_rate == 0.0 {
        return 1.0 / n;
    }
    let growth = (1.0 + discount_rate).powf(n);
    discount_rate * growth / (growth - 1.0)
}

/// Equivalent annual cost of an up-front investment.
pub fn annualize(capex: f64, discount_rate: f64, lifetime_years: u32) -> f64 {
    capex * capital_recovery_factor(discount_rate, lifetime_years)
}

/// Discounted value of a constant end-of-year amount over the lifetime.
pub fn present_value(annual: f64, discount_rate: f64, lifetime_years: u32) -> f64 {
    annual / capital_recovery_factor(discount_rate, lifetime_years)
}

/// Levelized cost: discounted costs over discounted output.
///
/// `None` when nothing is produced.
pub fn levelized_cost(
    capex: f64,
    annual_opex: f64,
    annual_output: f64,
    discount_rate: f64,
    lifetime_years: u32,
) -> Option<f64> {
    let output = present_value(annual_output, discount_rate, lifetime_years);
    if output <= 0.0 {
        return None;
    }
    let costs = capex + present_value(annual_opex, discount_rate, lifetime_years);
    Some(costs / output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn discounted_sum(annual: f64, rate: f64, years: u32) -> f64 {
        (1..=years).map(|y| annual / (1.0 + rate).powi(y as i32)).sum()
    }

    #[rstest]
    #[case(0.08, 20, 0.101_852)]
    #[case(0.08, 15, 0.116_830)]
    #[case(0.05, 25, 0.070_952)]
    fn recovery_factor_matches_annuity_tables(
        #[case] rate: f64,
        #[case] years: u32,
        #[case] expected: f64,
    ) {
        assert!((capital_recovery_factor(rate, years) - expected).abs() < 1e-6);
    }

    #[test]
    fn zero_rate_is_straight_line() {
        assert_eq!(annualize(650_000.0, 0.0, 20), 32_500.0);
        assert_eq!(present_value(1_000.0, 0.0, 10), 10_000.0);
    }

    #[test]
    fn nothing_produced_has_no_levelized_cost() {
        assert_eq!(levelized_cost(1_000.0, 10.0, 0.0, 0.08, 20), None);
    }

    #[test]
    fn wind_turbine_levelized_cost() {
        // 650 kUSD, 1.2 GWh a year, 20 years at 8%
        let lcoe = levelized_cost(650_000.0, 0.0, 1_200_000.0, 0.08, 20).unwrap();
        assert!((lcoe - 650_000.0 * 0.101_852_2 / 1_200_000.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn closed_form_matches_discounted_sums(
            capex in 0.0f64..1e7,
            opex in 0.0f64..1e5,
            output in 1.0f64..1e7,
            rate in 0.001f64..0.3,
            years in 1u32..40,
        ) {
            let lcoe = levelized_cost(capex, opex, output, rate, years).unwrap();
            let expected = (capex + discounted_sum(opex, rate, years))
                / discounted_sum(output, rate, years);
            prop_assert!((lcoe - expected).abs() <= 1e-8 * expected.max(1.0));
        }
    }
}

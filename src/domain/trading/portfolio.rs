use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Two-asset holdings for a single backtest run.
///
/// One live instance exists per simulation run; the simulator owns it and
/// mutates it as trades execute. Amounts never go negative: trades that
/// would overdraw a side are rejected whole, not clipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub amount_a: Decimal,
    pub amount_b: Decimal,
}

impl Portfolio {
    pub fn new(amount_a: Decimal, amount_b: Decimal) -> Self {
        Self { amount_a, amount_b }
    }

    /// Build a portfolio worth `total_value` (in units of B) split so that
    /// `fraction_a` of the value is held in A at the given ratio.
    pub fn from_split(total_value: Decimal, fraction_a: f64, ratio: f64) -> Self {
        let fraction = Decimal::from_f64_retain(fraction_a.clamp(0.0, 1.0))
            .unwrap_or(Decimal::ZERO);
        let ratio_dec = Decimal::from_f64_retain(ratio).unwrap_or(Decimal::ONE);

        let value_a = total_value * fraction;
        let amount_a = value_a.checked_div(ratio_dec).unwrap_or(Decimal::ZERO);
        let amount_b = total_value - value_a;

        Self { amount_a, amount_b }
    }

    /// 50/50-by-value split at the given ratio, the default starting point
    /// for simulations.
    pub fn balanced(total_value: Decimal, ratio: f64) -> Self {
        Self::from_split(total_value, 0.5, ratio)
    }

    /// Total value in units of B at the given ratio.
    pub fn value(&self, ratio: Decimal) -> Decimal {
        self.amount_a * ratio + self.amount_b
    }

    /// Fraction of total value held in asset A, in [0, 1]. Zero when the
    /// portfolio is worthless.
    pub fn allocation_a(&self, ratio: Decimal) -> f64 {
        let total = self.value(ratio);
        if total.is_zero() {
            return 0.0;
        }

        (self.amount_a * ratio)
            .checked_div(total)
            .and_then(|f| f.to_f64())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balanced_split_uses_first_ratio() {
        // 10000 B total at ratio 2.0 -> 2500 A (worth 5000 B) + 5000 B
        let portfolio = Portfolio::balanced(dec!(10000), 2.0);

        assert_eq!(portfolio.amount_a, dec!(2500));
        assert_eq!(portfolio.amount_b, dec!(5000));
        assert_eq!(portfolio.value(dec!(2.0)), dec!(10000));
    }

    #[test]
    fn test_allocation_tracks_ratio_moves() {
        let portfolio = Portfolio::balanced(dec!(10000), 1.0);
        assert!((portfolio.allocation_a(dec!(1.0)) - 0.5).abs() < 1e-12);

        // A doubles: allocation of A grows to 2/3
        let alloc = portfolio.allocation_a(dec!(2.0));
        assert!((alloc - 2.0 / 3.0).abs() < 1e-9, "allocation was {}", alloc);
    }

    #[test]
    fn test_allocation_of_empty_portfolio_is_zero() {
        let portfolio = Portfolio::new(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(portfolio.allocation_a(dec!(1.5)), 0.0);
    }

    #[test]
    fn test_one_sided_split() {
        let portfolio = Portfolio::from_split(dec!(1000), 1.0, 4.0);
        assert_eq!(portfolio.amount_a, dec!(250));
        assert_eq!(portfolio.amount_b, dec!(0));
    }
}

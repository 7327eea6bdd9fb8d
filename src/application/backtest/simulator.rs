use crate::application::strategies::DecisionEngine;
use crate::domain::errors::BacktestError;
use crate::domain::market::PriceSeries;
use crate::domain::performance::report::PerformanceReport;
use crate::domain::trading::parameters::ParameterSet;
use crate::domain::trading::portfolio::Portfolio;
use crate::domain::trading::types::{DailySnapshot, TradeAction, TradeRecord};
use rust_decimal::Decimal;
use serde::Serialize;

/// Minimum number of tradeable steps beyond the lookback window. A shorter
/// series fails fast instead of producing a degraded partial run.
pub const MIN_SAMPLES: usize = 5;

/// Everything a completed run produces.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub final_portfolio: Portfolio,
    pub trades: Vec<TradeRecord>,
    pub daily_history: Vec<DailySnapshot>,
    pub report: PerformanceReport,
}

/// Deterministic replay of a price-ratio series under fixed parameters.
///
/// The simulator owns no state between runs: the caller passes a fresh
/// Portfolio per run and gets it back mutated inside the result. Identical
/// inputs produce bit-identical output; there is no clock and no randomness
/// anywhere in the replay.
pub struct BacktestSimulator {
    params: ParameterSet,
}

impl BacktestSimulator {
    pub fn new(params: ParameterSet) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn run(
        &self,
        series: &PriceSeries,
        initial_portfolio: Portfolio,
    ) -> Result<BacktestResult, BacktestError> {
        let required = self.params.lookback_window + MIN_SAMPLES;
        if series.len() < required {
            return Err(BacktestError::InsufficientData {
                required,
                actual: series.len(),
            });
        }

        let ratios = series.ratios();
        let observations = series.observations();

        let rebalance_fraction = Decimal::from_f64_retain(self.params.rebalance_fraction)
            .unwrap_or(Decimal::ZERO);
        let cost_rate = Decimal::from_f64_retain(self.params.transaction_cost_rate)
            .unwrap_or(Decimal::ZERO);

        let mut portfolio = initial_portfolio;
        let initial_amount_a = portfolio.amount_a;
        let initial_amount_b = portfolio.amount_b;
        let initial_value = portfolio.value(to_decimal(ratios[0]));

        let mut trades: Vec<TradeRecord> = Vec::new();
        let mut daily_history: Vec<DailySnapshot> = Vec::with_capacity(ratios.len());
        let mut equity_curve: Vec<Decimal> = Vec::with_capacity(ratios.len());

        for i in self.params.lookback_window..ratios.len() {
            let ratio = ratios[i];
            let ratio_dec = to_decimal(ratio);
            let timestamp = observations[i].timestamp;

            let allocation = portfolio.allocation_a(ratio_dec);
            let decision =
                DecisionEngine::decide(ratio, &ratios[..i], allocation, &self.params);

            let mut executed = false;
            if let Some(action) = decision.signal
                && !decision.insufficient_balance
                && let Some(record) = apply_trade(
                    &mut portfolio,
                    action,
                    ratio_dec,
                    rebalance_fraction,
                    cost_rate,
                    timestamp,
                    decision.z_score,
                )
            {
                trades.push(record);
                executed = true;
            }

            let value = portfolio.value(ratio_dec);
            equity_curve.push(value);
            daily_history.push(DailySnapshot {
                timestamp,
                value,
                allocation_a: portfolio.allocation_a(ratio_dec),
                z_score: decision.z_score,
                signal: decision.signal,
                executed,
            });
        }

        // Benchmark: hold the initial amounts untouched over the same window
        let last_ratio = to_decimal(ratios[ratios.len() - 1]);
        let benchmark_final = initial_amount_a * last_ratio + initial_amount_b;

        let report =
            PerformanceReport::from_run(initial_value, &equity_curve, benchmark_final, &trades);

        Ok(BacktestResult {
            final_portfolio: portfolio,
            trades,
            daily_history,
            report,
        })
    }
}

/// Replay `series` under `params` starting from `initial_portfolio`.
pub fn run_backtest(
    series: &PriceSeries,
    params: &ParameterSet,
    initial_portfolio: Portfolio,
) -> Result<BacktestResult, BacktestError> {
    BacktestSimulator::new(params.clone())?.run(series, initial_portfolio)
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

/// Apply one rebalancing trade atomically.
///
/// The trade moves `rebalance_fraction` of the asset being sold; the fee
/// comes out of the proceeds before the counter-asset is credited. Returns
/// `None` without touching the portfolio when the required balance is not
/// there, which the caller records as a downgraded hold.
fn apply_trade(
    portfolio: &mut Portfolio,
    action: TradeAction,
    ratio: Decimal,
    rebalance_fraction: Decimal,
    cost_rate: Decimal,
    timestamp: i64,
    z_score: f64,
) -> Option<TradeRecord> {
    let value_before = portfolio.value(ratio);

    match action {
        TradeAction::ReduceA => {
            let qty_a = portfolio.amount_a * rebalance_fraction;
            if qty_a <= Decimal::ZERO || qty_a > portfolio.amount_a {
                return None;
            }

            let gross_b = qty_a * ratio;
            let fee = gross_b * cost_rate;
            let net_b = gross_b - fee;

            portfolio.amount_a -= qty_a;
            portfolio.amount_b += net_b;

            Some(TradeRecord {
                timestamp,
                action,
                amount_a: qty_a,
                amount_b: net_b,
                fees_paid: fee,
                z_score,
                value_before,
                value_after: portfolio.value(ratio),
            })
        }
        TradeAction::IncreaseA => {
            let qty_b = portfolio.amount_b * rebalance_fraction;
            if qty_b <= Decimal::ZERO || qty_b > portfolio.amount_b {
                return None;
            }

            let fee = qty_b * cost_rate;
            let net_b = qty_b - fee;
            let qty_a = net_b.checked_div(ratio)?;

            portfolio.amount_b -= qty_b;
            portfolio.amount_a += qty_a;

            Some(TradeRecord {
                timestamp,
                action,
                amount_a: qty_a,
                amount_b: qty_b,
                fees_paid: fee,
                z_score,
                value_before,
                value_after: portfolio.value(ratio),
            })
        }
    }
}

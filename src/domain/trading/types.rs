use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a rebalancing trade.
///
/// `ReduceA` sells asset A for B (A is overvalued versus its trailing mean),
/// `IncreaseA` sells asset B for A (A is undervalued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    ReduceA,
    IncreaseA,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::ReduceA => write!(f, "REDUCE_A"),
            TradeAction::IncreaseA => write!(f, "INCREASE_A"),
        }
    }
}

/// One executed rebalancing trade. Append-only log entry per run.
///
/// `amount_a` and `amount_b` are the quantities moved on each side of the
/// trade; `fees_paid` is denominated in units of B and already deducted from
/// the credited proceeds. `value_before`/`value_after` are portfolio values
/// at the execution ratio, so `value_after` trails `value_before` by exactly
/// the fee.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub timestamp: i64,
    pub action: TradeAction,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
    pub fees_paid: Decimal,
    pub z_score: f64,
    pub value_before: Decimal,
    pub value_after: Decimal,
}

/// Per-step snapshot appended to the daily history of a run.
///
/// `signal` records what the decision engine wanted to do; `executed` is
/// false when the signal was downgraded to a hold (insufficient balance).
#[derive(Debug, Clone, Serialize)]
pub struct DailySnapshot {
    pub timestamp: i64,
    pub value: Decimal,
    pub allocation_a: f64,
    pub z_score: f64,
    pub signal: Option<TradeAction>,
    pub executed: bool,
}

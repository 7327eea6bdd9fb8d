use thiserror::Error;

/// Errors that abort a backtest or optimization run before any simulation
/// step executes. Per-step anomalies (an unaffordable trade, a flat window)
/// are absorbed locally and never surface through this type.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid price series: {reason}")]
    InvalidSeries { reason: String },

    #[error("invalid search space for {name}: {reason}")]
    InvalidSearchSpace {
        name: &'static str,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_formatting() {
        let err = BacktestError::InsufficientData {
            required: 25,
            actual: 10,
        };

        let msg = err.to_string();
        assert!(msg.contains("25"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_invalid_parameter_formatting() {
        let err = BacktestError::InvalidParameter {
            name: "z_score_threshold",
            value: -1.0,
            reason: "must be positive",
        };

        let msg = err.to_string();
        assert!(msg.contains("z_score_threshold"));
        assert!(msg.contains("must be positive"));
    }
}

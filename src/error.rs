use thiserror::Error;

use crate::core::beta::BetaError;

/// A market field that is present but carries a value no collector should
/// produce. Missing or wrongly-typed fields are not errors; they fall back to
/// the indicator's default.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("{symbol}: field `{field}` has impossible value {value}")]
    ImpossibleValue {
        symbol: String,
        field: &'static str,
        value: f64,
    },
    #[error("{symbol}: price history contains non-positive price {price} at index {index}")]
    CorruptPriceHistory {
        symbol: String,
        index: usize,
        price: f64,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnhanceError {
    #[error("confidence {value} for {symbol} is outside [0, 1]")]
    InvalidConfidence { symbol: String, value: f64 },

    #[error("confidence {0} is not a finite number in [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("signal strength {0} is not a finite number in [0, 1]")]
    InvalidSignalStrength(f64),

    #[error("price {value} for {symbol} must be finite and positive")]
    InvalidPrice { symbol: String, value: f64 },

    #[error("entry price {0} must be finite and positive")]
    InvalidEntryPrice(f64),

    #[error("account equity {0} must be finite and non-negative")]
    InvalidEquity(f64),

    #[error("position value {value} at entry {entry} does not fit a share count")]
    InvalidQuantity { value: f64, entry: f64 },

    #[error("invalid strategy config: {0}")]
    InvalidConfig(String),

    #[error("exit plan for {symbol} failed validation: {reason}")]
    ExitValidation { symbol: String, reason: String },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Numeric(#[from] BetaError),
}

impl EnhanceError {
    /// Contract violations abort the whole batch; everything else only
    /// excludes the trade that produced it.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            EnhanceError::InvalidConfidence { .. }
                | EnhanceError::ConfidenceOutOfRange(_)
                | EnhanceError::InvalidSignalStrength(_)
                | EnhanceError::InvalidPrice { .. }
                | EnhanceError::InvalidEntryPrice(_)
                | EnhanceError::InvalidEquity(_)
                | EnhanceError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EnhanceError>;

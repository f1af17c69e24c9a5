use thiserror::Error;

/// Errors raised when converting exchange text into value objects
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Empty value")]
    Empty,
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Negative {0} not allowed")]
    Negative(&'static str),
    #[error("Invalid market identifier: {0}")]
    InvalidMarket(String),
    #[error("{0} exceeds decimal range")]
    Overflow(&'static str),
}

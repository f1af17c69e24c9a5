mod error;
mod market;
mod price;
mod quantity;
mod side;

pub use error::ValueError;
pub use market::Market;
pub use price::{Notional, Price};
pub use quantity::Quantity;
pub use side::{Side, TradeSide};

pub type Timestamp = chrono::DateTime<chrono::Utc>;

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse exchange decimal text, accepting plain ("0.003") and scientific ("1e-8") forms.
pub(crate) fn parse_decimal(s: &str) -> Result<Decimal, ValueError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValueError::Empty);
    }

    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(|d| d.normalize())
        .map_err(|_| ValueError::InvalidDecimal(s.to_string()))
}

use chrono::NaiveDateTime;
use depth_core::{
    DepthSnapshot, DiffBatch, DiffEvent, Notional, Price, Quantity, Side, TradePrint, TradeSide,
};
use serde_json::Value;
use tracing::debug;

use crate::domain::{FetchError, RecordParser};

const TRADE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default diff record parser that combines all available record parsers
///
/// Infrastructure component that owns and orchestrates the parsing logic,
/// keeping the domain layer free of concrete parser dependencies.
pub struct DiffRecordParser {
    parsers: Vec<Box<dyn RecordParser>>,
}

impl Default for DiffRecordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffRecordParser {
    /// Create a parser with the default set of parsers (Modify, Remove, Trade)
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(ModifyParser),
                Box::new(RemoveParser),
                Box::new(TradeParser),
            ],
        }
    }

    /// Create a parser with custom parsers
    pub fn with_parsers(parsers: Vec<Box<dyn RecordParser>>) -> Self {
        Self { parsers }
    }

    pub fn add_parser(&mut self, parser: Box<dyn RecordParser>) {
        self.parsers.push(parser);
    }

    /// Parse one `{"type": ..., "data": {...}}` record
    pub fn parse_record(&self, sequence: u64, record: &Value) -> Option<DiffEvent> {
        let kind = record.get("type")?.as_str()?;
        let data = record.get("data")?;

        let result = self
            .parsers
            .iter()
            .find(|p| p.can_parse(kind))
            .and_then(|p| p.parse(sequence, data));

        if result.is_none() {
            debug!(kind, sequence, "No parser produced an event for record");
        }
        result
    }

    /// Parse a published payload (an array of records) into a batch
    ///
    /// Records that fail to parse are skipped.
    pub fn parse_batch(&self, sequence: u64, payload: &Value) -> DiffBatch {
        let events = match payload {
            Value::Array(records) => records
                .iter()
                .filter_map(|r| self.parse_record(sequence, r))
                .collect(),
            record => self.parse_record(sequence, record).into_iter().collect(),
        };
        DiffBatch { sequence, events }
    }
}

/// Parser for `orderBookModify` records
pub struct ModifyParser;

impl RecordParser for ModifyParser {
    fn can_parse(&self, kind: &str) -> bool {
        kind == "orderBookModify"
    }

    fn parse(&self, sequence: u64, data: &Value) -> Option<DiffEvent> {
        let result = (|| {
            let side = parse_side(data.get("type")?)?;
            let (price, quantity) = parse_level(data.get("rate")?, data.get("amount")?)?;
            Some(DiffEvent::modify(sequence, side, price, quantity))
        })();

        if result.is_none() {
            debug!(data = %data, "ModifyParser: missing or invalid fields");
        }
        result
    }
}

/// Parser for `orderBookRemove` records
pub struct RemoveParser;

impl RecordParser for RemoveParser {
    fn can_parse(&self, kind: &str) -> bool {
        kind == "orderBookRemove"
    }

    fn parse(&self, sequence: u64, data: &Value) -> Option<DiffEvent> {
        let result = (|| {
            Some(DiffEvent::remove(
                sequence,
                parse_side(data.get("type")?)?,
                parse_price(data.get("rate")?)?,
            ))
        })();

        if result.is_none() {
            debug!(data = %data, "RemoveParser: missing or invalid fields");
        }
        result
    }
}

/// Parser for `newTrade` records
pub struct TradeParser;

impl RecordParser for TradeParser {
    fn can_parse(&self, kind: &str) -> bool {
        kind == "newTrade"
    }

    fn parse(&self, sequence: u64, data: &Value) -> Option<DiffEvent> {
        let result = (|| {
            let price = parse_price(data.get("rate")?)?;
            let quantity = parse_quantity(data.get("amount")?)?;
            let total = match data.get("total") {
                Some(v) => Notional::from_decimal(parse_price(v)?.inner()),
                None => price.checked_mul_qty(quantity)?,
            };

            Some(DiffEvent::trade(
                sequence,
                TradePrint {
                    trade_id: as_u64(data.get("tradeID")?)?,
                    side: TradeSide::try_from(data.get("type")?.as_str()?).ok()?,
                    price,
                    quantity,
                    total,
                    timestamp: data
                        .get("date")
                        .and_then(Value::as_str)
                        .and_then(|d| NaiveDateTime::parse_from_str(d, TRADE_DATE_FORMAT).ok())
                        .map(|d| d.and_utc()),
                },
            ))
        })();

        if result.is_none() {
            debug!(data = %data, "TradeParser: missing or invalid fields");
        }
        result
    }
}

/// Decode a `returnOrderBook` response body
pub fn parse_order_book(body: &Value) -> Result<DepthSnapshot, FetchError> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Err(FetchError::Api {
            code: 0,
            message: message.to_string(),
        });
    }

    let sequence = body
        .get("seq")
        .and_then(as_u64)
        .ok_or_else(|| FetchError::Parse("missing seq".to_string()))?;
    let asks = parse_levels(body.get("asks"), "asks")?;
    let bids = parse_levels(body.get("bids"), "bids")?;
    let is_frozen = body.get("isFrozen").map(parse_flag).unwrap_or(false);

    Ok(DepthSnapshot::new(sequence, asks, bids).frozen(is_frozen))
}

fn parse_levels(value: Option<&Value>, name: &str) -> Result<Vec<(Price, Quantity)>, FetchError> {
    let levels = value
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse(format!("missing {}", name)))?;

    levels
        .iter()
        .map(|level| {
            let pair = level.as_array().filter(|p| p.len() >= 2);
            pair.and_then(|p| parse_level(&p[0], &p[1]))
                .ok_or_else(|| FetchError::Parse(format!("invalid {} level: {}", name, level)))
        })
        .collect()
}

fn decimal_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_price(value: &Value) -> Option<Price> {
    Price::parse(&decimal_text(value)?).ok()
}

fn parse_quantity(value: &Value) -> Option<Quantity> {
    Quantity::parse(&decimal_text(value)?).ok()
}

/// A price level whose notional fits the decimal range
fn parse_level(price: &Value, quantity: &Value) -> Option<(Price, Quantity)> {
    let price = parse_price(price)?;
    let quantity = parse_quantity(quantity)?;
    price.checked_mul_qty(quantity)?;
    Some((price, quantity))
}

fn parse_side(value: &Value) -> Option<Side> {
    Side::try_from(value.as_str()?).ok()
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `isFrozen` arrives as "0"/"1", a number or a bool
fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        Value::String(s) => s.trim() != "0" && !s.trim().is_empty(),
        _ => false,
    }
}

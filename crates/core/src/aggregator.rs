//! Position aggregation into the per-underlying view.
//!
//! Two sources feed the same output shape:
//!
//! - **Mock** documents already group trades per underlying. Each record
//!   becomes one [`Underlying`], in file order.
//! - **Live** brokerage positions are grouped with an [`UnderlyingResolver`].
//!   Groups appear in first-seen order and legs keep their input order.
//!
//! Totals are summed from the legs on every call.

use crate::error::{CoreError, Result};
use crate::position::{Leg, Underlying};
use crate::traits::{PositionRecord, UnderlyingResolver};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Upper bound (exclusive) of the placeholder percentage on mock data.
pub const MOCK_PCT_CEILING: f64 = 5.0;

/// Reads and parses a mock positions file.
///
/// # Errors
/// Returns `CoreError::MockData` if the file cannot be read or is not JSON.
pub fn load_mock_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| CoreError::mock_data(path.display().to_string(), e.to_string()))?;

    serde_json::from_str(&text)
        .map_err(|e| CoreError::mock_data(path.display().to_string(), format!("invalid JSON: {e}")))
}

/// Aggregates a mock positions document.
///
/// `total_pnl_pct` is a random placeholder in `[0, 5)`: the mock file has no
/// margin data, so the value is for display only.
///
/// # Errors
/// Returns `CoreError::MockData` naming the first missing or mistyped field.
pub fn aggregate_mock(doc: &Value) -> Result<Vec<Underlying>> {
    aggregate_mock_with_rng(doc, &mut rand::thread_rng())
}

/// Same as [`aggregate_mock`] with a caller-supplied RNG for the placeholder
/// percentage.
///
/// # Errors
/// Returns `CoreError::MockData` naming the first missing or mistyped field.
pub fn aggregate_mock_with_rng<R: Rng + ?Sized>(doc: &Value, rng: &mut R) -> Result<Vec<Underlying>> {
    let records = doc
        .pointer("/payload/data")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::missing_field("payload.data"))?;

    let mut underlyings = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let at = format!("payload.data[{i}]");
        let name = str_field(record, "trading_symbol", &at)?;
        let trades = record
            .get("trades")
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::missing_field(format!("{at}.trades")))?;

        let mut underlying = Underlying::new(name);
        for (j, trade) in trades.iter().enumerate() {
            underlying.push_leg(mock_leg(trade, &format!("{at}.trades[{j}]"))?);
        }

        let pct = rng.gen_range(0.0..MOCK_PCT_CEILING);
        underlying.total_pnl_pct = Decimal::from_f64(pct).unwrap_or_default().round_dp(2);

        underlyings.push(underlying);
    }

    tracing::debug!(underlyings = underlyings.len(), "aggregated mock positions");
    Ok(underlyings)
}

fn mock_leg(trade: &Value, at: &str) -> Result<Leg> {
    let name = str_field(trade, "trading_symbol", at)?;
    let quantity = trade
        .get("quantity")
        .and_then(|q| q.as_i64().or_else(|| q.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| CoreError::missing_field(format!("{at}.quantity")))?;
    let unbooked = decimal_field(trade, "unbooked_pnl", at)?;
    let booked = decimal_field(trade, "booked_profit_loss", at)?;
    let delta = trade
        .pointer("/greeks/delta")
        .and_then(to_decimal)
        .unwrap_or_default();

    Ok(Leg {
        name: name.to_string(),
        quantity,
        pnl: unbooked + booked,
        delta,
    })
}

fn str_field<'a>(value: &'a Value, key: &str, at: &str) -> Result<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::missing_field(format!("{at}.{key}")))
}

fn decimal_field(value: &Value, key: &str, at: &str) -> Result<Decimal> {
    value
        .get(key)
        .and_then(to_decimal)
        .ok_or_else(|| CoreError::missing_field(format!("{at}.{key}")))
}

/// Converts a JSON number (or numeric string) without going through `f64`
/// when the literal is representable exactly.
fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| Decimal::from_str(&n.to_string()).ok())
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Groups live brokerage positions into underlyings.
///
/// `total_pnl_pct` is always zero: positions carry no margin data.
pub fn aggregate_live<P, R>(positions: &[P], resolver: &R) -> Vec<Underlying>
where
    P: PositionRecord,
    R: UnderlyingResolver + ?Sized,
{
    let mut underlyings: Vec<Underlying> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for position in positions {
        let root = resolver.resolve(position.symbol());
        let slot = *index.entry(root.clone()).or_insert_with(|| {
            underlyings.push(Underlying::new(root));
            underlyings.len() - 1
        });

        underlyings[slot].push_leg(Leg {
            name: position.symbol().to_string(),
            quantity: position.quantity(),
            pnl: position.pnl(),
            delta: Decimal::ZERO,
        });
    }

    tracing::debug!(
        positions = positions.len(),
        underlyings = underlyings.len(),
        "aggregated live positions"
    );
    underlyings
}

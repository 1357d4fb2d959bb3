//! Data models for the Kite Connect integration.
//!
//! Monetary values use `rust_decimal::Decimal`. Quantities are signed for
//! positions (negative is short) and unsigned for orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use squareoff_core::PositionRecord;

// =============================================================================
// Position Types
// =============================================================================

/// One position row from `GET /portfolio/positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Exchange trading symbol (e.g., "NIFTY24DEC24000CE").
    pub tradingsymbol: String,

    /// Exchange segment (e.g., "NFO").
    #[serde(default)]
    pub exchange: String,

    /// Margin product (e.g., "NRML", "MIS").
    #[serde(default)]
    pub product: String,

    /// Net open quantity; negative for shorts.
    #[serde(default)]
    pub quantity: i64,

    /// Average entry price.
    #[serde(default)]
    pub average_price: Decimal,

    /// Last traded price.
    #[serde(default)]
    pub last_price: Option<Decimal>,

    /// Net profit and loss.
    #[serde(default)]
    pub pnl: Decimal,
}

impl Position {
    /// Returns true if the position still has open quantity.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.quantity != 0
    }
}

impl PositionRecord for Position {
    fn symbol(&self) -> &str {
        &self.tradingsymbol
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn pnl(&self) -> Decimal {
        self.pnl
    }
}

/// The `net` and `day` position sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionBook {
    /// Positions carried across sessions plus today's activity.
    #[serde(default)]
    pub net: Vec<Position>,

    /// Today's activity only.
    #[serde(default)]
    pub day: Vec<Position>,
}

// =============================================================================
// Order Types
// =============================================================================

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    /// Returns the direction that closes a position of the given quantity,
    /// or `None` for a flat position.
    #[must_use]
    pub fn offsetting(quantity: i64) -> Option<Self> {
        match quantity {
            q if q > 0 => Some(Self::Sell),
            q if q < 0 => Some(Self::Buy),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
}

/// Order validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Validity {
    /// Valid until the end of the trading day.
    Day,
}

/// Form body for `POST /orders/regular`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub tradingsymbol: String,
    pub exchange: String,
    pub transaction_type: TransactionType,
    pub order_type: OrderType,
    pub quantity: u64,
    pub product: String,
    pub validity: Validity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl OrderRequest {
    /// Creates a DAY market order.
    pub fn market(
        tradingsymbol: impl Into<String>,
        exchange: impl Into<String>,
        product: impl Into<String>,
        transaction_type: TransactionType,
        quantity: u64,
    ) -> Self {
        Self {
            tradingsymbol: tradingsymbol.into(),
            exchange: exchange.into(),
            transaction_type,
            order_type: OrderType::Market,
            quantity,
            product: product.into(),
            validity: Validity::Day,
            tag: None,
        }
    }

    /// Attaches an order tag (Kite allows up to 20 characters).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag: String = tag.into();
        self.tag = Some(tag.chars().take(20).collect());
        self
    }
}

/// `data` of a successful order placement.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPlaced {
    pub order_id: String,
}

// =============================================================================
// Account Types
// =============================================================================

/// `data` of `GET /user/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One row of the instrument dump (`GET /instruments/{exchange}`).
///
/// Only the columns used for underlying resolution are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Instrument {
    pub tradingsymbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instrument_type: String,
    #[serde(default)]
    pub segment: String,
    #[serde(default)]
    pub exchange: String,
}

//! Square-off execution for one underlying.
//!
//! Fetches the live position book, keeps the open legs whose trading symbol
//! starts with the underlying, and places one offsetting DAY market order per
//! leg. Orders go out one at a time; a failed leg is recorded and the rest
//! still run. Nothing is retried or rolled back.
//!
//! # Example
//!
//! ```ignore
//! use squareoff_kite::{ExitExecutor, KiteClient};
//!
//! let executor = ExitExecutor::new(client);
//! let report = executor.exit_underlying("NIFTY").await?;
//! println!("{}", report.message());
//! ```

use crate::client::KiteClient;
use crate::error::{KiteError, Result};
use crate::types::{OrderRequest, Position, PositionBook, TransactionType};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

/// Tag attached to every square-off order.
pub const EXIT_ORDER_TAG: &str = "squareoff";

// =============================================================================
// Brokerage Seam
// =============================================================================

/// The two brokerage calls a square-off needs.
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Fetches the `net` and `day` position sets.
    async fn positions(&self) -> Result<PositionBook>;

    /// Places an order and returns its order ID.
    async fn place_order(&self, order: &OrderRequest) -> Result<String>;
}

#[async_trait]
impl Brokerage for KiteClient {
    async fn positions(&self) -> Result<PositionBook> {
        self.get_positions().await
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<String> {
        KiteClient::place_order(self, order).await
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Flattens the book into one entry per trading symbol.
///
/// `net` is scanned before `day`; the first occurrence of a symbol wins.
#[must_use]
pub fn dedup_positions(book: PositionBook) -> Vec<Position> {
    let mut seen = HashSet::new();
    book.net
        .into_iter()
        .chain(book.day)
        .filter(|p| seen.insert(p.tradingsymbol.clone()))
        .collect()
}

/// Keeps open positions whose symbol starts with `underlying`.
#[must_use]
pub fn filter_open_legs(positions: Vec<Position>, underlying: &str) -> Vec<Position> {
    positions
        .into_iter()
        .filter(|p| p.is_open() && p.tradingsymbol.starts_with(underlying))
        .collect()
}

/// An order that closes one open leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitOrder {
    pub tradingsymbol: String,
    pub exchange: String,
    pub product: String,
    pub transaction_type: TransactionType,
    pub quantity: u64,
}

impl ExitOrder {
    /// Builds the offsetting order, or `None` for a flat position.
    #[must_use]
    pub fn offsetting(position: &Position) -> Option<Self> {
        let transaction_type = TransactionType::offsetting(position.quantity)?;
        Some(Self {
            tradingsymbol: position.tradingsymbol.clone(),
            exchange: position.exchange.clone(),
            product: position.product.clone(),
            transaction_type,
            quantity: position.quantity.unsigned_abs(),
        })
    }

    /// Converts to the DAY market order sent to the brokerage.
    #[must_use]
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest::market(
            &self.tradingsymbol,
            &self.exchange,
            &self.product,
            self.transaction_type,
            self.quantity,
        )
        .with_tag(EXIT_ORDER_TAG)
    }
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of one leg's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LegStatus {
    Placed {
        #[serde(rename = "orderId")]
        order_id: String,
    },
    Failed {
        error: String,
    },
}

/// One leg of a square-off and what happened to its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegOutcome {
    pub symbol: String,
    pub transaction_type: TransactionType,
    pub quantity: u64,
    #[serde(flatten)]
    pub status: LegStatus,
}

impl LegOutcome {
    #[must_use]
    pub fn is_placed(&self) -> bool {
        matches!(self.status, LegStatus::Placed { .. })
    }
}

/// Result of squaring off one underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReport {
    pub underlying: String,
    pub results: Vec<LegOutcome>,
}

impl ExitReport {
    /// Order IDs of the legs that were placed, in submission order.
    #[must_use]
    pub fn exited(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| match &r.status {
                LegStatus::Placed { order_id } => Some(order_id.clone()),
                LegStatus::Failed { .. } => None,
            })
            .collect()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_placed()).count()
    }

    /// Human-readable summary.
    #[must_use]
    pub fn message(&self) -> String {
        let placed = self.results.len() - self.failed_count();
        if self.results.is_empty() {
            format!("No open positions for {}", self.underlying)
        } else if placed == self.results.len() {
            format!("Exited {placed} positions for {}", self.underlying)
        } else {
            format!(
                "Exited {placed} of {} positions for {}",
                self.results.len(),
                self.underlying
            )
        }
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Squares off underlyings against a [`Brokerage`].
#[derive(Debug)]
pub struct ExitExecutor<B> {
    brokerage: B,
}

impl<B: Brokerage> ExitExecutor<B> {
    pub fn new(brokerage: B) -> Self {
        Self { brokerage }
    }

    /// Returns the brokerage.
    pub fn brokerage(&self) -> &B {
        &self.brokerage
    }

    /// Fetches positions and returns the orders a square-off would place.
    ///
    /// # Errors
    /// Returns `KiteError::InvalidOrder` for a blank underlying, or the
    /// brokerage error if positions cannot be fetched.
    pub async fn plan(&self, underlying: &str) -> Result<Vec<ExitOrder>> {
        let underlying = underlying.trim();
        if underlying.is_empty() {
            return Err(KiteError::InvalidOrder("underlying cannot be empty".to_string()));
        }

        let book = self.brokerage.positions().await?;
        let legs = filter_open_legs(dedup_positions(book), underlying);

        Ok(legs.iter().filter_map(ExitOrder::offsetting).collect())
    }

    /// Places an offsetting order for every open leg under `underlying`.
    ///
    /// Per-leg failures are recorded in the report, not returned as errors.
    ///
    /// # Errors
    /// Returns error only if planning fails.
    pub async fn exit_underlying(&self, underlying: &str) -> Result<ExitReport> {
        let orders = self.plan(underlying).await?;

        tracing::info!(underlying, legs = orders.len(), "Squaring off");

        let mut results = Vec::with_capacity(orders.len());
        for order in orders {
            let status = match self.brokerage.place_order(&order.to_request()).await {
                Ok(order_id) => {
                    tracing::info!(
                        symbol = %order.tradingsymbol,
                        side = %order.transaction_type,
                        quantity = order.quantity,
                        %order_id,
                        "Exit order placed"
                    );
                    LegStatus::Placed { order_id }
                }
                Err(e) => {
                    tracing::warn!(
                        symbol = %order.tradingsymbol,
                        side = %order.transaction_type,
                        quantity = order.quantity,
                        error = %e,
                        "Exit order failed"
                    );
                    LegStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            results.push(LegOutcome {
                symbol: order.tradingsymbol,
                transaction_type: order.transaction_type,
                quantity: order.quantity,
                status,
            });
        }

        Ok(ExitReport {
            underlying: underlying.trim().to_string(),
            results,
        })
    }
}

use rust_decimal::Decimal;

/// A live position as reported by a brokerage.
///
/// Implemented by brokerage crates so the aggregator does not depend on any
/// particular wire format.
pub trait PositionRecord {
    /// Exchange trading symbol, e.g. `NIFTY24DEC24000CE`.
    fn symbol(&self) -> &str;

    /// Signed open quantity; negative for short positions.
    fn quantity(&self) -> i64;

    /// Profit and loss reported by the brokerage.
    fn pnl(&self) -> Decimal;
}

/// Maps a trading symbol to the name of its underlying.
pub trait UnderlyingResolver: Send + Sync {
    fn resolve(&self, symbol: &str) -> String;
}

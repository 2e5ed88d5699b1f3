use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregated resting size at one price on one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub price: f64,
    pub count: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookSide {
    Bids,
    Asks,
}

impl BookSide {
    /// Exchange convention: a non-negative amount is a bid, a negative one an ask.
    pub fn from_signed_amount(amount: f64) -> Self {
        if amount >= 0.0 { Self::Bids } else { Self::Asks }
    }
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bids => f.write_str("bids"),
            Self::Asks => f.write_str("asks"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Strictly positive amounts are buys, everything else a sell.
    pub fn from_signed_amount(amount: f64) -> Self {
        if amount > 0.0 { Self::Buy } else { Self::Sell }
    }
}

/// A single executed trade, normalized to an unsigned amount plus side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeRecord {
    pub timestamp: i64,
    pub amount: f64,
    pub price: f64,
    pub side: TradeSide,
}

/// Logical stream a subscribed channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Book,
    Trades,
}

impl StreamKind {
    pub fn from_channel_name(name: &str) -> Option<Self> {
        match name {
            "book" => Some(Self::Book),
            "trades" => Some(Self::Trades),
            _ => None,
        }
    }
}

/// Transport-assigned channel identifier. Bitfinex uses integers,
/// other venues use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum ChannelId {
    Num(u64),
    Name(String),
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

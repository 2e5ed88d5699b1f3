//! Decoding of Bitfinex v2 public websocket frames.
//!
//! Objects carrying `event` are control messages. Arrays are channel data,
//! `[chanId, ...payload]`, whose meaning depends on the subscribed channel.

use crate::errors::FeedError;
use crate::models::ChannelId;
use crate::orderbook::{BookMessage, RawLevel};
use crate::trades::{RawTrade, TradeMessage};
use serde::Deserialize;
use serde_json::Value;

/// `conf` flag asking the exchange to send book checksums.
pub const CHECKSUM_FLAG: u32 = 131072;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ControlEvent {
    Subscribed {
        #[serde(rename = "chanId")]
        chan_id: ChannelId,
        channel: String,
        #[serde(default)]
        symbol: Option<String>,
    },
    Error {
        #[serde(default)]
        msg: String,
        #[serde(default)]
        code: Option<i64>,
    },
    Info {
        #[serde(default)]
        version: Option<u32>,
    },
    Conf {
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, PartialEq)]
pub enum Frame {
    Event(ControlEvent),
    Data { channel: ChannelId, payload: Vec<Value> },
}

pub fn decode_frame(text: &str) -> Result<Frame, FeedError> {
    match serde_json::from_str::<Value>(text)? {
        value @ Value::Object(_) => Ok(Frame::Event(serde_json::from_value(value)?)),
        Value::Array(mut items) => {
            if items.is_empty() {
                return Err(FeedError::UnexpectedData("empty data frame".to_string()));
            }
            let channel = ChannelId::deserialize(&items.remove(0))?;
            Ok(Frame::Data {
                channel,
                payload: items,
            })
        }
        other => Err(FeedError::UnexpectedData(format!(
            "unexpected frame {other}"
        ))),
    }
}

pub fn decode_book(payload: &[Value]) -> Result<BookMessage, FeedError> {
    match payload.first() {
        Some(Value::String(tag)) if tag == "hb" => Ok(BookMessage::Heartbeat),
        Some(Value::String(tag)) if tag == "cs" => {
            let checksum = payload
                .get(1)
                .and_then(Value::as_i64)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| FeedError::UnexpectedData("checksum is not an int32".to_string()))?;
            Ok(BookMessage::Checksum(checksum))
        }
        Some(Value::Array(items)) => match items.first() {
            Some(Value::Array(_)) | None => {
                let levels = items.iter().map(decode_level).collect::<Result<Vec<_>, _>>()?;
                Ok(BookMessage::Snapshot(levels))
            }
            Some(_) => Ok(BookMessage::Update(decode_level(&payload[0])?)),
        },
        other => Err(FeedError::UnexpectedData(format!(
            "unexpected book payload {other:?}"
        ))),
    }
}

pub fn decode_trades(payload: &[Value]) -> Result<TradeMessage, FeedError> {
    match payload.first() {
        Some(Value::String(tag)) if tag == "hb" => Ok(TradeMessage::Heartbeat),
        Some(Value::String(tag)) if tag == "te" => {
            let trade = payload
                .get(1)
                .ok_or_else(|| FeedError::UnexpectedData("te without trade".to_string()))?;
            Ok(TradeMessage::Executed(decode_trade(trade)?))
        }
        // `tu` repeats an already seen `te` with the trade id filled in
        Some(Value::String(_)) => Ok(TradeMessage::Other),
        Some(Value::Array(items)) => {
            let trades = items.iter().map(decode_trade).collect::<Result<Vec<_>, _>>()?;
            Ok(TradeMessage::Snapshot(trades))
        }
        other => Err(FeedError::UnexpectedData(format!(
            "unexpected trades payload {other:?}"
        ))),
    }
}

/// `[PRICE, COUNT, AMOUNT]`
fn decode_level(value: &Value) -> Result<RawLevel, FeedError> {
    let (price, count, amount) = <(f64, u64, f64)>::deserialize(value)?;
    Ok(RawLevel::new(price, count, amount))
}

/// `[ID, MTS, AMOUNT, PRICE]`
fn decode_trade(value: &Value) -> Result<RawTrade, FeedError> {
    let (_id, timestamp, amount, price) = <(u64, i64, f64, f64)>::deserialize(value)?;
    Ok(RawTrade {
        timestamp,
        amount,
        price,
    })
}

pub fn conf_message() -> String {
    serde_json::json!({ "event": "conf", "flags": CHECKSUM_FLAG }).to_string()
}

pub fn subscribe_book(pair: &str) -> String {
    serde_json::json!({
        "event": "subscribe",
        "channel": "book",
        "symbol": format!("t{pair}"),
        "prec": "P0",
    })
    .to_string()
}

pub fn subscribe_trades(pair: &str) -> String {
    serde_json::json!({
        "event": "subscribe",
        "channel": "trades",
        "symbol": format!("t{pair}"),
    })
    .to_string()
}

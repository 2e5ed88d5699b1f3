//! Exchange checksum over the top of the book.
//!
//! For each depth index the bid level (`price:amount`) is emitted before the
//! ask level (`price:-amount`); absent levels are skipped. The joined string
//! is hashed with IEEE CRC-32 and read as a signed 32-bit integer, which is
//! how the exchange transmits it.

use super::Book;
use crate::models::BookSide;

pub fn checksum_input(book: &Book, depth: usize) -> String {
    let bids = book.prices(BookSide::Bids);
    let asks = book.prices(BookSide::Asks);
    let mut parts = Vec::with_capacity(depth * 4);

    for i in 0..depth {
        if let Some(point) = bids.get(i).and_then(|p| book.get(BookSide::Bids, *p)) {
            parts.push(format_number(point.price));
            parts.push(format_number(point.amount));
        }
        if let Some(point) = asks.get(i).and_then(|p| book.get(BookSide::Asks, *p)) {
            parts.push(format_number(point.price));
            parts.push(format_number(-point.amount));
        }
    }

    parts.join(":")
}

pub fn crc32_signed(input: &str) -> i32 {
    crc32fast::hash(input.as_bytes()) as i32
}

/// Renders a number the way the exchange stringifies it: shortest
/// round-trip digits, exponent form below 1e-6 and from 1e21 up.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude < 1e-6 || magnitude >= 1e21 {
        let exp = format!("{value:e}");
        // Rust writes `1e21`, the exchange `1e+21`
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }

    value.to_string()
}

//! Normalizes exchange market-data feeds into top-of-book and recent-trade
//! views and republishes them to a key/value store.

pub mod api;
pub mod channels;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod feeds;
pub mod models;
pub mod orderbook;
pub mod sink;
pub mod trades;

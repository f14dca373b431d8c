pub mod market_data;
pub mod websocket;

pub use market_data::{BinanceCandleSource, BinanceCandleSourceBuilder};
pub use websocket::BinanceKlineStream;

pub mod binance;
pub mod core;
pub mod mock;
pub mod notifications;
pub mod observability;

pub mod provider;
pub mod yahoo;

pub use provider::{fetch_watchlist, PriceHistoryProvider};
pub use yahoo::YahooClient;

pub mod cache;
pub mod config;
pub mod consolidate;
pub mod extract;
pub mod fetch;
pub mod period;
pub mod pipeline;
pub mod scrape;
pub mod server;
pub mod sheets;

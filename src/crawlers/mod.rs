pub mod frontier;
pub mod web;

pub use frontier::CrawlState;
pub use web::{CrawlSettings, extract_urls};

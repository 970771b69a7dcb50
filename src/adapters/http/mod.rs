//! Remote asset download adapter.

pub mod fetch;

pub use fetch::HttpFetcher;

//! Awaitable handles for work spawned onto the tokio runtime

pub mod async_wrappers;

pub use async_wrappers::CrawlRequest;

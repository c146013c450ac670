pub mod client;
pub mod fetcher;
pub mod http;
#[cfg(test)]
pub mod mock;

pub use client::RemoteSource;
pub use fetcher::BoundedFetcher;
pub use http::HttpSource;

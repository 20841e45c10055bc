//! Outbound HTTP used by the fetcher and the media persister.
//!
//! Everything that reads from third-party hosts goes through the `HttpClient`
//! trait so the pipeline can be driven by `MockClient` in tests.

mod client;

pub use client::{FetchedBytes, HttpClient, MockClient, MockResponse, WebClient, WebClientBuilder};

/// User agent sent to social platforms and recipe sites. Several of them
/// serve a stripped page (or nothing) to non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

//! Horoscope sources
//!
//! The cache never talks to the network itself. It is handed a
//! `ScopeProvider`, which returns the complete sign → horoscope map in one go.

pub mod onion;

pub use onion::{BlockingOnion, OnionClient, ScrapeError, DEFAULT_BASE_URL};

use std::collections::HashMap;

/// Something that can produce today's horoscopes, keyed by sign
pub trait ScopeProvider: Send + Sync {
    /// Fetches every available horoscope
    ///
    /// Blocks until done. Called with the cache lock held, so callers that need
    /// bounded latency should configure a timeout on the provider.
    fn fetch_scopes(&self) -> Result<HashMap<String, String>, ScrapeError>;
}

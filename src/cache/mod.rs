//! Cache module for horoscopes persisted to disk
//!
//! This module provides a disk-backed key/value store that refreshes itself
//! through a caller-supplied fetch function once its data goes stale, plus a
//! case-insensitive prefix lookup for resolving partial keys such as `"aq"`.

pub mod clock;
mod lookup;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lookup::{lookup, MatchResult};
pub use store::{CachedStore, FetchError, StoreError, DEFAULT_STALE_AFTER_SECS};

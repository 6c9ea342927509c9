//! The `.scope` / `.horoscope` chat command
//!
//! Turns a user's query into a reply: refresh the cache if it is stale, resolve
//! the partial sign, and phrase the outcome for chat.

use std::sync::Arc;

use tracing::warn;

use crate::cache::{CachedStore, MatchResult};
use crate::scrape::ScopeProvider;

/// Command names the bot answers to, without the leading `.`
pub const COMMAND_NAMES: [&str; 2] = ["scope", "horoscope"];

pub const MISSING_SIGN_REPLY: &str = "I need to know which Zodiac Sign you want me to look up.";
pub const UNKNOWN_SIGN_REPLY: &str = "I don't recognize that Zodiac Sign.";
pub const UNAVAILABLE_REPLY: &str = "I couldn't reach the horoscope source. Try again later.";

/// Answers horoscope queries for one bot session
///
/// Owns a handle to the session's store and the provider used to refill it.
pub struct ScopeCommand<P> {
    store: Arc<CachedStore>,
    provider: P,
}

impl<P: ScopeProvider> ScopeCommand<P> {
    pub fn new(store: Arc<CachedStore>, provider: P) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &Arc<CachedStore> {
        &self.store
    }

    /// Builds the reply for a query such as `"aq"`
    ///
    /// A failed refresh is logged and the query is answered from whatever is
    /// still cached, since yesterday's horoscope beats none.
    pub fn reply(&self, query: Option<&str>) -> String {
        let Some(sign) = query.map(str::trim).filter(|s| !s.is_empty()) else {
            return MISSING_SIGN_REPLY.to_string();
        };

        if let Err(e) = self.store.refresh(|| self.provider.fetch_scopes()) {
            warn!(error = %e, "horoscope refresh failed");
            if self.store.is_empty() {
                return UNAVAILABLE_REPLY.to_string();
            }
        }

        match self.store.lookup(sign) {
            MatchResult::NoMatch => UNKNOWN_SIGN_REPLY.to_string(),
            MatchResult::Unique { key, value } => format!("{}: {}", capitalize(&key), value),
            MatchResult::Ambiguous(keys) => {
                // Keys differing only in case name the same sign.
                let mut signs: Vec<String> = keys.iter().map(|k| capitalize(k)).collect();
                signs.sort();
                signs.dedup();

                if let [sign] = signs.as_slice() {
                    return match keys.first().and_then(|k| self.store.get(k)) {
                        Some(value) => format!("{}: {}", sign, value),
                        None => UNKNOWN_SIGN_REPLY.to_string(),
                    };
                }
                format!("Did you mean {}?", comma_join(&signs, ", ", "or"))
            }
        }
    }
}

/// Pulls the sign argument out of a chat line
///
/// Accepts `.scope <sign>`, `.horoscope <sign>`, or a bare `<sign>`. Only the
/// first word after the command counts. Returns `None` when no sign was given.
pub fn parse_command(line: &str) -> Option<&str> {
    let mut words = line.split_whitespace();
    let first = words.next()?;

    match first.strip_prefix('.') {
        Some(name) if COMMAND_NAMES.iter().any(|c| c.eq_ignore_ascii_case(name)) => words.next(),
        _ => Some(first),
    }
}

/// Joins items for prose: `"a"`, `"a and b"`, `"a, b and c"`
pub fn comma_join<S: AsRef<str>>(items: &[S], sep: &str, final_sep: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let init: Vec<&str> = init.iter().map(|s| s.as_ref()).collect();
            format!("{} {} {}", init.join(sep), final_sep, last.as_ref())
        }
    }
}

/// Upper-cases the first character and lower-cases the rest (`"aRIES"` → `"Aries"`)
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

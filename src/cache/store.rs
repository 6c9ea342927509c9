//! Disk-backed key/value store with staleness-driven refresh
//!
//! Provides a `CachedStore` that keeps a string map in memory, mirrors every
//! mutation to a line-oriented file, and refetches its whole contents through a
//! caller-supplied function once the data is older than a freshness window.
//!
//! File format:
//!
//! ```text
//! <last_fetched epoch seconds>
//! <key>\t<value>
//! <key>\t<value>
//! ```
//!
//! An unparsable first line reads as 0 (never fetched). Entry lines are trimmed
//! of surrounding whitespace, then lines without a tab are skipped. Keys and values are written verbatim, so they must not contain tabs
//! or newlines.

use super::clock::{Clock, SystemClock};
use super::lookup::{self, MatchResult};
use chrono::Duration;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default freshness window in seconds (one day)
pub const DEFAULT_STALE_AFTER_SECS: i64 = 86_400;

/// Boxed error returned by a fetch function
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when persisting or refreshing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("cache file I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The fetch function failed; the store was left as it was
    #[error("fetch failed: {0}")]
    Fetch(#[source] FetchError),
}

/// In-memory image of the backing file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Snapshot {
    entries: HashMap<String, String>,
    last_fetched: i64,
}

/// A string map persisted to a single file, refreshed lazily when stale
///
/// All state sits behind one mutex. `load`, `dump`, `refresh`, `set`, `delete`
/// and `invalidate` hold it for the whole file write plus in-memory change.
/// `refresh` also holds it while the fetch function runs, so concurrent callers
/// wait for an in-flight fetch instead of starting their own.
pub struct CachedStore {
    /// Backing file
    path: PathBuf,
    /// Sibling file written first, then renamed over `path`
    tmp_path: PathBuf,
    /// How long fetched data stays fresh
    stale_after: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<Snapshot>,
}

impl CachedStore {
    /// Opens the store at `path`, creating an empty file if none exists
    ///
    /// Parent directories are created as needed. The file is loaded immediately,
    /// so a brand-new store is stale until its first refresh.
    pub fn open(path: impl Into<PathBuf>, stale_after: Duration) -> Result<Self, StoreError> {
        Self::with_clock(path, stale_after, Arc::new(SystemClock))
    }

    /// Opens the store with a custom time source
    pub fn with_clock(
        path: impl Into<PathBuf>,
        stale_after: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let tmp_path = temp_sibling(&path)?;
        ensure_file(&path)?;

        let store = Self {
            path,
            tmp_path,
            stale_after,
            clock,
            state: Mutex::new(Snapshot::default()),
        };
        store.load();
        Ok(store)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Freshness window
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Epoch seconds of the last successful refresh, 0 if never
    pub fn last_fetched(&self) -> i64 {
        self.state().last_fetched
    }

    /// Replaces the in-memory state with the contents of the backing file
    ///
    /// Never fails: an unreadable file leaves the store empty and stale.
    pub fn load(&self) {
        let mut state = self.state();
        *state = match fs::read(&self.path) {
            Ok(bytes) => parse(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read cache file");
                Snapshot::default()
            }
        };
        debug!(
            path = %self.path.display(),
            entries = state.entries.len(),
            last_fetched = state.last_fetched,
            "loaded cache"
        );
    }

    /// Writes the in-memory state to the backing file
    ///
    /// The file is replaced as a whole; on error the previous file is untouched.
    pub fn dump(&self) -> Result<(), StoreError> {
        let state = self.state();
        self.write(&state)
    }

    /// Whether the data is older than the freshness window
    pub fn is_stale(&self) -> bool {
        let last_fetched = self.state().last_fetched;
        self.stale_since(last_fetched)
    }

    /// Refetches everything if stale
    ///
    /// Returns `Ok(false)` without calling `fetch` when the data is fresh, and
    /// `Ok(true)` after replacing all entries with the fetched map. If `fetch`
    /// fails, nothing changes and the error comes back as `StoreError::Fetch`.
    pub fn refresh<F, E>(&self, fetch: F) -> Result<bool, StoreError>
    where
        F: FnOnce() -> Result<HashMap<String, String>, E>,
        E: Into<FetchError>,
    {
        let mut state = self.state();
        if !self.stale_since(state.last_fetched) {
            return Ok(false);
        }

        let fetched_at = self.clock.now().timestamp();
        info!(path = %self.path.display(), "cache is stale, fetching");
        let entries = fetch().map_err(|e| StoreError::Fetch(e.into()))?;

        let previous = std::mem::replace(
            &mut *state,
            Snapshot {
                entries,
                last_fetched: fetched_at,
            },
        );
        if let Err(e) = self.write(&state) {
            *state = previous;
            return Err(e);
        }

        info!(entries = state.entries.len(), "cache refreshed");
        Ok(true)
    }

    /// Marks the data as never fetched, so the next `refresh` refetches
    pub fn invalidate(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        let previous = std::mem::replace(&mut state.last_fetched, 0);
        if let Err(e) = self.write(&state) {
            state.last_fetched = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Returns the value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.state().entries.get(key).cloned()
    }

    /// Inserts or replaces a value and persists it before returning
    ///
    /// Returns the previous value. If the write fails the insert is undone.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, StoreError> {
        let key = key.into();
        let mut state = self.state();
        let previous = state.entries.insert(key.clone(), value.into());

        if let Err(e) = self.write(&state) {
            match previous {
                Some(old) => {
                    state.entries.insert(key, old);
                }
                None => {
                    state.entries.remove(&key);
                }
            }
            return Err(e);
        }
        Ok(previous)
    }

    /// Removes a key and persists the removal before returning
    ///
    /// Returns the removed value, or `None` (without touching the file) if the
    /// key was absent. If the write fails the removal is undone.
    pub fn delete(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state();
        let Some(previous) = state.entries.remove(key) else {
            return Ok(None);
        };

        if let Err(e) = self.write(&state) {
            state.entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(Some(previous))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// A sorted copy of every entry
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .state()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Resolves a partial key against the current entries
    ///
    /// Does not refresh; call `refresh` first if fresh data matters.
    pub fn lookup(&self, partial: &str) -> MatchResult {
        lookup::lookup(&self.state().entries, partial)
    }

    fn state(&self) -> MutexGuard<'_, Snapshot> {
        // Poisoning is ignored: no mutation of the snapshot can panic halfway.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stale_since(&self, last_fetched: i64) -> bool {
        let age = self.clock.now().timestamp().saturating_sub(last_fetched);
        age > self.stale_after.num_seconds()
    }

    /// Writes `state` to the temp file and renames it over the backing file
    fn write(&self, state: &Snapshot) -> Result<(), StoreError> {
        let result = fs::write(&self.tmp_path, render(state))
            .and_then(|()| fs::rename(&self.tmp_path, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&self.tmp_path);
            warn!(path = %self.path.display(), error = %e, "failed to write cache file");
            return Err(e.into());
        }

        debug!(path = %self.path.display(), entries = state.entries.len(), "dumped cache");
        Ok(())
    }
}

impl fmt::Debug for CachedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedStore")
            .field("path", &self.path)
            .field("stale_after", &self.stale_after)
            .finish_non_exhaustive()
    }
}

/// Creates the file (and its directory) if missing, leaving existing content alone
fn ensure_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> io::Result<PathBuf> {
    let Some(name) = path.file_name() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cache path has no file name: {}", path.display()),
        ));
    };
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn parse(content: &str) -> Snapshot {
    let mut lines = content.lines();
    let last_fetched = lines
        .next()
        .and_then(|line| line.trim().parse::<i64>().ok())
        .unwrap_or(0);

    let entries = lines
        .map(str::trim)
        .filter_map(|line| line.split_once('\t'))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    Snapshot {
        entries,
        last_fetched,
    }
}

fn render(state: &Snapshot) -> String {
    let mut out = format!("{}\n", state.last_fetched);
    for (key, value) in &state.entries {
        out.push_str(key);
        out.push('\t');
        out.push_str(value);
        out.push('\n');
    }
    out
}

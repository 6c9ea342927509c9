//! Horoscope scraper for The Onion
//!
//! Finds the newest horoscope article on the horoscopes index page, then pulls
//! one (sign, text) pair out of every `quotable` section of that article.

use super::ScopeProvider;
use regex::{Captures, Regex};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::debug;

/// Site root used when no override is configured
pub const DEFAULT_BASE_URL: &str = "https://www.theonion.com";

/// Default timeout for each HTTP request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Index page listing horoscope articles, relative to the base URL
const HOROSCOPES_PATH: &str = "c/horoscopes";

static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<article\b[^>]*?\bdata-id\s*=\s*["']([^"']+)["']"#)
        .expect("article regex is valid")
});

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<section\b[^>]*\bclass\s*=\s*["'][^"']*\bquotable\b[^"']*["'][^>]*>(.*?)</section>"#,
    )
    .expect("section regex is valid")
});

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<([a-z][a-z0-9]*)\b[^>]*\bclass\s*=\s*["'][^"']*\bquotable__header\b[^"']*["'][^>]*>"#,
    )
    .expect("header regex is valid")
});

static CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<[a-z][a-z0-9]*\b[^>]*\bclass\s*=\s*["'][^"']*\bquotable__content\b[^"']*["'][^>]*>"#,
    )
    .expect("content regex is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity regex is valid")
});

/// Errors that can occur when scraping horoscopes
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The index page had no article to follow
    #[error("no horoscope article found on the index page")]
    MissingArticle,

    /// The article had no recognizable horoscope sections
    #[error("article {0} contained no horoscopes")]
    NoHoroscopes(String),
}

/// Client for scraping horoscopes from The Onion
#[derive(Debug, Clone)]
pub struct OnionClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Site root (allows override for testing)
    base_url: String,
}

impl OnionClient {
    /// Creates a client for the given site root with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ScrapeError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Site root this client scrapes
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches today's horoscopes, keyed by sign
    ///
    /// # Returns
    /// * `Ok(map)` with at least one entry
    /// * `Err(ScrapeError)` if either page cannot be fetched or holds nothing usable
    pub async fn fetch_scopes(&self) -> Result<HashMap<String, String>, ScrapeError> {
        let index = self
            .get_text(&format!("{}/{}", self.base_url, HOROSCOPES_PATH))
            .await?;
        let article_id = parse_article_id(&index).ok_or(ScrapeError::MissingArticle)?;
        debug!(article_id = %article_id, "found horoscope article");

        let article = self
            .get_text(&format!("{}/{}", self.base_url, article_id))
            .await?;
        let scopes = parse_horoscopes(&article);
        if scopes.is_empty() {
            return Err(ScrapeError::NoHoroscopes(article_id));
        }

        debug!(count = scopes.len(), "scraped horoscopes");
        Ok(scopes)
    }

    async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let body = self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Runs an `OnionClient` to completion on a tokio runtime from synchronous code
///
/// Must be called from a thread outside the runtime's async workers, such as
/// one started with `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct BlockingOnion {
    client: OnionClient,
    runtime: Handle,
}

impl BlockingOnion {
    pub fn new(client: OnionClient, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl ScopeProvider for BlockingOnion {
    fn fetch_scopes(&self) -> Result<HashMap<String, String>, ScrapeError> {
        self.runtime.block_on(self.client.fetch_scopes())
    }
}

/// Returns the `data-id` of the first article that carries one
fn parse_article_id(html: &str) -> Option<String> {
    ARTICLE_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Extracts sign → text from every `quotable` section
///
/// The sign is the header text up to the first `|` ("Aries | March 21 to April 19").
/// Sections missing either part are skipped.
fn parse_horoscopes(html: &str) -> HashMap<String, String> {
    let mut scopes = HashMap::new();

    for section in SECTION_RE.captures_iter(html) {
        let inner = section.get(1).map_or("", |m| m.as_str());
        if let Some((sign, text)) = parse_section(inner) {
            scopes.insert(sign, text);
        }
    }

    scopes
}

fn parse_section(inner: &str) -> Option<(String, String)> {
    let header = HEADER_RE.captures(inner)?;
    let header_open = header.get(0)?;
    let header_tag = header[1].to_ascii_lowercase();

    let content_open = CONTENT_RE.find(inner)?;
    let content = text_of(&inner[content_open.end()..]);

    let header_rest = &inner[header_open.end()..];
    let close = format!("</{}", header_tag);
    let header_end = header_rest
        .to_ascii_lowercase()
        .find(&close)
        .unwrap_or(header_rest.len());
    let header_text = text_of(&header_rest[..header_end]);

    let sign = header_text.split('|').next().unwrap_or("").trim().to_string();
    if sign.is_empty() || content.is_empty() {
        return None;
    }
    Some((sign, content))
}

/// Visible text of an HTML fragment, on one line
///
/// Tabs and newlines are folded into single spaces so the result is safe to
/// store in the line-oriented cache file.
fn text_of(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        _ => return None,
    };
    Some(c)
}

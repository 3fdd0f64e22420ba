//! arXiv provider implementation.
//!
//! Talks to the public arXiv Atom API (`/api/query`). Requests are spaced by a
//! configurable minimum interval and retried on transport errors and server
//! failures, matching the etiquette arXiv asks API clients to follow.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{PaperProvider, ProviderError, ProviderResult, SearchCriteria};
use crate::models::PaperRecord;

/// Default arXiv API endpoint.
pub const DEFAULT_ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

const USER_AGENT: &str = concat!("mcp-paper-cache/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the arXiv API.
#[derive(Debug, Clone)]
pub struct ArxivConfig {
    /// Query endpoint
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Minimum delay between two requests, in milliseconds
    pub request_interval_ms: u64,

    /// Extra attempts after a failed request
    pub max_retries: u32,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARXIV_API_URL.to_string(),
            timeout_secs: 30,
            request_interval_ms: 3000,
            max_retries: 3,
        }
    }
}

/// HTTP client for the arXiv API.
pub struct ArxivProvider {
    client: reqwest::Client,
    config: ArxivConfig,
    last_request: Mutex<Option<Instant>>,
}

impl ArxivProvider {
    /// Create a new arXiv provider.
    ///
    /// # Errors
    /// Returns `ProviderError::Config` if the base URL is empty and
    /// `ProviderError::Http` if the HTTP client cannot be built
    pub fn new(config: ArxivConfig) -> ProviderResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ProviderError::Config("arXiv API URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    /// Wait until the configured interval since the previous request elapsed.
    ///
    /// The lock is held across the sleep so concurrent callers queue up.
    async fn throttle(&self) {
        let interval = Duration::from_millis(self.config.request_interval_ms);
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// GET `url` and return the body, retrying transient failures.
    async fn fetch_feed(&self, url: &str) -> ProviderResult<String> {
        let attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.throttle().await;
            debug!("arXiv request (attempt {}/{}): {}", attempt, attempts, url);

            let outcome = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await?;

                    if status.is_success() {
                        return Ok(body);
                    }

                    // arXiv reports malformed queries as an Atom error feed.
                    if status.is_client_error() {
                        if let Err(api @ ProviderError::Api(_)) = parse_feed(&body) {
                            return Err(api);
                        }
                        return Err(ProviderError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }

                    ProviderError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    }
                }
                Err(e) => ProviderError::Http(e),
            };

            if attempt >= attempts {
                return Err(outcome);
            }
            warn!("arXiv request failed, retrying: {}", outcome);
        }
    }
}

#[async_trait]
impl PaperProvider for ArxivProvider {
    async fn search(&self, criteria: &SearchCriteria) -> ProviderResult<Vec<PaperRecord>> {
        let url = build_search_url(&self.config.base_url, criteria);
        let body = self.fetch_feed(&url).await?;
        let mut papers = parse_feed(&body)?;
        papers.truncate(criteria.max_results);
        debug!("arXiv search {:?} returned {} papers", criteria.query, papers.len());
        Ok(papers)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> ProviderResult<Vec<PaperRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = build_id_list_url(&self.config.base_url, ids);
        let body = self.fetch_feed(&url).await?;
        parse_feed(&body)
    }

    fn name(&self) -> &str {
        "arXiv"
    }
}

// ── URL Building ──────────────────────────────────────────────

/// Build the search URL for a free-text query.
pub fn build_search_url(base_url: &str, criteria: &SearchCriteria) -> String {
    format!(
        "{}?search_query={}&start=0&max_results={}&sortBy={}&sortOrder={}",
        base_url,
        urlencoding::encode(&criteria.query),
        criteria.max_results,
        criteria.sort_by.as_api_str(),
        criteria.sort_order.as_api_str(),
    )
}

/// Build the lookup URL for a list of identifiers.
pub fn build_id_list_url(base_url: &str, ids: &[String]) -> String {
    let joined = ids
        .iter()
        .map(|id| id.trim())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}?id_list={}&max_results={}",
        base_url,
        urlencoding::encode(&joined),
        ids.len()
    )
}

// ── Atom Parsing ──────────────────────────────────────────────

/// Parse an arXiv Atom feed into paper records, in feed order.
///
/// # Errors
/// Returns `ProviderError::Parse` if the body is not an Atom feed or an entry
/// lacks its id, and `ProviderError::Api` if the feed is an arXiv error report
pub fn parse_feed(xml: &str) -> ProviderResult<Vec<PaperRecord>> {
    if find_open_tag(xml, "feed").is_none() {
        return Err(ProviderError::Parse(
            "response is not an Atom feed".to_string(),
        ));
    }

    extract_blocks(xml, "entry")
        .into_iter()
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> ProviderResult<PaperRecord> {
    let entry_id = extract_tag_text(entry, "id")
        .ok_or_else(|| ProviderError::Parse("entry without <id>".to_string()))?;

    if entry_id.contains("/api/errors") {
        let message = extract_tag_text(entry, "summary").unwrap_or(entry_id);
        return Err(ProviderError::Api(message));
    }

    let id = short_id(&entry_id);
    let title = normalize_whitespace(&extract_tag_text(entry, "title").unwrap_or_default());
    let summary = extract_tag_text(entry, "summary").unwrap_or_default();

    let authors = extract_blocks(entry, "author")
        .into_iter()
        .filter_map(|block| extract_tag_text(block, "name"))
        .map(|name| normalize_whitespace(&name))
        .collect();

    let published = extract_tag_text(entry, "published")
        .map(|raw| published_date(&raw))
        .unwrap_or_default();

    let pdf_url = pdf_link(entry).unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", id));

    Ok(PaperRecord {
        id,
        title,
        authors,
        summary,
        pdf_url,
        published,
    })
}

/// Canonical short id from an entry id such as `http://arxiv.org/abs/2301.00001v2`.
pub fn short_id(entry_id: &str) -> String {
    match entry_id.find("arxiv.org/abs/") {
        Some(pos) => entry_id[pos + "arxiv.org/abs/".len()..].to_string(),
        None => entry_id
            .rsplit("/abs/")
            .next()
            .unwrap_or(entry_id)
            .to_string(),
    }
}

/// Reduce an RFC 3339 timestamp to its UTC calendar date.
fn published_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => ts.with_timezone(&Utc).date_naive().to_string(),
        Err(_) => raw.trim().chars().take(10).collect(),
    }
}

fn pdf_link(entry: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(pos) = find_open_tag(&entry[search_from..], "link") {
        let start = search_from + pos;
        let end = start + entry[start..].find('>')? + 1;
        let tag = &entry[start..end];

        let is_pdf = extract_attribute(tag, "title").as_deref() == Some("pdf")
            || extract_attribute(tag, "type").as_deref() == Some("application/pdf");
        if is_pdf {
            return extract_attribute(tag, "href");
        }
        search_from = end;
    }
    None
}

/// Position of `<tag` followed by `>`, `/` or whitespace.
fn find_open_tag(xml: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{}", tag);
    let mut search_from = 0;

    while let Some(pos) = xml[search_from..].find(&needle) {
        let start = search_from + pos;
        let after = start + needle.len();
        match xml[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => return Some(start),
            _ => search_from = after,
        }
    }
    None
}

/// All `<tag ...>...</tag>` blocks, including the tags themselves.
fn extract_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(pos) = find_open_tag(&xml[search_from..], tag) {
        let start = search_from + pos;
        let Some(end_pos) = xml[start..].find(&close) else {
            break;
        };
        let end = start + end_pos + close.len();
        blocks.push(&xml[start..end]);
        search_from = end;
    }
    blocks
}

/// Decoded, trimmed text content of the first `<tag>` element.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let close = format!("</{}>", tag);
    let start = find_open_tag(xml, tag)?;
    let content_start = start + xml[start..].find('>')? + 1;
    if xml[..content_start].ends_with("/>") {
        return Some(String::new());
    }
    let content_end = content_start + xml[content_start..].find(&close)?;

    Some(decode_entities(xml[content_start..content_end].trim()))
}

fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!(" {}=\"", attr);
    let start = tag.find(&search)? + search.len();
    let end = start + tag[start..].find('"')?;
    Some(decode_entities(&tag[start..end]))
}

/// Decode the predefined XML entities and numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?search_query%3Dquantum" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=quantum</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2301.00001v2</id>
    <updated>2023-02-01T10:00:00Z</updated>
    <published>2023-01-15T18:30:00Z</published>
    <title>Quantum Error
      Correction &amp; Friends</title>
    <summary>  We study things.
Across lines.  </summary>
    <author>
      <name>Alice Smith</name>
    </author>
    <author>
      <name>Bob Jones</name>
    </author>
    <link href="http://arxiv.org/abs/2301.00001v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2301.00001v2" rel="related" type="application/pdf"/>
    <category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2302.00002v1</id>
    <published>2023-02-20T23:59:59-05:00</published>
    <title>Second</title>
    <summary>S</summary>
    <author><name>Carol</name></author>
  </entry>
</feed>"#;

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_bad</id>
    <title>Error</title>
    <summary>incorrect id format for bad</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_entries_in_order() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.id, "2301.00001v2");
        assert_eq!(first.title, "Quantum Error Correction & Friends");
        assert_eq!(first.summary, "We study things.\nAcross lines.");
        assert_eq!(first.authors, vec!["Alice Smith", "Bob Jones"]);
        assert_eq!(first.pdf_url, "http://arxiv.org/pdf/2301.00001v2");
        assert_eq!(first.published, "2023-01-15");

        assert_eq!(papers[1].id, "2302.00002v1");
    }

    #[test]
    fn test_missing_pdf_link_falls_back() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers[1].pdf_url, "https://arxiv.org/pdf/2302.00002v1");
    }

    #[test]
    fn test_published_date_is_utc() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers[1].published, "2023-02-21");
        assert_eq!(published_date("2023-01-15"), "2023-01-15");
    }

    #[test]
    fn test_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_not_a_feed() {
        let err = parse_feed("<html><body>Down</body></html>").unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_error_feed_becomes_api_error() {
        match parse_feed(ERROR_FEED).unwrap_err() {
            ProviderError::Api(message) => assert_eq!(message, "incorrect id format for bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("http://arxiv.org/abs/2301.00001v2"), "2301.00001v2");
        assert_eq!(short_id("http://arxiv.org/abs/hep-th/9901001v1"), "hep-th/9901001v1");
        assert_eq!(short_id("2301.00001"), "2301.00001");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;x&gt; &quot;q&quot; &apos;"), "<x> \"q\" '");
        assert_eq!(decode_entities("&#233;t&#xE9;"), "été");
        assert_eq!(decode_entities("AT&T &unknown; &"), "AT&T &unknown; &");
    }

    #[test]
    fn test_open_tag_requires_boundary() {
        let xml = "<identifier>x</identifier><id>y</id>";
        assert_eq!(extract_tag_text(xml, "id").as_deref(), Some("y"));
    }

    #[test]
    fn test_build_search_url() {
        let criteria = SearchCriteria::relevance("quantum computing", 3);
        assert_eq!(
            build_search_url(DEFAULT_ARXIV_API_URL, &criteria),
            "https://export.arxiv.org/api/query?search_query=quantum%20computing&start=0&max_results=3&sortBy=relevance&sortOrder=descending"
        );
    }

    #[test]
    fn test_build_id_list_url() {
        let ids = vec!["2301.00001".to_string(), " 2302.00002v1 ".to_string()];
        assert_eq!(
            build_id_list_url("http://localhost/api/query", &ids),
            "http://localhost/api/query?id_list=2301.00001%2C2302.00002v1&max_results=2"
        );
    }

    #[test]
    fn test_new_rejects_empty_url() {
        let config = ArxivConfig {
            base_url: " ".to_string(),
            ..ArxivConfig::default()
        };
        assert!(matches!(ArxivProvider::new(config), Err(ProviderError::Config(_))));
    }
}

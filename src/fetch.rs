use std::io::ErrorKind;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{status_label, Result, ScrapeError};

/// Content types accepted as markup
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Anything that can turn a product URL into raw HTML
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Reject anything that is not an absolute http(s) URL
pub fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    let lower = trimmed.to_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(ScrapeError::InvalidUrl(trimmed.to_string()));
    }
    match url::Url::parse(trimmed) {
        Ok(parsed) if parsed.host_str().is_some() => Ok(()),
        _ => Err(ScrapeError::InvalidUrl(trimmed.to_string())),
    }
}

/// Single-attempt HTTP GET with browser-like headers
pub struct HttpFetcher {
    agent: ureq::Agent,
    timeout: Duration,
    user_agent: String,
    accept_language: String,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Self {
        let timeout = config.timeout();
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            timeout,
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
        }
    }

    fn map_error(&self, url: &str, err: ureq::Error) -> ScrapeError {
        match err {
            ureq::Error::StatusCode(status) => {
                warn!(url, status, "HTTP {} {}", status, status_label(status));
                ScrapeError::FetchHttpError { status }
            }
            ureq::Error::Timeout(_) => {
                warn!(url, timeout_secs = self.timeout.as_secs(), "fetch timed out");
                ScrapeError::FetchTimeout { url: url.to_string() }
            }
            ureq::Error::Io(ref io) if io.kind() == ErrorKind::TimedOut => {
                warn!(url, timeout_secs = self.timeout.as_secs(), "fetch timed out");
                ScrapeError::FetchTimeout { url: url.to_string() }
            }
            other => {
                warn!(url, "fetch failed: {}", other);
                ScrapeError::HttpError(other)
            }
        }
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        validate_url(url)?;
        let url = url.trim();
        debug!(url, "fetching page");

        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", ACCEPT)
            .header("Accept-Language", &self.accept_language)
            .header("Connection", "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Cache-Control", "max-age=0")
            .call()
            .map_err(|e| self.map_error(url, e))?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html_content_type(&content_type) {
            warn!(url, content_type = %content_type, "response is not HTML");
            return Err(ScrapeError::ContentTypeMismatch { content_type });
        }

        let html = response
            .into_body()
            .read_to_string()
            .map_err(|e| self.map_error(url, e))?;
        debug!(url, bytes = html.len(), "fetched page");
        Ok(html)
    }
}

pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_lowercase();
    HTML_CONTENT_TYPES.iter().any(|t| lower.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_requires_scheme() {
        assert!(validate_url("https://www.target.com/p/x").is_ok());
        assert!(validate_url("HTTP://example.com").is_ok());
        assert!(matches!(validate_url("www.amazon.com/dp/1"), Err(ScrapeError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com"), Err(ScrapeError::InvalidUrl(_))));
        assert!(matches!(validate_url("https://"), Err(ScrapeError::InvalidUrl(_))));
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("Text/HTML"));
        assert!(!is_html_content_type("application/json"));
        assert!(!is_html_content_type("image/jpeg"));
        assert!(!is_html_content_type(""));
    }

    #[test]
    fn test_invalid_url_never_hits_network() {
        let fetcher = HttpFetcher::new(&Config::default());
        assert!(matches!(fetcher.fetch("not-a-url"), Err(ScrapeError::InvalidUrl(_))));
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid URL (expected http:// or https://): {0}")]
    InvalidUrl(String),

    #[error("Timed out fetching {url}")]
    FetchTimeout { url: String },

    #[error("HTTP {status} {}", status_label(*.status))]
    FetchHttpError { status: u16 },

    #[error("Response is not HTML (Content-Type: {content_type})")]
    ContentTypeMismatch { content_type: String },

    #[error("Could not parse page markup: {0}")]
    ParseError(String),

    #[error("No data found via HTML strategies")]
    NoDataFound,

    #[error("Batch cancelled before this item was processed")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Human label for the HTTP statuses we report on specifically
pub fn status_label(status: u16) -> &'static str {
    match status {
        403 => "Forbidden (likely blocked by anti-scraping measures)",
        404 => "Not Found",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        500..=599 => "Server Error",
        _ => "Error",
    }
}

impl ScrapeError {
    /// Whether this error happened before any HTML was available
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ScrapeError::FetchTimeout { .. }
                | ScrapeError::FetchHttpError { .. }
                | ScrapeError::ContentTypeMismatch { .. }
                | ScrapeError::HttpError(_)
        )
    }

    /// Status text for the batch summary (`Failed - <reason>`)
    pub fn status_reason(&self) -> String {
        match self {
            ScrapeError::InvalidUrl(_) => "Failed - Invalid URL".to_string(),
            ScrapeError::FetchTimeout { .. } => "Failed - Could not fetch URL (Timeout)".to_string(),
            ScrapeError::FetchHttpError { status } => {
                let short = match status {
                    403 => "Blocked",
                    404 => "Not Found",
                    503 => "Unavailable",
                    _ => "HTTP Error",
                };
                format!("Failed - Could not fetch URL (HTTP {} {})", status, short)
            }
            ScrapeError::ContentTypeMismatch { .. } => {
                "Failed - Could not fetch URL (Not HTML)".to_string()
            }
            ScrapeError::HttpError(_) => "Failed - Could not fetch URL (Connection Error)".to_string(),
            ScrapeError::ParseError(_) => "Failed - Parsing Error".to_string(),
            ScrapeError::NoDataFound => "Failed - No Data Found via HTML Strategies".to_string(),
            ScrapeError::Cancelled => "Failed - Cancelled".to_string(),
            other => format!("Failed - {}", other),
        }
    }

    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ScrapeError::InvalidUrl(_) => Some(
                "Product URLs must start with http:// or https://"
            ),
            ScrapeError::FetchTimeout { .. } => Some(
                "The site did not answer in time. Retry later or raise the limit:\n  suppscore scrape <url> --timeout 25"
            ),
            ScrapeError::FetchHttpError { status: 403 } => Some(
                "The retailer is blocking automated requests. Save the page from a browser and run:\n  suppscore extract page.html --url <url>"
            ),
            ScrapeError::FetchHttpError { status: 404 } => Some(
                "Check that the product page still exists"
            ),
            ScrapeError::FetchHttpError { status: 503 } => Some(
                "The site is unavailable or rate limiting. Increase the delay between requests:\n  suppscore batch urls.csv --delay 3"
            ),
            ScrapeError::ContentTypeMismatch { .. } => Some(
                "The URL points to something other than an HTML page (image, PDF, JSON)"
            ),
            ScrapeError::NoDataFound => Some(
                "The page may render its facts with JavaScript or as an image label"
            ),
            ScrapeError::ConfigError(_) | ScrapeError::TomlError(_) => Some(
                "Check your config file, or regenerate it with `suppscore init --force`"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason_distinguishes_http_codes() {
        assert_eq!(
            ScrapeError::FetchHttpError { status: 403 }.status_reason(),
            "Failed - Could not fetch URL (HTTP 403 Blocked)"
        );
        assert_eq!(
            ScrapeError::FetchHttpError { status: 404 }.status_reason(),
            "Failed - Could not fetch URL (HTTP 404 Not Found)"
        );
        assert_eq!(
            ScrapeError::FetchHttpError { status: 503 }.status_reason(),
            "Failed - Could not fetch URL (HTTP 503 Unavailable)"
        );
    }

    #[test]
    fn test_invalid_url_reason() {
        let err = ScrapeError::InvalidUrl("example.com".into());
        assert_eq!(err.status_reason(), "Failed - Invalid URL");
        assert!(!err.is_fetch_failure());
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_display_includes_label() {
        let err = ScrapeError::FetchHttpError { status: 404 };
        assert_eq!(err.to_string(), "HTTP 404 Not Found");
    }
}

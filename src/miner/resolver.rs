//! Extracts the hosted media URL from an identifier page

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// CSS selector of the screenshot element on a hosting page
pub const SCREENSHOT_SELECTOR: &str = "img.no-click.screenshot-image";

/// Why a fetched page did not yield a media URL
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no screenshot element in page")]
    ElementMissing,

    #[error("screenshot element has no src attribute")]
    MissingSource,

    #[error("screenshot src {src:?} is not a usable URL: {reason}")]
    InvalidSource { src: String, reason: String },

    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Finds the screenshot element in `html` and returns its absolute source URL
///
/// Relative and protocol-relative sources (`//host/path.png`) are resolved
/// against `page_url`. Only http(s) results are accepted.
///
/// # Example
///
/// ```
/// use img_miner::miner::resolve_hosting_url;
/// use url::Url;
///
/// let html = r#"<img class="no-click screenshot-image" src="https://i.example.com/a.png">"#;
/// let page = Url::parse("https://prnt.sc/aabcde").unwrap();
/// assert_eq!(
///     resolve_hosting_url(html, &page).unwrap(),
///     "https://i.example.com/a.png"
/// );
/// ```
pub fn resolve_hosting_url(html: &str, page_url: &Url) -> Result<String, ResolveError> {
    let selector = Selector::parse(SCREENSHOT_SELECTOR)
        .map_err(|e| ResolveError::Selector(format!("{:?}", e)))?;
    let document = Html::parse_document(html);

    let element = document
        .select(&selector)
        .next()
        .ok_or(ResolveError::ElementMissing)?;

    let src = element
        .value()
        .attr("src")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ResolveError::MissingSource)?;

    let resolved = page_url
        .join(src)
        .map_err(|e| ResolveError::InvalidSource {
            src: src.to_string(),
            reason: e.to_string(),
        })?;

    match resolved.scheme() {
        "http" | "https" => Ok(resolved.to_string()),
        other => Err(ResolveError::InvalidSource {
            src: src.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

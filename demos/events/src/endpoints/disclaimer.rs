//! The `disclaimer` endpoint: the single published legal page of a city.

use super::content_url;
use crate::RouteParams;
use endpoint_store_core::endpoint::{Endpoint, EndpointBuilder};
use endpoint_store_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The disclaimer page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclaimer {
    /// CMS id
    pub id: u64,
    /// Title
    pub title: String,
    /// HTML body
    pub content: String,
}

/// Why a disclaimer response was rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DisclaimerError {
    /// Zero or several pages, or not a list at all
    #[error("disclaimer: expected exactly one page")]
    NotExactlyOne,
    /// The only page is not published
    #[error("disclaimer: page is not published")]
    NotPublished,
    /// The page lacks required fields
    #[error("disclaimer: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    status: String,
    #[serde(flatten)]
    page: Disclaimer,
}

/// Map the CMS response into the disclaimer.
///
/// # Errors
///
/// See [`DisclaimerError`].
pub fn parse_disclaimer(json: Value) -> Result<Disclaimer, DisclaimerError> {
    let Value::Array(mut pages) = json else {
        return Err(DisclaimerError::NotExactlyOne);
    };
    if pages.len() != 1 {
        return Err(DisclaimerError::NotExactlyOne);
    }

    let raw: RawPage = pages
        .pop()
        .map(serde_json::from_value)
        .ok_or(DisclaimerError::NotExactlyOne)?
        .map_err(|e| DisclaimerError::Malformed(e.to_string()))?;

    if raw.status != "publish" {
        return Err(DisclaimerError::NotPublished);
    }
    Ok(raw.page)
}

/// The `disclaimer` endpoint against the CMS at `base_url`
///
/// # Errors
///
/// Never in practice; the builder is complete.
pub fn disclaimer_endpoint(base_url: &str) -> Result<Endpoint<RouteParams>, ConfigError> {
    let base_url = base_url.to_string();

    EndpointBuilder::new("disclaimer")
        .with_url_mapper(move |params: &RouteParams| content_url(&base_url, "disclaimer", params))
        .with_mapper(parse_disclaimer)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use serde_json::json;

    fn page(status: &str) -> Value {
        json!({
            "id": 1689,
            "permalink": { "url_page": "feedback-kontakt-und-moegliches-engagement" },
            "title": "Feedback, Kontakt und mögliches Engagement",
            "type": "disclaimer",
            "status": status,
            "modified_gmt": "2017-06-12 12:27:57",
            "excerpt": "Excerpt",
            "content": "<span>Content</span>",
            "parent": 0
        })
    }

    #[test]
    fn maps_the_published_page() {
        assert_eq!(
            parse_disclaimer(json!([page("publish")])),
            Ok(Disclaimer {
                id: 1689,
                title: "Feedback, Kontakt und mögliches Engagement".to_string(),
                content: "<span>Content</span>".to_string(),
            })
        );
    }

    #[test]
    fn rejects_several_pages() {
        assert_eq!(
            parse_disclaimer(json!([page("publish"), page("publish")])),
            Err(DisclaimerError::NotExactlyOne)
        );
    }

    #[test]
    fn rejects_a_missing_page() {
        assert_eq!(parse_disclaimer(Value::Null), Err(DisclaimerError::NotExactlyOne));
        assert_eq!(parse_disclaimer(json!([])), Err(DisclaimerError::NotExactlyOne));
    }

    #[test]
    fn rejects_an_unpublished_page() {
        assert_eq!(
            parse_disclaimer(json!([page("no published")])),
            Err(DisclaimerError::NotPublished)
        );
    }

    #[test]
    fn url_and_refetch_policy() {
        let endpoint = disclaimer_endpoint("https://cms.example.org").unwrap();
        let params = RouteParams::new("neuburgschrobenhausenwohnraum", "de");

        assert_eq!(
            endpoint.url_for(&params),
            "https://cms.example.org/neuburgschrobenhausenwohnraum/de/wp-json/extensions/v0/modified_content/disclaimer?since=1970-01-01T00:00:00Z"
        );
        assert!(!endpoint.should_refetch(&params, &RouteParams::new("augsburg", "en")));
    }
}

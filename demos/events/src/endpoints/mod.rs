//! Endpoints of the CMS content API.

use crate::RouteParams;

pub mod disclaimer;
pub mod events;

/// Content URL for `resource` at the given route
pub(crate) fn content_url(base_url: &str, resource: &str, params: &RouteParams) -> String {
    format!(
        "{}/{}/{}/wp-json/extensions/v0/modified_content/{resource}?since=1970-01-01T00:00:00Z",
        base_url.trim_end_matches('/'),
        params.location,
        params.language,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;

    #[test]
    fn content_url_ignores_trailing_slash() {
        let params = RouteParams::new("augsburg", "de");
        assert_eq!(
            content_url("https://cms.example.org/", "events", &params),
            "https://cms.example.org/augsburg/de/wp-json/extensions/v0/modified_content/events?since=1970-01-01T00:00:00Z"
        );
    }
}

//! The fetch decision.
//!
//! Given what the store knows about an endpoint and how the consumer's
//! parameters moved, decide whether a request must be issued:
//!
//! 1. Derive the target URL from the new parameters.
//! 2. If the record already carries that URL, skip: the resource is cached
//!    or in flight. This is the dedup guard between consumers sharing an
//!    endpoint.
//! 3. Otherwise fetch on the first evaluation after mount, or when the
//!    endpoint's refetch predicate accepts the parameter change.
//! 4. Otherwise skip and keep showing the cached record, even though it was
//!    produced for a different URL.

use crate::endpoint::Endpoint;
use crate::record::FetchRecord;
use std::fmt;

/// Why no request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The record's URL equals the target URL
    AlreadyRequested,
    /// The parameter change does not invalidate the cached record
    NotInvalidated,
}

impl SkipReason {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyRequested => "already_requested",
            Self::NotInvalidated => "not_invalidated",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Issue a request for this URL
    Fetch {
        /// Target URL
        url: String,
    },
    /// Keep the current record
    Skip(SkipReason),
}

impl Decision {
    /// URL to fetch, if any
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Fetch { url } => Some(url),
            Self::Skip(_) => None,
        }
    }

    /// Whether a request is issued
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

/// Decide whether `endpoint` must be fetched.
///
/// `old_params` is `None` on the first evaluation after mount.
#[must_use]
pub fn decide<T, P>(
    record: &FetchRecord<T>,
    old_params: Option<&P>,
    new_params: &P,
    endpoint: &Endpoint<P>,
) -> Decision {
    let url = endpoint.url_for(new_params);

    if record.request_url() == Some(url.as_str()) {
        return Decision::Skip(SkipReason::AlreadyRequested);
    }

    let invalidated = match old_params {
        None => true,
        Some(old) => endpoint.should_refetch(old, new_params),
    };

    if invalidated {
        Decision::Fetch { url }
    } else {
        Decision::Skip(SkipReason::NotInvalidated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use crate::endpoint::EndpointBuilder;
    use crate::record::Payload;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Params {
        location: String,
        language: String,
    }

    fn params(location: &str, language: &str) -> Params {
        Params {
            location: location.to_string(),
            language: language.to_string(),
        }
    }

    fn events(refetch_on_language: bool) -> Endpoint<Params> {
        EndpointBuilder::new("events")
            .with_url_mapper(|p: &Params| format!("https://host/{}/{}/events", p.location, p.language))
            .with_mapper(|json| Ok::<_, String>(json))
            .with_refetch_logic(move |old: &Params, new: &Params| {
                refetch_on_language && old.language != new.language
            })
            .build()
            .unwrap()
    }

    #[test]
    fn first_evaluation_fetches() {
        let decision = decide(
            &FetchRecord::<Payload>::default(),
            None,
            &params("augsburg", "de"),
            &events(false),
        );
        assert_eq!(
            decision,
            Decision::Fetch {
                url: "https://host/augsburg/de/events".to_string()
            }
        );
    }

    #[test]
    fn same_url_is_never_fetched_twice() {
        let record = FetchRecord::<Payload>::default().started("https://host/augsburg/de/events");
        let decision = decide(&record, None, &params("augsburg", "de"), &events(true));
        assert_eq!(decision, Decision::Skip(SkipReason::AlreadyRequested));
    }

    #[test]
    fn parameter_change_without_invalidation_keeps_cache() {
        let record = FetchRecord::<Payload>::default().started("https://host/augsburg/de/events");
        let decision = decide(
            &record,
            Some(&params("augsburg", "de")),
            &params("regensburg", "de"),
            &events(true),
        );
        assert_eq!(decision, Decision::Skip(SkipReason::NotInvalidated));
    }

    #[test]
    fn invalidating_change_fetches_new_url() {
        let record = FetchRecord::<Payload>::default().started("https://host/augsburg/de/events");
        let decision = decide(
            &record,
            Some(&params("augsburg", "de")),
            &params("augsburg", "en"),
            &events(true),
        );
        assert_eq!(decision.url(), Some("https://host/augsburg/en/events"));
        assert!(decision.is_fetch());
    }

    #[test]
    fn skip_reason_labels() {
        assert_eq!(SkipReason::AlreadyRequested.to_string(), "already_requested");
        assert_eq!(SkipReason::NotInvalidated.as_str(), "not_invalidated");
    }

    fn any_params() -> impl Strategy<Value = Params> {
        ("[a-z]{1,6}", "(de|en|fr)").prop_map(|(location, language)| Params { location, language })
    }

    proptest! {
        #[test]
        fn refetch_false_never_fetches_after_mount(
            old in any_params(),
            new in any_params(),
            cached_url in proptest::option::of("https://host/[a-z]{1,6}/(de|en)/events"),
        ) {
            let mut record = FetchRecord::<Payload>::default();
            if let Some(url) = cached_url {
                record = record.started(url);
            }
            let decision = decide(&record, Some(&old), &new, &events(false));
            prop_assert!(!decision.is_fetch());
        }

        #[test]
        fn decision_is_deterministic(
            old in proptest::option::of(any_params()),
            new in any_params(),
            refetch in any::<bool>(),
        ) {
            let endpoint = events(refetch);
            let record = FetchRecord::<Payload>::default();
            let first = decide(&record, old.as_ref(), &new, &endpoint);
            let second = decide(&record, old.as_ref(), &new, &endpoint);
            prop_assert_eq!(first, second);
        }
    }
}

//! Property tests for refetch gating
//!
//! Drives a fetcher through arbitrary navigation sequences and counts the
//! requests it starts.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use endpoint_store_core::endpoint::EndpointBuilder;
use endpoint_store_core::environment::HttpClient;
use endpoint_store_core::registry::EndpointRegistry;
use endpoint_store_core::slice::{EndpointAction, EndpointsReducer, EndpointsState};
use endpoint_store_runtime::{EndpointContext, FetcherBuilder, Store};
use endpoint_store_testing::{MockHttpClient, RecordingReducer, test_clock};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// The selected language lives outside the store; the only actions the store
/// sees are the endpoint ones.
fn run(languages: &[&'static str], refetch: bool) -> (usize, Vec<String>) {
    tokio_test::block_on(async {
        let endpoint = EndpointBuilder::new("pages")
            .with_url_mapper(|language: &String| format!("https://host/{language}/pages"))
            .with_mapper(|json| Ok::<_, String>(json))
            .with_refetch_logic(move |old: &String, new: &String| refetch && old != new)
            .with_response_override(json!([]))
            .build()
            .unwrap();
        let http = Arc::new(MockHttpClient::new());
        let context = EndpointContext::new(
            Arc::new(EndpointRegistry::new([endpoint]).unwrap()),
            Arc::clone(&http) as Arc<dyn HttpClient>,
            Arc::new(test_clock()),
        );

        let (reducer, log) = RecordingReducer::new(EndpointsReducer::<()>::new());
        let store = Store::new(EndpointsState::new(), reducer, ());
        let language = Arc::new(std::sync::Mutex::new(String::new()));

        let selected = Arc::clone(&language);
        let mut fetcher = FetcherBuilder::<String>::new("pages")
            .with_context(context)
            .mount(store.clone(), move |_state: &EndpointsState| selected.lock().unwrap().clone())
            .unwrap();

        for next in languages {
            *language.lock().unwrap() = (*next).to_string();
            fetcher.update().await.unwrap().wait().await;
        }

        let started: Vec<String> = log
            .actions()
            .into_iter()
            .filter_map(|action| match action {
                EndpointAction::RequestStarted { request_url, .. } => Some(request_url),
                EndpointAction::RequestFinished { .. } => None,
            })
            .collect();
        (http.call_count(), started)
    })
}

fn languages() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(vec!["de", "en", "fr"]), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn each_invalidating_transition_starts_exactly_one_request(languages in languages()) {
        let (network_calls, started) = run(&languages, true);

        let mut expected = vec![format!("https://host/{}/pages", languages[0])];
        for pair in languages.windows(2) {
            if pair[0] != pair[1] {
                expected.push(format!("https://host/{}/pages", pair[1]));
            }
        }

        prop_assert_eq!(started, expected);
        prop_assert_eq!(network_calls, 0);
    }

    #[test]
    fn without_refetch_logic_only_the_mount_fetches(languages in languages()) {
        let (_, started) = run(&languages, false);

        prop_assert_eq!(started, vec![format!("https://host/{}/pages", languages[0])]);
    }
}

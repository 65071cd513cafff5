//! # Endpoint Store Testing
//!
//! Testing utilities and helpers for endpoint-store applications.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (`FixedClock`, `MockHttpClient`)
//! - `RecordingReducer` to observe every action a store reduces
//! - `ReducerTest`, a Given-When-Then harness, and effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use endpoint_store_testing::{MockHttpClient, RecordingReducer, test_clock};
//!
//! #[tokio::test]
//! async fn mounts_fetch_once() {
//!     let http = Arc::new(MockHttpClient::new().with_response(URL, json!([])));
//!     let (reducer, log) = RecordingReducer::new(app_reducer());
//!     let store = Store::new(AppState::default(), reducer, ());
//!     // mount fetchers...
//!     assert_eq!(http.call_count(), 1);
//!     assert_eq!(log.count(|a| matches!(a, AppAction::Endpoint(_))), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use endpoint_store_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use endpoint_store_core::environment::HttpClient;
    use endpoint_store_core::error::FetchError;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use endpoint_store_testing::mocks::FixedClock;
    /// use endpoint_store_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    #[derive(Debug, Clone)]
    struct Scripted {
        result: Result<Value, FetchError>,
        latency: Duration,
    }

    /// Scripted [`HttpClient`]
    ///
    /// Answers per URL with a fixed body or error, optionally after a delay,
    /// and records every requested URL. Unscripted URLs answer with a 404.
    ///
    /// # Example
    ///
    /// ```
    /// use endpoint_store_testing::MockHttpClient;
    /// use serde_json::json;
    ///
    /// let http = MockHttpClient::new().with_response("https://host/a", json!([1]));
    /// assert_eq!(http.call_count(), 0);
    /// ```
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        scripts: Mutex<HashMap<String, Scripted>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        /// Client with nothing scripted
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `url` with `body`
        #[must_use]
        pub fn with_response(self, url: impl Into<String>, body: Value) -> Self {
            self.script(url, Ok(body));
            self
        }

        /// Answer `url` with `error`
        #[must_use]
        pub fn with_failure(self, url: impl Into<String>, error: FetchError) -> Self {
            self.script(url, Err(error));
            self
        }

        /// Delay the answer for `url`
        #[must_use]
        pub fn with_latency(self, url: &str, latency: Duration) -> Self {
            self.lock_scripts()
                .entry(url.to_string())
                .or_insert_with(|| Scripted {
                    result: Err(not_found(url)),
                    latency: Duration::ZERO,
                })
                .latency = latency;
            self
        }

        /// Replace the answer for `url`, keeping its latency
        pub fn script(&self, url: impl Into<String>, result: Result<Value, FetchError>) {
            let mut scripts = self.lock_scripts();
            let entry = scripts.entry(url.into()).or_insert_with(|| Scripted {
                result: Ok(Value::Null),
                latency: Duration::ZERO,
            });
            entry.result = result;
        }

        /// Every requested URL, in request order
        #[must_use]
        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of requests made
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Number of requests made for `url`
        #[must_use]
        pub fn calls_to(&self, url: &str) -> usize {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|call| *call == url)
                .count()
        }

        fn lock_scripts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Scripted>> {
            self.scripts.lock().unwrap_or_else(PoisonError::into_inner)
        }

        async fn answer(&self, url: &str) -> Result<Value, FetchError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(url.to_string());

            let scripted = self.lock_scripts().get(url).cloned();
            let Some(scripted) = scripted else {
                return Err(not_found(url));
            };

            if !scripted.latency.is_zero() {
                tokio::time::sleep(scripted.latency).await;
            }
            scripted.result
        }
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Status {
            status: 404,
            url: url.to_string(),
        }
    }

    impl HttpClient for MockHttpClient {
        fn get_json<'a>(
            &'a self,
            url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + 'a>> {
            Box::pin(self.answer(url))
        }
    }
}

/// Reducer wrappers for observing a store
pub mod recording {
    use endpoint_store_core::{SmallVec, effect::Effect, reducer::Reducer};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Shared log of reduced actions
    #[derive(Debug)]
    pub struct ActionLog<A> {
        actions: Arc<Mutex<Vec<A>>>,
    }

    impl<A> Clone for ActionLog<A> {
        fn clone(&self) -> Self {
            Self {
                actions: Arc::clone(&self.actions),
            }
        }
    }

    impl<A: Clone> ActionLog<A> {
        /// Every action reduced so far, in order
        #[must_use]
        pub fn actions(&self) -> Vec<A> {
            self.actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of reduced actions matching `predicate`
        #[must_use]
        pub fn count<F>(&self, predicate: F) -> usize
        where
            F: Fn(&A) -> bool,
        {
            self.actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|action| predicate(action))
                .count()
        }

        /// Number of reduced actions
        #[must_use]
        pub fn len(&self) -> usize {
            self.actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether nothing has been reduced
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    /// Wraps a reducer and logs every action before delegating
    pub struct RecordingReducer<R: Reducer> {
        inner: R,
        log: ActionLog<R::Action>,
    }

    impl<R: Reducer> RecordingReducer<R> {
        /// Wrap `inner`, returning the reducer and a handle to its log
        #[must_use]
        pub fn new(inner: R) -> (Self, ActionLog<R::Action>) {
            let log = ActionLog {
                actions: Arc::new(Mutex::new(Vec::new())),
            };
            (
                Self {
                    inner,
                    log: log.clone(),
                },
                log,
            )
        }
    }

    impl<R> Reducer for RecordingReducer<R>
    where
        R: Reducer,
        R::Action: Clone,
    {
        type State = R::State;
        type Action = R::Action;
        type Environment = R::Environment;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            self.log
                .actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(action.clone());
            self.inner.reduce(state, action, env)
        }
    }
}

/// Ergonomic reducer testing with a fluent Given-When-Then API
pub mod reducer_test;

// Re-export commonly used items
pub use mocks::{FixedClock, MockHttpClient, test_clock};
pub use recording::{ActionLog, RecordingReducer};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use endpoint_store_core::environment::HttpClient;
    use endpoint_store_core::error::FetchError;
    use endpoint_store_core::reducer::Reducer;
    use endpoint_store_core::slice::{EndpointAction, EndpointsReducer, EndpointsState};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[tokio::test]
    async fn test_mock_http_answers_scripted_urls() {
        let http = MockHttpClient::new()
            .with_response("https://host/a", json!([1, 2]))
            .with_failure("https://host/b", FetchError::Request("offline".to_string()));

        assert_eq!(http.get_json("https://host/a").await, Ok(json!([1, 2])));
        assert_eq!(
            http.get_json("https://host/b").await,
            Err(FetchError::Request("offline".to_string()))
        );
        assert!(matches!(
            http.get_json("https://host/c").await,
            Err(FetchError::Status { status: 404, .. })
        ));

        assert_eq!(http.call_count(), 3);
        assert_eq!(http.calls_to("https://host/a"), 1);
        assert_eq!(http.calls()[2], "https://host/c");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_http_latency() {
        let http = MockHttpClient::new()
            .with_response("https://host/slow", json!("late"))
            .with_latency("https://host/slow", Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        let body = http.get_json("https://host/slow").await;

        assert_eq!(body, Ok(json!("late")));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn test_recording_reducer_logs_actions() {
        let (reducer, log) = RecordingReducer::new(EndpointsReducer::<()>::new());
        let mut state = EndpointsState::new();

        let _ = reducer.reduce(
            &mut state,
            EndpointAction::RequestStarted {
                endpoint_name: "events".to_string(),
                request_url: "https://host/a".to_string(),
            },
            &(),
        );

        assert_eq!(log.len(), 1);
        assert_eq!(log.count(|a| a.endpoint_name() == "events"), 1);
        assert!(state.record("events").is_fetching());
    }
}

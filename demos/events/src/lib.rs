//! # Events Demo
//!
//! A city portal's events and disclaimer pages backed by endpoint-store.
//!
//! This example showcases:
//! - Route parameters living in application state
//! - The endpoints slice embedded with `scope_reducer`
//! - Two endpoints: `events` (refetched when the language changes) and
//!   `disclaimer` (cached per name, never refetched)
//! - Fetchers mounted against one shared store
//!
//! ## Example
//!
//! ```no_run
//! use endpoint_store_runtime::{EndpointContext, FetcherBuilder, ReqwestClient, HttpConfig};
//! use endpoint_store_core::environment::SystemClock;
//! use events_demo::{AppState, RouteParams, app_store, registry, route_params};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let clock = Arc::new(SystemClock);
//! let http = Arc::new(ReqwestClient::new(&HttpConfig::from_env())?);
//! let context = EndpointContext::new(Arc::new(registry("https://cms.example.org", clock.clone())?), http, clock);
//!
//! let store = app_store(AppState::new(RouteParams::new("augsburg", "de")));
//! let mut events = FetcherBuilder::<RouteParams, usize>::new("events")
//!     .with_context(context)
//!     .mount(store.clone(), route_params)?;
//! events.update().await?.wait().await;
//! # Ok(())
//! # }
//! ```

use endpoint_store_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use endpoint_store_core::endpoint::Endpoint;
use endpoint_store_core::environment::Clock;
use endpoint_store_core::error::ConfigError;
use endpoint_store_core::reducer::Reducer;
use endpoint_store_core::registry::EndpointRegistry;
use endpoint_store_core::slice::{EndpointAction, EndpointsReducer, EndpointsState, HasEndpoints};
use endpoint_store_core::{SmallVec, effect::Effect, smallvec};
use endpoint_store_runtime::Store;
use std::sync::Arc;

/// Endpoint descriptors and their domain models
pub mod endpoints;

pub use endpoints::disclaimer::{Disclaimer, disclaimer_endpoint};
pub use endpoints::events::{Event, EventDate, events_endpoint};

/// The part of the route every endpoint derives its URL from
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteParams {
    /// City (CMS instance) name
    pub location: String,
    /// Content language code
    pub language: String,
}

impl RouteParams {
    /// Route for `location` in `language`
    #[must_use]
    pub fn new(location: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            language: language.into(),
        }
    }
}

/// Application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Current route
    pub route: RouteParams,
    /// Fetch records by endpoint name
    pub endpoints: EndpointsState,
}

impl AppState {
    /// State at `route` with nothing fetched yet
    #[must_use]
    pub fn new(route: RouteParams) -> Self {
        Self {
            route,
            endpoints: EndpointsState::new(),
        }
    }
}

impl HasEndpoints for AppState {
    fn endpoints(&self) -> &EndpointsState {
        &self.endpoints
    }
}

/// Application actions
#[derive(Debug, Clone)]
pub enum AppAction {
    /// The user moved to another route
    Navigate(RouteParams),
    /// Fetch lifecycle of an endpoint
    Endpoint(EndpointAction),
}

impl From<EndpointAction> for AppAction {
    fn from(action: EndpointAction) -> Self {
        Self::Endpoint(action)
    }
}

/// Reducer for route changes
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteReducer;

impl Reducer for RouteReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::Navigate(route) => {
                tracing::debug!(location = %route.location, language = %route.language, "Navigate");
                state.route = route;
            },
            AppAction::Endpoint(_) => {},
        }
        smallvec![Effect::None]
    }
}

/// The application's reducer
pub type AppReducer = CombinedReducer<AppState, AppAction, ()>;

/// The application's store
pub type AppStore = Store<AppState, AppAction, (), AppReducer>;

fn endpoints_slice(state: &mut AppState) -> &mut EndpointsState {
    &mut state.endpoints
}

fn endpoint_action(action: AppAction) -> Option<EndpointAction> {
    match action {
        AppAction::Endpoint(inner) => Some(inner),
        AppAction::Navigate(_) => None,
    }
}

/// Route reducer combined with the endpoints reducer scoped onto `endpoints`
#[must_use]
pub fn app_reducer() -> AppReducer {
    let reducers: Vec<Box<dyn Reducer<State = AppState, Action = AppAction, Environment = ()> + Send + Sync>> = vec![
        Box::new(RouteReducer),
        Box::new(scope_reducer(
            EndpointsReducer::new(),
            endpoints_slice,
            endpoint_action,
            AppAction::Endpoint,
        )),
    ];
    combine_reducers(reducers)
}

/// Store over `state` running [`app_reducer`]
#[must_use]
pub fn app_store(state: AppState) -> AppStore {
    Store::new(state, app_reducer(), ())
}

/// Parameter selector shared by all fetchers
#[must_use]
pub fn route_params(state: &AppState) -> RouteParams {
    state.route.clone()
}

/// Every endpoint of the application, against the CMS at `base_url`
///
/// # Errors
///
/// Returns a [`ConfigError`] if a descriptor is incomplete or names collide.
pub fn registry(
    base_url: &str,
    clock: Arc<dyn Clock>,
) -> Result<EndpointRegistry<RouteParams>, ConfigError> {
    let endpoints: [Endpoint<RouteParams>; 2] = [
        events_endpoint(base_url, clock)?,
        disclaimer_endpoint(base_url)?,
    ];
    EndpointRegistry::new(endpoints)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use endpoint_store_core::record::{FetchRecord, Payload};

    #[test]
    fn navigate_updates_the_route_only() {
        let mut state = AppState::new(RouteParams::new("augsburg", "de"));
        let _ = app_reducer().reduce(
            &mut state,
            AppAction::Navigate(RouteParams::new("augsburg", "en")),
            &(),
        );

        assert_eq!(state.route, RouteParams::new("augsburg", "en"));
        assert!(state.endpoints.is_empty());
    }

    #[test]
    fn endpoint_actions_reach_the_slice() {
        let mut state = AppState::default();
        let reducer = app_reducer();
        let _ = reducer.reduce(
            &mut state,
            EndpointAction::RequestStarted {
                endpoint_name: "events".to_string(),
                request_url: "https://host/a".to_string(),
            }
            .into(),
            &(),
        );
        let _ = reducer.reduce(
            &mut state,
            EndpointAction::RequestFinished {
                endpoint_name: "events".to_string(),
                record: FetchRecord::failed("offline", "https://host/a", chrono::Utc::now()),
            }
            .into(),
            &(),
        );

        let record = state.endpoints().record("events");
        assert!(!record.is_fetching());
        assert_eq!(record.error(), Some("offline"));
        assert_eq!(record.data(), None::<&Payload>);
    }

    #[test]
    fn registry_holds_both_endpoints() {
        let clock: Arc<dyn Clock> = Arc::new(endpoint_store_core::environment::SystemClock);
        let registry = registry("https://cms.example.org", clock).unwrap();
        assert_eq!(registry.names(), vec!["disclaimer", "events"]);
    }
}

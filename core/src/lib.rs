//! # Endpoint Store Core
//!
//! Pure building blocks for declaring remote data sources ("endpoints") and
//! keeping their fetch lifecycle in a shared application store.
//!
//! This crate contains no I/O. It provides:
//!
//! - **Reducer / Effect**: the `(State, Action, Environment) → (State, Effects)` contract
//! - **Endpoint**: immutable descriptor (URL mapper, transform, refetch predicate)
//! - **`EndpointBuilder`**: validated, single-use construction of descriptors
//! - **`EndpointRegistry`**: name → descriptor lookup, built once per application
//! - **`FetchRecord`**: the cached/in-flight state of one endpoint
//! - **`EndpointsReducer`**: the store slice mutated by `RequestStarted` / `RequestFinished`
//! - **`decide`**: the pure fetch/skip decision used by the orchestrator
//!
//! ## Example
//!
//! ```
//! use endpoint_store_core::endpoint::EndpointBuilder;
//! use endpoint_store_core::registry::EndpointRegistry;
//!
//! #[derive(Clone, PartialEq)]
//! struct Params {
//!     location: String,
//!     language: String,
//! }
//!
//! let events = EndpointBuilder::<Params>::new("events")
//!     .with_url_mapper(|p| format!("https://host/{}/{}/events", p.location, p.language))
//!     .with_mapper(|json| Ok::<_, String>(json))
//!     .with_refetch_logic(|old, new| old.language != new.language)
//!     .build()?;
//!
//! let registry = EndpointRegistry::new([events])?;
//! assert!(registry.contains("events"));
//! # Ok::<(), endpoint_store_core::error::ConfigError>(())
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition utilities (combine, scope)
pub mod composition;

/// Decision logic for whether an endpoint should be fetched
pub mod decision;

/// Endpoint descriptors and their builder
pub mod endpoint;

/// Configuration and fetch error types
pub mod error;

/// Fetch records and type-erased payloads
pub mod record;

/// Name → descriptor lookup
pub mod registry;

/// Store slice holding one fetch record per endpoint name
pub mod slice;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all state-transition logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for RouteReducer {
    ///     type State = RouteParams;
    ///     type Action = AppAction;
    ///     type Environment = ();
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut RouteParams,
    ///         action: AppAction,
    ///         _env: &(),
    ///     ) -> SmallVec<[Effect<AppAction>; 4]> {
    ///         if let AppAction::Navigate(params) = action {
    ///             *state = params;
    ///         }
    ///         smallvec![Effect::None]
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers (or built by the fetch orchestrator) and executed by the
    /// Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Transform the action produced by this effect
        ///
        /// Used when a child reducer is lifted into a parent: the child's
        /// effects must feed parent actions back into the store.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            Action: Send + 'static,
            B: 'static,
            F: FnOnce(Action) -> B + Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies (time, network) are abstracted behind traits and
/// injected, so orchestration logic can run against deterministic doubles.
pub mod environment {
    use crate::error::FetchError;
    use chrono::{DateTime, Utc};
    use std::future::Future;
    use std::pin::Pin;

    /// Clock trait - abstracts time operations for testability
    ///
    /// Used to stamp `FetchRecord::fetch_date` and by transforms that compare
    /// against "now".
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Read-only network access for endpoint fetches
    ///
    /// One call per fetch decision. Implementations must turn every failure
    /// (transport, non-success status, undecodable body) into a [`FetchError`];
    /// nothing may escape as a panic.
    ///
    /// # Dyn Compatibility
    ///
    /// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
    /// so that it can be shared as `Arc<dyn HttpClient>`.
    pub trait HttpClient: Send + Sync {
        /// GET `url` and decode the body as JSON
        ///
        /// # Errors
        ///
        /// Returns [`FetchError`] on transport failure, non-success status or
        /// decode failure.
        fn get_json<'a>(
            &'a self,
            url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, FetchError>> + Send + 'a>>;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[tokio::test]
    async fn map_rewrites_future_output() {
        let effect: Effect<u32> = Effect::Future(Box::pin(async { Some(20) }));
        let mapped = effect.map(|n| format!("value={n}"));

        let Effect::Future(fut) = mapped else {
            unreachable!("map preserves the Future variant");
        };
        assert_eq!(fut.await.as_deref(), Some("value=20"));
    }

    #[test]
    fn map_keeps_none() {
        let effect: Effect<u8> = Effect::None;
        assert!(matches!(effect.map(u16::from), Effect::None));
    }
}

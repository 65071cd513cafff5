//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Run a child reducer on one field of a larger state,
//!   for the actions that belong to it
//!
//! The usual application shape is a combined reducer made of the
//! application's own reducer plus the endpoints reducer scoped onto the
//! `endpoints` field.
//!
//! # Example
//!
//! ```
//! use endpoint_store_core::composition::scope_reducer;
//! use endpoint_store_core::reducer::Reducer;
//! use endpoint_store_core::slice::{EndpointAction, EndpointsReducer, EndpointsState};
//!
//! #[derive(Clone, Default)]
//! struct AppState {
//!     language: String,
//!     endpoints: EndpointsState,
//! }
//!
//! #[derive(Clone)]
//! enum AppAction {
//!     SetLanguage(String),
//!     Endpoint(EndpointAction),
//! }
//!
//! fn endpoints(state: &mut AppState) -> &mut EndpointsState {
//!     &mut state.endpoints
//! }
//!
//! fn endpoint_action(action: AppAction) -> Option<EndpointAction> {
//!     match action {
//!         AppAction::Endpoint(inner) => Some(inner),
//!         AppAction::SetLanguage(_) => None,
//!     }
//! }
//!
//! let scoped = scope_reducer(
//!     EndpointsReducer::<()>::new(),
//!     endpoints,
//!     endpoint_action,
//!     AppAction::Endpoint,
//! );
//!
//! let mut state = AppState::default();
//! let _ = scoped.reduce(
//!     &mut state,
//!     AppAction::Endpoint(EndpointAction::RequestStarted {
//!         endpoint_name: "events".to_string(),
//!         request_url: "https://host/augsburg/de/events".to_string(),
//!     }),
//!     &(),
//! );
//! assert!(state.endpoints.record("events").is_fetching());
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
#[must_use]
pub fn combine_reducers<S, A, E>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer {
        reducers: reducers.into(),
    }
}

type BoxedReducer<S, A, E> = Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`]. Cloning shares the underlying reducers.
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: std::sync::Arc<[BoxedReducer<S, A, E>]>,
}

impl<S, A, E> Clone for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    fn clone(&self) -> Self {
        Self {
            reducers: std::sync::Arc::clone(&self.reducers),
        }
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in self.reducers.iter() {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Scopes a reducer to one field of a larger state and to the actions that
/// belong to it.
///
/// - `state_lens` borrows the child state out of the parent state
/// - `extract` returns the child action, or `None` for actions the child does
///   not handle (those pass through untouched)
/// - `embed` lifts actions produced by the child's effects back into the parent
///
/// # Type Parameters
///
/// - `S` / `SubS`: parent and child state
/// - `A` / `SubA`: parent and child action
/// - `E`: the shared environment
pub const fn scope_reducer<S, SubS, A, SubA, E, R>(
    reducer: R,
    state_lens: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
    embed: fn(SubA) -> A,
) -> ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    ScopedReducer {
        reducer,
        state_lens,
        extract,
        embed,
        _phantom: std::marker::PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    reducer: R,
    state_lens: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
    embed: fn(SubA) -> A,
    _phantom: std::marker::PhantomData<fn() -> E>,
}

impl<S, SubS, A, SubA, E, R> Clone for ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            state_lens: self.state_lens,
            extract: self.extract,
            embed: self.embed,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S, SubS, A, SubA, E, R> Reducer for ScopedReducer<S, SubS, A, SubA, E, R>
where
    A: 'static,
    SubA: Send + 'static,
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(sub_action) = (self.extract)(action) else {
            return SmallVec::new();
        };

        let sub_state = (self.state_lens)(state);
        self.reducer
            .reduce(sub_state, sub_action, env)
            .into_iter()
            .map(|effect| effect.map(self.embed))
            .collect()
    }
}

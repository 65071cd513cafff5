//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use endpoint_store_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several actions may be given; they are reduced in order and the effect
/// assertions see the effects of all of them.
///
/// # Example
///
/// ```
/// use endpoint_store_core::slice::{EndpointAction, EndpointsReducer, EndpointsState};
/// use endpoint_store_testing::ReducerTest;
///
/// ReducerTest::new(EndpointsReducer::new())
///     .with_env(())
///     .given_state(EndpointsState::new())
///     .when_action(EndpointAction::RequestStarted {
///         endpoint_name: "events".to_string(),
///         request_url: "https://host/augsburg/de/events".to_string(),
///     })
///     .then_state(|state| {
///         assert!(state.record("events").is_fetching());
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    S: Clone,
    A: Clone,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions to reduce in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, actions, or environment are not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects.extend(self.reducer.reduce(&mut state, action, &env));
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use endpoint_store_core::effect::Effect;

    /// Assert that there are no effects (only `Effect::None`)
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use endpoint_store_core::record::{FetchRecord, Payload};
    use endpoint_store_core::slice::{EndpointAction, EndpointsReducer, EndpointsState};
    use endpoint_store_core::{DateTime, Utc};

    fn date() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    fn started(url: &str) -> EndpointAction {
        EndpointAction::RequestStarted {
            endpoint_name: "events".to_string(),
            request_url: url.to_string(),
        }
    }

    #[test]
    fn test_request_started_marks_fetching() {
        ReducerTest::new(EndpointsReducer::new())
            .with_env(())
            .given_state(EndpointsState::new())
            .when_action(started("https://host/a"))
            .then_state(|state| {
                assert!(state.record("events").is_fetching());
                assert_eq!(state.record("events").request_url(), Some("https://host/a"));
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_request_finished_after_started() {
        let record = FetchRecord::succeeded(Payload::new(vec![1_u8]), "https://host/a", date());
        let expected = record.clone();

        ReducerTest::new(EndpointsReducer::new())
            .with_env(())
            .given_state(EndpointsState::new())
            .when_actions([
                started("https://host/a"),
                EndpointAction::RequestFinished {
                    endpoint_name: "events".to_string(),
                    record,
                },
            ])
            .then_state(move |state| {
                assert_eq!(state.record("events"), expected);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<EndpointAction>(&[Effect::None]);
        assertions::assert_no_effects::<EndpointAction>(&[]);
    }

    #[test]
    fn test_assertions_future_effect() {
        let effects = [Effect::<u8>::None, Effect::Future(Box::pin(async { None }))];
        assertions::assert_has_future_effect(&effects);
        assertions::assert_effects_count(&effects, 2);
    }
}

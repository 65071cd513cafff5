//! The endpoints slice of application state.
//!
//! One [`FetchRecord`] per endpoint name (not per parameter set), mutated
//! only by the two [`EndpointAction`] kinds through [`EndpointsReducer`].
//! Applications keep the slice inside their own state, expose it through
//! [`HasEndpoints`], and lift the reducer with
//! [`scope_reducer`](crate::composition::scope_reducer).

use crate::effect::Effect;
use crate::record::FetchRecord;
use crate::reducer::Reducer;
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Mapping from endpoint name to its fetch record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointsState {
    records: HashMap<String, FetchRecord>,
}

impl EndpointsState {
    /// Empty slice
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `name`, or the implicit initial record if none exists yet.
    #[must_use]
    pub fn record(&self, name: &str) -> FetchRecord {
        self.records.get(name).cloned().unwrap_or_default()
    }

    /// Stored record for `name`, without falling back to the initial record
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FetchRecord> {
        self.records.get(name)
    }

    /// Materialise the initial record for `name` if absent.
    pub fn ensure(&mut self, name: &str) -> &mut FetchRecord {
        self.records.entry(name.to_string()).or_default()
    }

    /// Number of endpoints with a stored record
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read access to the endpoints slice inside a larger state.
pub trait HasEndpoints {
    /// The slice
    fn endpoints(&self) -> &EndpointsState;
}

impl HasEndpoints for EndpointsState {
    fn endpoints(&self) -> &EndpointsState {
        self
    }
}

/// Discriminant of an [`EndpointAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// A request was issued
    RequestStarted,
    /// A request completed, successfully or not
    RequestFinished,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestStarted => f.write_str("REQUEST_STARTED"),
            Self::RequestFinished => f.write_str("REQUEST_FINISHED"),
        }
    }
}

/// The only two actions that touch the endpoints slice.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointAction {
    /// Set `is_fetching` and the in-flight URL; keep data, error and fetch date.
    RequestStarted {
        /// Endpoint being fetched
        endpoint_name: String,
        /// URL of the new request
        request_url: String,
    },
    /// Replace the endpoint's record with a terminal one.
    RequestFinished {
        /// Endpoint that was fetched
        endpoint_name: String,
        /// The terminal record
        record: FetchRecord,
    },
}

impl EndpointAction {
    /// Which of the two kinds this is
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::RequestStarted { .. } => ActionKind::RequestStarted,
            Self::RequestFinished { .. } => ActionKind::RequestFinished,
        }
    }

    /// Endpoint the action is about
    #[must_use]
    pub fn endpoint_name(&self) -> &str {
        match self {
            Self::RequestStarted { endpoint_name, .. }
            | Self::RequestFinished { endpoint_name, .. } => endpoint_name,
        }
    }
}

/// Pure reducer for the endpoints slice. Produces no effects.
///
/// Generic over the environment only so it can be lifted into any store;
/// it never reads it.
pub struct EndpointsReducer<E = ()> {
    _environment: PhantomData<fn() -> E>,
}

impl<E> EndpointsReducer<E> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _environment: PhantomData,
        }
    }
}

impl<E> Clone for EndpointsReducer<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EndpointsReducer<E> {}

impl<E> Default for EndpointsReducer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EndpointsReducer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EndpointsReducer")
    }
}

impl<E> Reducer for EndpointsReducer<E> {
    type State = EndpointsState;
    type Action = EndpointAction;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            EndpointAction::RequestStarted {
                endpoint_name,
                request_url,
            } => {
                let record = state.ensure(&endpoint_name);
                *record = std::mem::take(record).started(request_url);
            },
            EndpointAction::RequestFinished {
                endpoint_name,
                record,
            } => {
                state.records.insert(endpoint_name, record);
            },
        }
        smallvec![Effect::None]
    }
}

//! Fetch records: what the store knows about one endpoint.
//!
//! A record is a plain value. It is created implicitly (all fields empty) the
//! first time an endpoint is looked at and afterwards replaced only through
//! the two endpoint actions:
//!
//! - `RequestStarted` flips `is_fetching` and records the in-flight URL, keeping
//!   the previous `data` / `error` / `fetch_date` visible (stale-while-revalidate).
//! - `RequestFinished` swaps in a terminal record wholesale.

use chrono::{DateTime, Utc};
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// Type-erased output of an endpoint's mapper.
///
/// Endpoints produce different domain types, but the store keeps all records
/// in one map. Equality is identity: two payloads are equal when they share
/// the same allocation, so re-applying a cloned record is a no-op.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Payload {
    /// Wrap a mapped value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the wrapped type, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Share the value as `Arc<T>`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.type_name).finish()
    }
}

/// Whether a request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request in flight
    Idle,
    /// A request was started and has not finished yet
    Fetching,
}

/// What the last finished request left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Never finished a request
    Empty,
    /// Last request succeeded
    Data,
    /// Last request failed
    Error,
}

/// The cached or in-flight state of one endpoint.
///
/// `T` defaults to [`Payload`], the form stored in the slice. Consumers work
/// with `FetchRecord<Arc<T>>` after [`FetchRecord::downcast`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord<T = Payload> {
    is_fetching: bool,
    data: Option<T>,
    error: Option<String>,
    request_url: Option<String>,
    fetch_date: Option<DateTime<Utc>>,
}

impl<T> Default for FetchRecord<T> {
    fn default() -> Self {
        Self {
            is_fetching: false,
            data: None,
            error: None,
            request_url: None,
            fetch_date: None,
        }
    }
}

impl<T> FetchRecord<T> {
    /// Terminal record for a successful fetch.
    #[must_use]
    pub fn succeeded(data: T, request_url: impl Into<String>, fetch_date: DateTime<Utc>) -> Self {
        Self {
            is_fetching: false,
            data: Some(data),
            error: None,
            request_url: Some(request_url.into()),
            fetch_date: Some(fetch_date),
        }
    }

    /// Terminal record for a failed fetch. `data` is always cleared.
    #[must_use]
    pub fn failed(
        error: impl Into<String>,
        request_url: impl Into<String>,
        fetch_date: DateTime<Utc>,
    ) -> Self {
        Self {
            is_fetching: false,
            data: None,
            error: Some(error.into()),
            request_url: Some(request_url.into()),
            fetch_date: Some(fetch_date),
        }
    }

    /// Record a started request, keeping the previous terminal values visible.
    #[must_use]
    pub fn started(mut self, request_url: impl Into<String>) -> Self {
        self.is_fetching = true;
        self.request_url = Some(request_url.into());
        self
    }

    /// Whether a request is outstanding
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    /// Last successfully mapped value
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Message of the last failure
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// URL of the in-flight request, or of the one that produced `data` / `error`
    #[must_use]
    pub fn request_url(&self) -> Option<&str> {
        self.request_url.as_deref()
    }

    /// When the current terminal values were produced
    #[must_use]
    pub const fn fetch_date(&self) -> Option<DateTime<Utc>> {
        self.fetch_date
    }

    /// `Idle` or `Fetching`
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.is_fetching {
            Phase::Fetching
        } else {
            Phase::Idle
        }
    }

    /// `Error` wins over `Data`; a failed record never carries data anyway.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        if self.error.is_some() {
            Outcome::Error
        } else if self.data.is_some() {
            Outcome::Data
        } else {
            Outcome::Empty
        }
    }
}

impl FetchRecord<Payload> {
    /// View the record with its payload typed as `T`.
    ///
    /// Returns `None` when the record holds data of another type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<FetchRecord<Arc<T>>> {
        let data = match &self.data {
            Some(payload) => Some(payload.downcast::<T>()?),
            None => None,
        };
        Some(FetchRecord {
            is_fetching: self.is_fetching,
            data,
            error: self.error.clone(),
            request_url: self.request_url.clone(),
            fetch_date: self.fetch_date,
        })
    }
}

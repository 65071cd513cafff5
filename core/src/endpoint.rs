//! Endpoint descriptors.
//!
//! An [`Endpoint`] is pure configuration for one named remote resource:
//! how to derive the request URL from the application's parameters, how to
//! map the raw JSON into a domain value, and whether a parameter change
//! invalidates what is cached.
//!
//! Descriptors are assembled with [`EndpointBuilder`], which validates the
//! required parts at a single `build()` boundary.
//!
//! ```
//! use endpoint_store_core::endpoint::EndpointBuilder;
//! use serde_json::json;
//!
//! let endpoint = EndpointBuilder::<String>::new("pages")
//!     .with_url_mapper(|language| format!("https://host/{language}/pages"))
//!     .with_mapper(|json| {
//!         json.as_array()
//!             .map(Vec::len)
//!             .ok_or_else(|| "expected an array".to_string())
//!     })
//!     .build()?;
//!
//! assert_eq!(endpoint.url_for(&"de".to_string()), "https://host/de/pages");
//! assert!(endpoint.map_response(json!([1, 2, 3])).is_ok());
//! assert!(!endpoint.should_refetch(&"de".to_string(), &"en".to_string()));
//! # Ok::<(), endpoint_store_core::error::ConfigError>(())
//! ```

use crate::error::{ConfigError, FetchError};
use crate::record::Payload;
use serde_json::Value;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

type UrlMapper<P> = Arc<dyn Fn(&P) -> String + Send + Sync>;
type Mapper = Arc<dyn Fn(Value) -> Result<Payload, String> + Send + Sync>;
type RefetchLogic<P> = Arc<dyn Fn(&P, &P) -> bool + Send + Sync>;

/// Immutable description of one endpoint.
///
/// `P` is the parameter type the application derives from its state (for
/// example the current route's location and language).
pub struct Endpoint<P> {
    name: String,
    url_mapper: UrlMapper<P>,
    mapper: Mapper,
    refetch_logic: RefetchLogic<P>,
    response_override: Option<Value>,
    payload_type: &'static str,
}

impl<P> Endpoint<P> {
    /// Unique key into the registry and the store slice
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request URL for the given parameters.
    #[must_use]
    pub fn url_for(&self, params: &P) -> String {
        (self.url_mapper)(params)
    }

    /// Map a raw response into the endpoint's domain value.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transform`] carrying the mapper's message when the
    /// payload is rejected.
    pub fn map_response(&self, raw: Value) -> Result<Payload, FetchError> {
        (self.mapper)(raw).map_err(FetchError::Transform)
    }

    /// Whether moving from `old` to `new` parameters invalidates the cached record.
    #[must_use]
    pub fn should_refetch(&self, old: &P, new: &P) -> bool {
        (self.refetch_logic)(old, new)
    }

    /// Raw response used instead of the network, if configured
    #[must_use]
    pub const fn response_override(&self) -> Option<&Value> {
        self.response_override.as_ref()
    }

    /// Name of the type produced by the mapper
    #[must_use]
    pub const fn payload_type(&self) -> &'static str {
        self.payload_type
    }
}

impl<P> Clone for Endpoint<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            url_mapper: Arc::clone(&self.url_mapper),
            mapper: Arc::clone(&self.mapper),
            refetch_logic: Arc::clone(&self.refetch_logic),
            response_override: self.response_override.clone(),
            payload_type: self.payload_type,
        }
    }
}

impl<P> fmt::Debug for Endpoint<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("payload_type", &self.payload_type)
            .field("response_override", &self.response_override.is_some())
            .finish_non_exhaustive()
    }
}

/// Fluent, single-use builder for [`Endpoint`].
///
/// `with_url_mapper` and `with_mapper` are required; refetch logic defaults to
/// "never refetch on parameter change".
pub struct EndpointBuilder<P> {
    name: String,
    url_mapper: Option<UrlMapper<P>>,
    mapper: Option<(Mapper, &'static str)>,
    refetch_logic: Option<RefetchLogic<P>>,
    response_override: Option<Value>,
}

impl<P: 'static> EndpointBuilder<P> {
    /// Start building an endpoint called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_mapper: None,
            mapper: None,
            refetch_logic: None,
            response_override: None,
        }
    }

    /// Derive the request URL from the current parameters.
    #[must_use]
    pub fn with_url_mapper<F>(mut self, url_mapper: F) -> Self
    where
        F: Fn(&P) -> String + Send + Sync + 'static,
    {
        self.url_mapper = Some(Arc::new(url_mapper));
        self
    }

    /// Map the raw JSON response into a domain value.
    ///
    /// The mapper's error is kept as the record's error message.
    #[must_use]
    pub fn with_mapper<T, E, F>(mut self, mapper: F) -> Self
    where
        T: Any + Send + Sync,
        E: fmt::Display,
        F: Fn(Value) -> Result<T, E> + Send + Sync + 'static,
    {
        let erased: Mapper =
            Arc::new(move |raw| mapper(raw).map(Payload::new).map_err(|e| e.to_string()));
        self.mapper = Some((erased, type_name::<T>()));
        self
    }

    /// Decide whether a parameter change should trigger a refetch.
    #[must_use]
    pub fn with_refetch_logic<F>(mut self, refetch_logic: F) -> Self
    where
        F: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        self.refetch_logic = Some(Arc::new(refetch_logic));
        self
    }

    /// Skip the network and feed `response` through the mapper instead.
    #[must_use]
    pub fn with_response_override(mut self, response: Value) -> Self {
        self.response_override = Some(response);
        self
    }

    /// Validate and assemble the descriptor.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingName`] if the name is empty
    /// - [`ConfigError::MissingUrlMapper`] if no URL mapper was given
    /// - [`ConfigError::MissingMapper`] if no response mapper was given
    pub fn build(self) -> Result<Endpoint<P>, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        let url_mapper = self.url_mapper.ok_or_else(|| ConfigError::MissingUrlMapper {
            endpoint: self.name.clone(),
        })?;
        let (mapper, payload_type) = self.mapper.ok_or_else(|| ConfigError::MissingMapper {
            endpoint: self.name.clone(),
        })?;

        Ok(Endpoint {
            name: self.name,
            url_mapper,
            mapper,
            refetch_logic: self.refetch_logic.unwrap_or_else(|| Arc::new(|_, _| false)),
            response_override: self.response_override,
            payload_type,
        })
    }
}

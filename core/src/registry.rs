//! Endpoint registry.
//!
//! Built once per application root from every endpoint the application
//! declares, then shared (behind an `Arc`) with every orchestrator. A name
//! missing at lookup time is a wiring mistake, reported as
//! [`ConfigError::UnknownEndpoint`].

use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable `name → Endpoint` lookup.
pub struct EndpointRegistry<P> {
    endpoints: HashMap<String, Arc<Endpoint<P>>>,
}

impl<P> EndpointRegistry<P> {
    /// Build the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateEndpoint`] if two endpoints share a name.
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint<P>>) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();
        for endpoint in endpoints {
            let name = endpoint.name().to_string();
            if map.contains_key(&name) {
                return Err(ConfigError::DuplicateEndpoint(name));
            }
            map.insert(name, Arc::new(endpoint));
        }
        Ok(Self { endpoints: map })
    }

    /// Look up an endpoint by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEndpoint`] if no endpoint has this name.
    pub fn get(&self, name: &str) -> Result<Arc<Endpoint<P>>, ConfigError> {
        self.endpoints
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))
    }

    /// Whether an endpoint with this name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered endpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl<P> std::fmt::Debug for EndpointRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("endpoints", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use crate::endpoint::EndpointBuilder;

    fn endpoint(name: &str) -> Endpoint<()> {
        EndpointBuilder::new(name)
            .with_url_mapper(|_| "https://host/api.json".to_string())
            .with_mapper(|json| Ok::<_, String>(json))
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_by_name() {
        let registry = EndpointRegistry::new([endpoint("events"), endpoint("locations")]).unwrap();

        assert_eq!(registry.get("events").unwrap().name(), "events");
        assert_eq!(registry.names(), vec!["events", "locations"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let registry = EndpointRegistry::new([endpoint("events")]).unwrap();

        let err = registry.get("unregistered").unwrap_err();
        assert_eq!(err, ConfigError::UnknownEndpoint("unregistered".to_string()));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = EndpointRegistry::new([endpoint("events"), endpoint("events")]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateEndpoint("events".to_string()));
    }

    #[test]
    fn empty_registry() {
        let registry = EndpointRegistry::<()>::new([]).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.contains("events"));
    }
}

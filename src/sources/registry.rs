//! Registry for literature retrieval sources.

use std::collections::HashMap;
use std::sync::Arc;

use super::{arxiv::ArxivRetriever, Retriever, SourceError};

/// Registry mapping source ids to retriever instances.
///
/// Lookup order within a run is dictated by the caller's source list, never
/// by the registry's internal map order.
#[derive(Debug, Clone, Default)]
pub struct RetrieverRegistry {
    retrievers: HashMap<String, Arc<dyn Retriever>>,
}

impl RetrieverRegistry {
    /// Create a registry with all built-in sources
    pub fn new() -> Self {
        let mut registry = Self {
            retrievers: HashMap::new(),
        };

        registry.register(Arc::new(ArxivRetriever::new()));

        registry
    }

    /// Create an empty registry (tests register their own retrievers)
    pub fn empty() -> Self {
        Self {
            retrievers: HashMap::new(),
        }
    }

    /// Register a retriever under its own id
    pub fn register(&mut self, retriever: Arc<dyn Retriever>) {
        self.retrievers
            .insert(retriever.id().to_string(), retriever);
    }

    /// Get a retriever by id
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Retriever>> {
        self.retrievers.get(id)
    }

    /// Get a retriever by id, returning an error if not registered
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn Retriever>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::UnknownSource(id.to_string()))
    }

    /// All registered source ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.retrievers.keys().map(|s| s.as_str())
    }

    /// Check if a source is registered
    pub fn has(&self, id: &str) -> bool {
        self.retrievers.contains_key(id)
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.retrievers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.retrievers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockRetriever;

    #[test]
    fn test_registry_defaults() {
        let registry = RetrieverRegistry::new();

        assert!(registry.has("arxiv"));
        assert!(!registry.is_empty());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_get_required_unknown() {
        let registry = RetrieverRegistry::empty();

        let err = registry.get_required("nope").unwrap_err();
        assert!(matches!(err, SourceError::UnknownSource(id) if id == "nope"));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = RetrieverRegistry::empty();
        registry.register(Arc::new(MockRetriever::new()));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_required("mock").unwrap().id(), "mock");
    }
}

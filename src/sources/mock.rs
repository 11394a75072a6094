//! Mock retriever for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{ItemBuilder, ItemSource, LiteratureItem};
use crate::sources::{Retriever, SearchQuery, SourceError};

/// A retriever returning canned responses, with optional forced failure.
#[derive(Debug, Default)]
pub struct MockRetriever {
    items: Mutex<Vec<LiteratureItem>>,
    fail_with: Mutex<Option<String>>,
}

impl MockRetriever {
    /// Create an empty mock retriever
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock retriever returning the given items
    pub fn with_items(items: Vec<LiteratureItem>) -> Self {
        Self {
            items: Mutex::new(items),
            fail_with: Mutex::new(None),
        }
    }

    /// Make every search fail with an API error carrying this message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            fail_with: Mutex::new(Some(message.into())),
        }
    }

    /// Replace the canned items
    pub fn set_items(&self, items: Vec<LiteratureItem>) {
        *self.items.lock().unwrap() = items;
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<LiteratureItem>, SourceError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(SourceError::Api(message));
        }

        let items = self.items.lock().unwrap().clone();
        Ok(items.into_iter().take(query.max_results).collect())
    }
}

/// Build a minimal mock item for tests.
pub fn make_item(id: &str, title: &str) -> LiteratureItem {
    ItemBuilder::new(
        format!("mock:{}", id),
        title,
        format!("http://example.com/{}", id),
        ItemSource::Mock,
    )
    .author("Test Author")
    .abstract_text(format!("Abstract for {}.", title))
    .build()
}

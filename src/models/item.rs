//! Literature item model shared by all pipeline stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The source a literature item was retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    Arxiv,
    Mock,
    #[serde(untagged)]
    Other(String),
}

impl ItemSource {
    /// Returns the source identifier (matches retriever ids)
    pub fn id(&self) -> &str {
        match self {
            ItemSource::Arxiv => "arxiv",
            ItemSource::Mock => "mock",
            ItemSource::Other(s) => s,
        }
    }

    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            ItemSource::Arxiv => "arXiv",
            ItemSource::Mock => "Mock Source",
            ItemSource::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ItemSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One candidate publication, normalized across sources.
///
/// Created by a retriever, possibly removed by the deduplicator, enriched
/// once with full text, then annotated by the analysis stage. Read-only
/// afterwards; `full_text` is never cleared within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureItem {
    /// Globally unique id within a run, source-prefixed (e.g. "arxiv:2301.00001")
    pub id: String,

    /// Paper title
    pub title: String,

    /// Authors in citation order
    pub authors: Vec<String>,

    /// Abstract text, if the source provides one
    pub r#abstract: Option<String>,

    /// Full text, populated by the enrichment stage
    pub full_text: Option<String>,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// Source-native identifier (e.g. the bare arXiv id)
    pub external_id: Option<String>,

    /// Paper page URL
    pub url: String,

    /// Direct PDF URL, if known
    pub pdf_url: Option<String>,

    /// Subject categories/tags
    pub categories: Vec<String>,

    /// Extracted keywords (attached by the analysis stage)
    pub keywords: Vec<String>,

    /// Source where the item was found
    pub source: ItemSource,

    /// Publication date
    pub publication_date: Option<NaiveDate>,

    /// Citation count, if the source reports one
    pub citation_count: Option<u32>,

    /// AI-generated summary (attached by the analysis stage)
    pub summary: Option<String>,
}

impl LiteratureItem {
    /// Create a new item with required fields
    pub fn new(id: String, title: String, url: String, source: ItemSource) -> Self {
        Self {
            id,
            title,
            authors: Vec::new(),
            r#abstract: None,
            full_text: None,
            doi: None,
            external_id: None,
            url,
            pdf_url: None,
            categories: Vec::new(),
            keywords: Vec::new(),
            source,
            publication_date: None,
            citation_count: None,
            summary: None,
        }
    }

    /// First author, if any
    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(|s| s.as_str())
    }

    /// Publication year, if a date is known
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.publication_date.map(|d| d.year())
    }

    /// The text to feed into AI analysis: full text when present, else abstract
    pub fn analysis_text(&self) -> Option<&str> {
        self.full_text
            .as_deref()
            .or(self.r#abstract.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Whether the item has a document that enrichment can fetch
    pub fn has_document(&self) -> bool {
        self.pdf_url.is_some()
    }
}

/// Builder for constructing [`LiteratureItem`] values
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    item: LiteratureItem,
}

impl ItemBuilder {
    /// Create a new builder with required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: ItemSource,
    ) -> Self {
        Self {
            item: LiteratureItem::new(id.into(), title.into(), url.into(), source),
        }
    }

    /// Set authors
    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.item.authors = authors;
        self
    }

    /// Add a single author
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.item.authors.push(author.into());
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.item.r#abstract = Some(text.into());
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.item.doi = Some(doi.into());
        self
    }

    /// Set the source-native id
    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.item.external_id = Some(id.into());
        self
    }

    /// Set PDF URL
    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        self.item.pdf_url = Some(url.into());
        self
    }

    /// Set categories
    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.item.categories = categories;
        self
    }

    /// Set publication date
    pub fn publication_date(mut self, date: NaiveDate) -> Self {
        self.item.publication_date = Some(date);
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: u32) -> Self {
        self.item.citation_count = Some(count);
        self
    }

    /// Build the item
    pub fn build(self) -> LiteratureItem {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_builder() {
        let item = ItemBuilder::new(
            "arxiv:2301.00001",
            "Test Paper",
            "https://arxiv.org/abs/2301.00001",
            ItemSource::Arxiv,
        )
        .author("John Doe")
        .author("Jane Smith")
        .abstract_text("An abstract.")
        .doi("10.1234/test.1")
        .external_id("2301.00001")
        .pdf_url("https://arxiv.org/pdf/2301.00001.pdf")
        .build();

        assert_eq!(item.id, "arxiv:2301.00001");
        assert_eq!(item.first_author(), Some("John Doe"));
        assert_eq!(item.doi.as_deref(), Some("10.1234/test.1"));
        assert!(item.has_document());
    }

    #[test]
    fn test_analysis_text_prefers_full_text() {
        let mut item = ItemBuilder::new("m:1", "T", "http://x", ItemSource::Mock)
            .abstract_text("short abstract")
            .build();
        assert_eq!(item.analysis_text(), Some("short abstract"));

        item.full_text = Some("the whole paper".to_string());
        assert_eq!(item.analysis_text(), Some("the whole paper"));
    }

    #[test]
    fn test_analysis_text_empty() {
        let item = ItemBuilder::new("m:1", "T", "http://x", ItemSource::Mock).build();
        assert_eq!(item.analysis_text(), None);

        let blank = ItemBuilder::new("m:2", "T", "http://x", ItemSource::Mock)
            .abstract_text("   ")
            .build();
        assert_eq!(blank.analysis_text(), None);
    }

    #[test]
    fn test_year() {
        let item = ItemBuilder::new("m:1", "T", "http://x", ItemSource::Mock)
            .publication_date(NaiveDate::from_ymd_opt(2023, 5, 1).unwrap())
            .build();
        assert_eq!(item.year(), Some(2023));
    }
}

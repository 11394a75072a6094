//! Two-stage identity resolution over a combined multi-source item list.
//!
//! Stage one collapses items sharing a strong identifier (DOI, else the
//! source-native external id). Stage two collapses the survivors on a soft
//! key of normalized title plus normalized first author. Both stages keep the
//! first-seen occurrence, where "first-seen" is the retrieval order of the
//! input sequence; the output preserves that order so downstream truncation
//! is deterministic.

use std::collections::HashSet;

use crate::models::LiteratureItem;

/// Sentinel soft-pass author key for items without authors. Distinct
/// anonymous-author items collide on it; inherited behavior, kept as-is.
const UNKNOWN_AUTHOR: &str = "unknown_author";

/// Collapse a combined item list to unique publications.
///
/// Runs the strong-identity pass, then the soft-identity pass. Purely local
/// computation; never suspends. Idempotent: applying it to its own output
/// returns the same sequence.
pub fn deduplicate_items(items: Vec<LiteratureItem>) -> Vec<LiteratureItem> {
    soft_identity_pass(strong_identity_pass(items))
}

/// Stage one: collapse on case-normalized DOI, else prefix-stripped
/// external id. Items with neither identifier pass through unconditionally.
pub fn strong_identity_pass(items: Vec<LiteratureItem>) -> Vec<LiteratureItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        match strong_key(&item) {
            Some(key) => {
                if seen.insert(key) {
                    kept.push(item);
                } else {
                    tracing::debug!(id = %item.id, title = %item.title, "dropped by strong-identity pass");
                }
            }
            None => kept.push(item),
        }
    }

    kept
}

/// Stage two: collapse on (normalized title, normalized first author).
pub fn soft_identity_pass(items: Vec<LiteratureItem>) -> Vec<LiteratureItem> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        let key = soft_key(&item);
        if seen.insert(key) {
            kept.push(item);
        } else {
            tracing::debug!(id = %item.id, title = %item.title, "dropped by soft-identity pass");
        }
    }

    kept
}

fn strong_key(item: &LiteratureItem) -> Option<String> {
    if let Some(doi) = item.doi.as_deref().filter(|d| !d.trim().is_empty()) {
        return Some(format!("doi:{}", doi.trim().to_lowercase()));
    }
    if let Some(ext) = item.external_id.as_deref().filter(|e| !e.trim().is_empty()) {
        return Some(format!("ext:{}", normalize_external_id(ext)));
    }
    None
}

/// Case-normalize a source-native id and strip a source prefix so the same
/// arXiv id retrieved from two sources collides.
fn normalize_external_id(id: &str) -> String {
    let id = id.trim().to_lowercase();
    match id.split_once(':') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => id,
    }
}

fn soft_key(item: &LiteratureItem) -> (String, String) {
    let author = item
        .first_author()
        .map(normalize_author)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    (normalize_title(&item.title), author)
}

/// Lowercase and keep only alphanumerics and spaces, collapsing whitespace
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_author(author: &str) -> String {
    author.trim().to_lowercase()
}

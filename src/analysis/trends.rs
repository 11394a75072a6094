//! Trend analysis over a processed item set.
//!
//! All aggregations are local and synchronous; the async entry points only
//! add optional LLM insight paragraphs on top. An LLM failure degrades to
//! the local numbers, it never fails the analysis.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Datelike;
use serde::Serialize;

use crate::llm::LlmGateway;
use crate::models::LiteratureItem;

/// An item counts as "recent" when published in the last N years
const EMERGING_WINDOW_YEARS: i32 = 3;

/// Methodology phrases counted verbatim in item text
const METHODOLOGY_TERMS: &[&str] = &[
    "machine learning",
    "deep learning",
    "neural network",
    "cnn",
    "rnn",
    "lstm",
    "random forest",
    "svm",
    "regression",
    "classification",
    "clustering",
    "survey",
    "experiment",
    "case study",
    "simulation",
    "modeling",
    "dataset",
    "benchmark",
    "evaluation",
    "validation",
    "cross-validation",
    "supervised",
    "unsupervised",
    "reinforcement learning",
    "semi-supervised",
    "transfer learning",
    "meta-learning",
    "few-shot",
    "zero-shot",
];

/// Publication activity over time
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemporalTrends {
    /// Papers per publication year, ordered
    pub yearly_counts: BTreeMap<i32, usize>,
    /// Mean year-over-year growth in percent
    pub average_growth_rate: f64,
    /// Growth from the first to the last year in percent
    pub total_growth: f64,
    /// Optional LLM paragraph over the yearly numbers
    pub ai_insights: Option<String>,
}

/// Keyword frequency and co-occurrence
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordTrends {
    /// Most frequent keywords with counts, descending
    pub top_keywords: Vec<(String, usize)>,
    /// Most frequent keyword pairs appearing on the same item
    pub cooccurrence: Vec<((String, String), usize)>,
    pub total_unique_keywords: usize,
}

/// Author productivity and team structure
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollaborationPatterns {
    pub most_productive_authors: Vec<(String, usize)>,
    pub frequent_collaborations: Vec<((String, String), usize)>,
    pub average_team_size: f64,
    pub total_unique_authors: usize,
}

/// Methodology term counts plus an optional LLM analysis
#[derive(Debug, Clone, Default, Serialize)]
pub struct MethodologyTrends {
    pub methodology_keywords: Vec<(String, usize)>,
    pub ai_analysis: Option<String>,
}

/// Recently prominent keywords and topics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmergingTopics {
    pub emerging_keywords: Vec<String>,
    pub recent_item_count: usize,
    pub analysis_period: String,
    pub ai_analysis: Option<String>,
}

/// Computes trend aggregates, optionally decorated with LLM insights.
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    gateway: Arc<LlmGateway>,
}

impl TrendAnalyzer {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Publication counts and growth over time
    pub async fn temporal_trends(&self, items: &[LiteratureItem]) -> TemporalTrends {
        let mut trends = compute_temporal(items);

        if trends.yearly_counts.len() > 1 {
            let description = trends
                .yearly_counts
                .iter()
                .map(|(year, count)| format!("Year {}: {} papers.", year, count))
                .collect::<Vec<_>>()
                .join("\n");

            let system_prompt = "You are a research trend analyst. Analyze the temporal \
                                 patterns in publication data and keyword evolution. Identify \
                                 growth trends, emerging themes, and shifts in research focus \
                                 over time.";
            let user_prompt = format!(
                "Analyze these yearly publication trends and identify key patterns:\n\n{}",
                description
            );

            match self.gateway.generate(system_prompt, &user_prompt, 0.4).await {
                Ok(insights) if !insights.is_empty() => trends.ai_insights = Some(insights),
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "temporal insight generation failed"),
            }
        }

        trends
    }

    /// Keyword frequency and co-occurrence, fully local
    pub fn keyword_trends(&self, items: &[LiteratureItem]) -> KeywordTrends {
        compute_keyword_trends(items)
    }

    /// Author productivity and collaboration, fully local
    pub fn collaboration_patterns(&self, items: &[LiteratureItem]) -> CollaborationPatterns {
        compute_collaboration(items)
    }

    /// Methodology term table plus optional LLM analysis
    pub async fn methodology_trends(&self, items: &[LiteratureItem]) -> MethodologyTrends {
        let texts: Vec<String> = items
            .iter()
            .filter_map(|item| item.analysis_text())
            .map(|t| t.chars().take(1000).collect())
            .collect();

        if texts.is_empty() {
            return MethodologyTrends::default();
        }

        let mut trends = MethodologyTrends {
            methodology_keywords: count_methodology_terms(&texts),
            ai_analysis: None,
        };

        let combined: Vec<&str> = texts.iter().take(10).map(|s| s.as_str()).collect();
        let combined = combined.join("\n\n---\n\n");

        let system_prompt = "You are a methodology expert. Analyze research methodologies, \
                             experimental designs, and analytical approaches used in academic \
                             papers. Identify common patterns, emerging methods, and \
                             methodological trends.";
        let user_prompt = format!(
            "Analyze the methodological approaches in these research abstracts and identify \
             key trends:\n\n{}",
            combined
        );

        match self.gateway.generate(system_prompt, &user_prompt, 0.4).await {
            Ok(analysis) if !analysis.is_empty() => trends.ai_analysis = Some(analysis),
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "methodology analysis failed"),
        }

        trends
    }

    /// Recently prominent keywords plus optional LLM topic analysis
    pub async fn emerging_topics(&self, items: &[LiteratureItem]) -> EmergingTopics {
        let current_year = chrono::Utc::now().year();
        let min_year = current_year - EMERGING_WINDOW_YEARS;

        let recent: Vec<&LiteratureItem> = items
            .iter()
            .filter(|item| item.year().is_some_and(|y| y >= min_year))
            .collect();

        if recent.is_empty() {
            return EmergingTopics::default();
        }

        let mut topics = EmergingTopics {
            emerging_keywords: compute_keyword_emergence(items, min_year),
            recent_item_count: recent.len(),
            analysis_period: format!("{}-{}", min_year, current_year),
            ai_analysis: None,
        };

        let abstracts: Vec<&str> = recent
            .iter()
            .filter_map(|item| item.r#abstract.as_deref())
            .take(8)
            .collect();

        if !abstracts.is_empty() {
            let combined = abstracts.join("\n\n---\n\n");
            let system_prompt = "You are a research trend analyst specializing in identifying \
                                 emerging topics and novel research directions. Focus on new \
                                 concepts, innovative applications, and evolving research areas.";
            let user_prompt = format!(
                "Based on these recent research abstracts from {} onwards, identify emerging \
                 topics and novel research directions:\n\n{}",
                min_year, combined
            );

            match self.gateway.generate(system_prompt, &user_prompt, 0.5).await {
                Ok(analysis) if !analysis.is_empty() => topics.ai_analysis = Some(analysis),
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "emerging topic analysis failed"),
            }
        }

        topics
    }
}

fn compute_temporal(items: &[LiteratureItem]) -> TemporalTrends {
    let mut yearly_counts: BTreeMap<i32, usize> = BTreeMap::new();
    for item in items {
        if let Some(year) = item.year() {
            *yearly_counts.entry(year).or_default() += 1;
        }
    }

    let counts: Vec<usize> = yearly_counts.values().copied().collect();
    let mut growth_rates = Vec::new();
    for pair in counts.windows(2) {
        if pair[0] > 0 {
            growth_rates.push((pair[1] as f64 - pair[0] as f64) / pair[0] as f64 * 100.0);
        }
    }

    let average_growth_rate = if growth_rates.is_empty() {
        0.0
    } else {
        growth_rates.iter().sum::<f64>() / growth_rates.len() as f64
    };

    let total_growth = match (counts.first(), counts.last()) {
        (Some(&first), Some(&last)) if first > 0 && counts.len() > 1 => {
            (last as f64 - first as f64) / first as f64 * 100.0
        }
        _ => 0.0,
    };

    TemporalTrends {
        yearly_counts,
        average_growth_rate,
        total_growth,
        ai_insights: None,
    }
}

fn compute_keyword_trends(items: &[LiteratureItem]) -> KeywordTrends {
    let mut frequency: HashMap<String, usize> = HashMap::new();
    let mut cooccurrence: HashMap<(String, String), usize> = HashMap::new();

    for item in items {
        let keywords: Vec<String> = item
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        for keyword in &keywords {
            *frequency.entry(keyword.clone()).or_default() += 1;
        }

        for (i, kw1) in keywords.iter().enumerate() {
            for kw2 in keywords.iter().skip(i + 1) {
                if kw1 == kw2 {
                    continue;
                }
                let pair = if kw1 < kw2 {
                    (kw1.clone(), kw2.clone())
                } else {
                    (kw2.clone(), kw1.clone())
                };
                *cooccurrence.entry(pair).or_default() += 1;
            }
        }
    }

    let total_unique_keywords = frequency.len();
    let top_keywords = top_n(frequency, 20);

    let mut pairs: Vec<((String, String), usize)> = cooccurrence.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.truncate(15);

    KeywordTrends {
        top_keywords,
        cooccurrence: pairs,
        total_unique_keywords,
    }
}

fn compute_collaboration(items: &[LiteratureItem]) -> CollaborationPatterns {
    let mut author_counts: HashMap<String, usize> = HashMap::new();
    let mut collaborations: HashMap<(String, String), usize> = HashMap::new();
    let mut team_sizes = Vec::new();

    for item in items {
        let authors: Vec<String> = item
            .authors
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            continue;
        }

        team_sizes.push(authors.len());

        for author in &authors {
            *author_counts.entry(author.clone()).or_default() += 1;
        }

        for (i, a1) in authors.iter().enumerate() {
            for a2 in authors.iter().skip(i + 1) {
                if a1 == a2 {
                    continue;
                }
                let pair = if a1 < a2 {
                    (a1.clone(), a2.clone())
                } else {
                    (a2.clone(), a1.clone())
                };
                *collaborations.entry(pair).or_default() += 1;
            }
        }
    }

    let average_team_size = if team_sizes.is_empty() {
        0.0
    } else {
        team_sizes.iter().sum::<usize>() as f64 / team_sizes.len() as f64
    };

    let total_unique_authors = author_counts.len();
    let most_productive_authors = top_n(author_counts, 15);

    let mut pairs: Vec<((String, String), usize)> = collaborations.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.truncate(10);

    CollaborationPatterns {
        most_productive_authors,
        frequent_collaborations: pairs,
        average_team_size,
        total_unique_authors,
    }
}

fn count_methodology_terms(texts: &[String]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for text in texts {
        let lower = text.to_lowercase();
        for term in METHODOLOGY_TERMS {
            if lower.contains(term) {
                *counts.entry(term.to_string()).or_default() += 1;
            }
        }
    }

    let mut ranked = top_n(counts, 15);
    ranked.retain(|(_, count)| *count > 0);
    ranked
}

/// Keywords at least twice as frequent on recent items as on older ones
fn compute_keyword_emergence(items: &[LiteratureItem], min_year: i32) -> Vec<String> {
    let mut recent: HashMap<String, usize> = HashMap::new();
    let mut older: HashMap<String, usize> = HashMap::new();

    for item in items {
        let Some(year) = item.year() else { continue };
        let bucket = if year >= min_year {
            &mut recent
        } else {
            &mut older
        };
        for keyword in &item.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() {
                *bucket.entry(keyword).or_default() += 1;
            }
        }
    }

    let mut emerging: Vec<(String, usize)> = recent
        .into_iter()
        .filter(|(keyword, count)| {
            let older_count = older.get(keyword).copied().unwrap_or(0);
            *count >= 2 && (older_count == 0 || *count > older_count * 2)
        })
        .collect();

    emerging.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    emerging.into_iter().take(15).map(|(k, _)| k).collect()
}

/// Descending by count, ties alphabetical for determinism
fn top_n(counts: HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

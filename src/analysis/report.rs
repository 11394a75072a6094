//! Literature review report generation.
//!
//! Eight section tasks run concurrently; any section failing or coming back
//! empty is simply absent from the compiled document. Compilation itself is
//! pure and synchronous.

use std::sync::Arc;

use crate::analysis::summarizer::Summarizer;
use crate::analysis::trends::{
    CollaborationPatterns, EmergingTopics, KeywordTrends, MethodologyTrends, TemporalTrends,
    TrendAnalyzer,
};
use crate::llm::LlmGateway;
use crate::models::LiteratureItem;

const NO_ABSTRACTS_NOTICE: &str = "No abstracts available for executive summary generation.";

/// All sections of one report, each independently optional.
#[derive(Debug, Default)]
pub struct ReportSections {
    pub executive_summary: Option<String>,
    pub literature_overview: Option<String>,
    pub temporal: Option<TemporalTrends>,
    pub keywords: Option<KeywordTrends>,
    pub methodology: Option<MethodologyTrends>,
    pub collaboration: Option<CollaborationPatterns>,
    pub emerging: Option<EmergingTopics>,
    pub key_findings: Vec<String>,
}

/// Builds the final markdown report for a run.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    gateway: Arc<LlmGateway>,
    summarizer: Summarizer,
    trends: TrendAnalyzer,
}

impl ReportGenerator {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self {
            summarizer: Summarizer::new(Arc::clone(&gateway)),
            trends: TrendAnalyzer::new(Arc::clone(&gateway)),
            gateway,
        }
    }

    /// Generate the full report. Always returns a document; sections that
    /// failed are left out.
    pub async fn generate(&self, items: &[LiteratureItem], topic: &str) -> String {
        let sections = self.build_sections(items, topic).await;
        compile_markdown(&sections, topic, items.len())
    }

    /// Run all section tasks concurrently
    pub async fn build_sections(&self, items: &[LiteratureItem], topic: &str) -> ReportSections {
        let analysis_texts: Vec<String> = items
            .iter()
            .filter_map(|item| item.analysis_text())
            .map(|t| t.chars().take(1000).collect())
            .collect();

        let (
            executive_summary,
            literature_overview,
            temporal,
            keywords,
            methodology,
            collaboration,
            emerging,
            key_findings,
        ) = tokio::join!(
            self.executive_summary(items, topic),
            self.literature_overview(items),
            self.trends.temporal_trends(items),
            async { self.trends.keyword_trends(items) },
            self.trends.methodology_trends(items),
            async { self.trends.collaboration_patterns(items) },
            self.trends.emerging_topics(items),
            self.summarizer.key_findings(&analysis_texts),
        );

        let key_findings = key_findings.unwrap_or_else(|err| {
            tracing::warn!(%err, "key findings generation failed");
            Vec::new()
        });

        ReportSections {
            executive_summary,
            literature_overview,
            temporal: Some(temporal),
            keywords: Some(keywords),
            methodology: Some(methodology),
            collaboration: Some(collaboration),
            emerging: Some(emerging),
            key_findings,
        }
    }

    async fn executive_summary(&self, items: &[LiteratureItem], topic: &str) -> Option<String> {
        let abstracts: Vec<&str> = items
            .iter()
            .filter_map(|item| item.r#abstract.as_deref())
            .take(10)
            .collect();

        if abstracts.is_empty() {
            return Some(NO_ABSTRACTS_NOTICE.to_string());
        }

        let combined = abstracts.join("\n\n---\n\n");
        let system_prompt = "You are an expert research analyst creating an executive summary \
                             for a literature review. Provide a high-level overview that \
                             captures the essence of the research domain, key themes, and \
                             overall insights.";
        let user_prompt = format!(
            "Create an executive summary for a literature review on '{}' based on {} research \
             papers. Highlight the main research themes, significant findings, and the current \
             state of the field:\n\n{}",
            topic,
            items.len(),
            combined
        );

        match self.gateway.generate(system_prompt, &user_prompt, 0.4).await {
            Ok(summary) if !summary.is_empty() => Some(summary),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%err, "executive summary generation failed");
                None
            }
        }
    }

    async fn literature_overview(&self, items: &[LiteratureItem]) -> Option<String> {
        if items.is_empty() {
            return None;
        }

        let years: Vec<i32> = items.iter().filter_map(|item| item.year()).collect();
        let year_range = match (years.iter().min(), years.iter().max()) {
            (Some(min), Some(max)) => format!("{}-{}", min, max),
            _ => "Unknown".to_string(),
        };

        let unique_authors: std::collections::HashSet<&str> = items
            .iter()
            .flat_map(|item| item.authors.iter())
            .map(|a| a.as_str())
            .collect();

        let mut parts = vec![
            format!(
                "This literature review encompasses {} research papers published between {}.",
                items.len(),
                year_range
            ),
            format!(
                "The analysis includes work from {} unique authors across various venues and \
                 journals.",
                unique_authors.len()
            ),
        ];

        let sample: Vec<&str> = items
            .iter()
            .take(5)
            .filter_map(|item| item.r#abstract.as_deref())
            .collect();

        if !sample.is_empty() {
            let system_prompt = "You are a research analyst. Based on the provided sample of \
                                 research abstracts, describe the scope and nature of the \
                                 research domain, methodological approaches, and key research \
                                 directions represented in this literature collection.";
            let user_prompt = format!(
                "Based on these sample abstracts, provide an overview of the research domain \
                 and methodological approaches:\n\n{}",
                sample.join("\n\n")
            );

            match self.gateway.generate(system_prompt, &user_prompt, 0.3).await {
                Ok(overview) if !overview.is_empty() => parts.push(overview),
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "literature overview generation failed"),
            }
        }

        Some(parts.join("\n\n"))
    }
}

/// Compile section contents into one markdown document
pub fn compile_markdown(sections: &ReportSections, topic: &str, item_count: usize) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
    let mut parts: Vec<String> = vec![
        format!("# Literature Review: {}", topic),
        String::new(),
        format!("**Generated on:** {}", now),
        format!("**Total Papers Analyzed:** {}", item_count),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    if let Some(summary) = &sections.executive_summary {
        push_text_section(&mut parts, "Executive Summary", summary);
    }
    if let Some(overview) = &sections.literature_overview {
        push_text_section(&mut parts, "Literature Overview", overview);
    }

    if let Some(temporal) = &sections.temporal {
        if !temporal.yearly_counts.is_empty() {
            parts.push("## Temporal Analysis".to_string());
            parts.push(String::new());
            parts.push("### Publication Trends".to_string());
            parts.push(String::new());
            parts.push("**Publications by Year:**".to_string());
            for (year, count) in &temporal.yearly_counts {
                parts.push(format!("- {}: {} papers", year, count));
            }
            parts.push(String::new());

            if let Some(insights) = &temporal.ai_insights {
                parts.push("### Trend Insights".to_string());
                parts.push(String::new());
                parts.push(insights.clone());
                parts.push(String::new());
            }
            parts.push("---".to_string());
            parts.push(String::new());
        }
    }

    if let Some(keywords) = &sections.keywords {
        if !keywords.top_keywords.is_empty() {
            parts.push("## Keyword Analysis".to_string());
            parts.push(String::new());
            parts.push("### Most Frequent Keywords".to_string());
            parts.push(String::new());
            for (i, (keyword, count)) in keywords.top_keywords.iter().take(10).enumerate() {
                parts.push(format!("{}. **{}** ({} occurrences)", i + 1, keyword, count));
            }
            parts.push(String::new());

            if !keywords.cooccurrence.is_empty() {
                parts.push("### Frequently Co-occurring Keywords".to_string());
                parts.push(String::new());
                for (i, ((kw1, kw2), count)) in keywords.cooccurrence.iter().take(5).enumerate() {
                    parts.push(format!("{}. {} + {} ({} times)", i + 1, kw1, kw2, count));
                }
                parts.push(String::new());
            }
            parts.push("---".to_string());
            parts.push(String::new());
        }
    }

    if !sections.key_findings.is_empty() {
        parts.push("## Key Findings".to_string());
        parts.push(String::new());
        for (i, finding) in sections.key_findings.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, finding));
        }
        parts.push(String::new());
        parts.push("---".to_string());
        parts.push(String::new());
    }

    if let Some(methodology) = &sections.methodology {
        if let Some(analysis) = &methodology.ai_analysis {
            push_text_section(&mut parts, "Methodological Trends", analysis);
        }
    }

    if let Some(emerging) = &sections.emerging {
        if let Some(analysis) = &emerging.ai_analysis {
            push_text_section(&mut parts, "Emerging Topics and Future Directions", analysis);
        }
    }

    if let Some(collab) = &sections.collaboration {
        if collab.total_unique_authors > 0 {
            parts.push("## Collaboration Patterns".to_string());
            parts.push(String::new());
            parts.push(format!(
                "**Total Unique Authors:** {}",
                collab.total_unique_authors
            ));
            parts.push(format!(
                "**Average Team Size:** {:.2} authors per paper",
                collab.average_team_size
            ));
            parts.push(String::new());

            if !collab.most_productive_authors.is_empty() {
                parts.push("### Most Productive Authors".to_string());
                parts.push(String::new());
                for (i, (author, count)) in
                    collab.most_productive_authors.iter().take(5).enumerate()
                {
                    parts.push(format!("{}. {} ({} papers)", i + 1, author, count));
                }
                parts.push(String::new());
            }
            parts.push("---".to_string());
            parts.push(String::new());
        }
    }

    parts.push("## Report Generation Details".to_string());
    parts.push(String::new());
    parts.push(format!("- **Analysis Date:** {}", now));
    parts.push(format!("- **Papers Analyzed:** {}", item_count));
    parts.push(format!("- **Topic:** {}", topic));
    parts.push(String::new());

    parts.join("\n")
}

fn push_text_section(parts: &mut Vec<String>, title: &str, body: &str) {
    parts.push(format!("## {}", title));
    parts.push(String::new());
    parts.push(body.to_string());
    parts.push(String::new());
    parts.push("---".to_string());
    parts.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use crate::sources::mock::make_item;
    use chrono::NaiveDate;

    fn mock_generator() -> ReportGenerator {
        let gateway = LlmGateway::new(Arc::new(MockProvider::new()));
        ReportGenerator::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_generate_contains_all_local_sections() {
        let mut items = vec![make_item("1", "First Paper"), make_item("2", "Second Paper")];
        for (i, item) in items.iter_mut().enumerate() {
            item.publication_date = NaiveDate::from_ymd_opt(2022 + i as i32, 1, 1);
            item.keywords = vec!["deep learning".to_string(), "vision".to_string()];
        }

        let report = mock_generator().generate(&items, "deep learning").await;

        assert!(report.starts_with("# Literature Review: deep learning"));
        assert!(report.contains("**Total Papers Analyzed:** 2"));
        assert!(report.contains("## Temporal Analysis"));
        assert!(report.contains("## Keyword Analysis"));
        assert!(report.contains("**deep learning** (2 occurrences)"));
        assert!(report.contains("## Collaboration Patterns"));
        assert!(report.contains("## Report Generation Details"));
    }

    #[tokio::test]
    async fn test_generate_without_abstracts_notes_it() {
        let mut item = make_item("1", "Bare Paper");
        item.r#abstract = None;
        item.authors.clear();

        let report = mock_generator().generate(&[item], "some topic").await;
        assert!(report.contains(NO_ABSTRACTS_NOTICE));
    }

    #[test]
    fn test_compile_markdown_empty_sections() {
        let report = compile_markdown(&ReportSections::default(), "topic", 0);
        assert!(report.contains("# Literature Review: topic"));
        assert!(!report.contains("## Executive Summary"));
        assert!(report.contains("## Report Generation Details"));
    }
}

//! LLM-backed summarization.

use std::sync::Arc;

use crate::llm::{LlmError, LlmGateway};

/// Placeholder returned when the LLM produces a completion with no content
const EMPTY_SUMMARY_NOTICE: &str = "Summary generation resulted in empty content.";

/// How many texts feed a combined key-findings request
const KEY_FINDINGS_INPUT_LIMIT: usize = 10;
/// Cap on parsed findings
const KEY_FINDINGS_MAX: usize = 8;

/// The flavor of summary to generate; selects the prompt pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryType {
    /// A few plain sentences
    General,
    /// Bullet-style findings, used when full text is available
    KeyFindings,
    /// Tightened abstract, used when only the abstract is available
    AbstractEnhancement,
}

impl SummaryType {
    fn system_prompt(&self) -> &'static str {
        match self {
            SummaryType::General => {
                "You are an expert academic assistant specializing in concise and \
                 informative text summarization."
            }
            SummaryType::KeyFindings => {
                "You are an expert research analyst. Your task is to extract and \
                 summarize the key findings from the provided text."
            }
            SummaryType::AbstractEnhancement => {
                "You are an AI assistant that refines and enhances academic abstracts \
                 to be more impactful and clear, focusing on core contributions and \
                 significance."
            }
        }
    }

    fn user_prompt(&self, text: &str) -> String {
        match self {
            SummaryType::General => {
                format!("Please summarize the following text in a few sentences: \n\n{}", text)
            }
            SummaryType::KeyFindings => format!(
                "Identify and summarize the key findings from this text in 2-4 bullet \
                 points or a short paragraph:\n\n{}",
                text
            ),
            SummaryType::AbstractEnhancement => format!(
                "Enhance the following abstract. Make it concise (2-3 sentences), \
                 clear, and highlight its core contributions and significance. \
                 Abstract:\n\n{}",
                text
            ),
        }
    }

    fn temperature(&self) -> f32 {
        match self {
            SummaryType::General => 0.5,
            SummaryType::KeyFindings => 0.3,
            SummaryType::AbstractEnhancement => 0.3,
        }
    }
}

/// Generates per-item and cross-item summaries through the gateway.
#[derive(Debug, Clone)]
pub struct Summarizer {
    gateway: Arc<LlmGateway>,
}

impl Summarizer {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Summarize one text. Empty input returns an empty summary without an
    /// LLM round-trip.
    pub async fn summarize(
        &self,
        text: &str,
        summary_type: SummaryType,
    ) -> Result<String, LlmError> {
        if text.trim().is_empty() {
            tracing::warn!("attempted to summarize empty text");
            return Ok(String::new());
        }

        let summary = self
            .gateway
            .generate(
                summary_type.system_prompt(),
                &summary_type.user_prompt(text),
                summary_type.temperature(),
            )
            .await?;

        if summary.is_empty() {
            tracing::warn!("LLM returned an empty summary");
            return Ok(EMPTY_SUMMARY_NOTICE.to_string());
        }

        Ok(summary)
    }

    /// Extract key findings across several texts as a cleaned list.
    ///
    /// The LLM is asked for a numbered list; lines that do not look like
    /// numbered entries are dropped.
    pub async fn key_findings(&self, texts: &[String]) -> Result<Vec<String>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let combined: Vec<&str> = texts
            .iter()
            .take(KEY_FINDINGS_INPUT_LIMIT)
            .map(|s| s.as_str())
            .collect();
        let combined = combined.join("\n\n---\n\n");

        let system_prompt = "You are an expert research analyst. Extract the key findings \
                             and insights from the provided research texts. Return 5-8 key \
                             findings as a numbered list.";
        let user_prompt = format!("Extract key findings from these research texts:\n\n{}", combined);

        let response = self.gateway.generate(system_prompt, &user_prompt, 0.3).await?;

        Ok(parse_numbered_list(&response))
    }

    /// Summarize the methodological approaches across abstracts
    pub async fn methodology_summary(&self, abstracts: &[String]) -> Result<String, LlmError> {
        if abstracts.is_empty() {
            return Ok(String::new());
        }

        let combined: Vec<&str> = abstracts.iter().take(8).map(|s| s.as_str()).collect();
        let combined = combined.join("\n\n---\n\n");

        let system_prompt = "You are a research methodology expert. Analyze the research \
                             methodologies described in these abstracts and provide a \
                             comprehensive summary of the methodological approaches used in \
                             this research area.";
        let user_prompt = format!(
            "Summarize the research methodologies described in these abstracts:\n\n{}",
            combined
        );

        self.gateway.generate(system_prompt, &user_prompt, 0.3).await
    }
}

/// Parse `N. finding` lines out of an LLM response
fn parse_numbered_list(response: &str) -> Vec<String> {
    let mut findings = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        let Some((prefix, rest)) = line.split_once('.') else {
            continue;
        };
        if prefix.chars().all(|c| c.is_ascii_digit()) && !prefix.is_empty() {
            let finding = rest.trim();
            if !finding.is_empty() {
                findings.push(finding.to_string());
            }
        }
        if findings.len() == KEY_FINDINGS_MAX {
            break;
        }
    }

    findings
}

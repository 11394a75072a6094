//! Keyword extraction.
//!
//! Pure and synchronous: frequency-based unigram/bigram scoring with a
//! stopword filter and a preference for multi-word and research-flavored
//! terms. Never fails; unusable input yields an empty list.

use std::collections::HashMap;

/// Common English stopwords, enough for abstract-sized inputs
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "being", "between", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "having", "here", "how", "if", "in", "into", "is", "it", "its", "itself", "just",
    "may", "more", "most", "much", "must", "new", "no", "nor", "not", "of", "off", "on", "once",
    "one", "only", "or", "other", "our", "out", "over", "own", "paper", "propose", "proposed",
    "results", "same", "should", "show", "shows", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "two", "under", "until", "up", "use", "used", "using", "very", "was", "we", "well", "were",
    "what", "when", "where", "which", "while", "who", "will", "with", "within", "would",
];

/// Single words kept even without a multi-word context
const RESEARCH_INDICATORS: &[&str] = &[
    "algorithm",
    "model",
    "method",
    "approach",
    "framework",
    "system",
    "analysis",
    "evaluation",
    "experiment",
    "study",
    "research",
    "technique",
    "strategy",
    "mechanism",
    "process",
    "procedure",
    "optimization",
    "performance",
    "accuracy",
    "efficiency",
    "neural",
    "machine",
    "learning",
    "deep",
    "artificial",
    "intelligence",
];

const MIN_TOKEN_LEN: usize = 3;

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

fn is_research_term(word: &str) -> bool {
    RESEARCH_INDICATORS
        .iter()
        .any(|indicator| word.contains(indicator))
}

/// Tokenize into lowercase words, keeping internal hyphens
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| t.len() >= MIN_TOKEN_LEN && t.chars().any(|c| c.is_alphabetic()))
        .map(|t| t.to_string())
        .collect()
}

/// Extract up to `max_keywords` keywords from free text.
///
/// Bigrams of content words score double, so multi-word technical terms beat
/// their constituents. Ties resolve to first appearance, keeping output
/// deterministic for identical input.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    if text.trim().is_empty() || max_keywords == 0 {
        return Vec::new();
    }

    let tokens = tokenize(text);

    // (term -> (count, first position)); content words only
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut position = 0usize;

    for window in tokens.windows(2) {
        let (first, second) = (&window[0], &window[1]);
        if !is_stopword(first) && !is_stopword(second) {
            let bigram = format!("{} {}", first, second);
            let entry = counts.entry(bigram).or_insert((0, position));
            entry.0 += 2;
        }
        position += 1;
    }

    for (pos, token) in tokens.iter().enumerate() {
        if is_stopword(token) {
            continue;
        }
        // Bare single words only count when research-flavored or hyphenated
        if !is_research_term(token) && !token.contains('-') {
            continue;
        }
        let entry = counts.entry(token.clone()).or_insert((0, pos));
        entry.0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count > 1)
        .map(|(term, (count, first))| (term, count, first))
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(max_keywords)
        .map(|(term, _, _)| term)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(extract_keywords("", 10).is_empty());
        assert!(extract_keywords("   ", 10).is_empty());
        assert!(extract_keywords("some text", 0).is_empty());
    }

    #[test]
    fn test_bigrams_beat_unigrams() {
        let text = "Deep learning models improve deep learning benchmarks. \
                    Deep learning is applied to vision.";
        let keywords = extract_keywords(text, 5);

        assert_eq!(keywords.first().map(|s| s.as_str()), Some("deep learning"));
    }

    #[test]
    fn test_stopwords_never_appear() {
        let text = "the model and the model with the model for analysis and analysis";
        let keywords = extract_keywords(text, 10);

        for keyword in &keywords {
            assert!(!keyword.split(' ').any(is_stopword), "found stopword in {:?}", keyword);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "neural network training with neural network evaluation \
                    of transformer models and transformer models";
        assert_eq!(extract_keywords(text, 8), extract_keywords(text, 8));
    }

    #[test]
    fn test_max_keywords_respected() {
        let text = "machine learning deep learning neural network transfer learning \
                    machine learning deep learning neural network transfer learning";
        let keywords = extract_keywords(text, 2);
        assert!(keywords.len() <= 2);
    }

    #[test]
    fn test_research_unigrams_kept() {
        let text = "optimization optimization optimization convergence convergence convergence";
        let keywords = extract_keywords(text, 10);
        assert!(keywords.iter().any(|k| k == "optimization"));
    }
}

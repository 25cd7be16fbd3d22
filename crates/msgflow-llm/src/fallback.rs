//! Keyword fallback analysis
//!
//! Used when every configured provider of a tenant fails. Deterministic and
//! free of I/O.

use crate::types::{AnalysisResult, SummaryResult};

const URGENT_WORDS: &[&str] = &["urgent", "asap", "deadline", "important"];
const NEGATIVE_WORDS: &[&str] = &["angry", "upset", "frustrated", "issue"];
const POSITIVE_WORDS: &[&str] = &["happy", "excited", "great", "thanks"];

/// Confidence reported for heuristic results
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Classify a message without an LLM
#[must_use]
pub fn fallback_analysis(message: &str) -> AnalysisResult {
    let text = message.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|w| text.contains(w));

    let mut is_important = contains_any(URGENT_WORDS);
    let mut priority = if is_important { "high" } else { "low" };

    let sentiment = if contains_any(NEGATIVE_WORDS) {
        "negative"
    } else if contains_any(POSITIVE_WORDS) {
        "positive"
    } else {
        "neutral"
    };

    if text.matches('!').count() >= 2 && priority != "high" {
        is_important = true;
        priority = "medium";
    }

    AnalysisResult {
        is_important,
        priority: priority.to_string(),
        reason: "keyword fallback".to_string(),
        has_action: is_important || text.contains('?'),
        action_required: "review".to_string(),
        sentiment: sentiment.to_string(),
        sentiment_score: 0.0,
        topics: Vec::new(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Canned summary served when no provider can summarise
#[must_use]
pub fn fallback_summary() -> SummaryResult {
    SummaryResult {
        summary: "This conversation discusses various topics. Due to a temporary service issue, \
                  an AI-generated summary is not available at this time."
            .to_string(),
        key_points: vec![
            "Multiple messages exchanged".to_string(),
            "Topics discussed include general conversation".to_string(),
        ],
        action_items: Vec::new(),
        sentiment: "neutral".to_string(),
        topics: vec!["general".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let message = "Need this ASAP, I'm upset!!";
        assert_eq!(fallback_analysis(message), fallback_analysis(message));
    }

    #[test]
    fn test_urgent_keyword() {
        let result = fallback_analysis("The DEADLINE is tomorrow");
        assert!(result.is_important);
        assert_eq!(result.priority, "high");
        assert!(result.has_action);
    }

    #[test]
    fn test_exclamations_without_urgency() {
        let result = fallback_analysis("Look at this!! Wow");
        assert!(result.is_important);
        assert_eq!(result.priority, "medium");
    }

    #[test]
    fn test_exclamations_keep_high_priority() {
        let result = fallback_analysis("urgent!!!");
        assert_eq!(result.priority, "high");
    }

    #[test]
    fn test_single_exclamation_stays_low() {
        let result = fallback_analysis("Hello there!");
        assert!(!result.is_important);
        assert_eq!(result.priority, "low");
        assert!(!result.has_action);
    }

    #[test]
    fn test_negative_beats_positive() {
        let result = fallback_analysis("Thanks, but I'm still angry about the issue");
        assert_eq!(result.sentiment, "negative");

        let result = fallback_analysis("Great work, thanks");
        assert_eq!(result.sentiment, "positive");

        let result = fallback_analysis("See you at noon");
        assert_eq!(result.sentiment, "neutral");
    }

    #[test]
    fn test_question_implies_action() {
        let result = fallback_analysis("Can you call me back?");
        assert!(!result.is_important);
        assert!(result.has_action);
    }

    #[test]
    fn test_fixed_fields() {
        let result = fallback_analysis("anything");
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.reason, "keyword fallback");
        assert_eq!(result.action_required, "review");
        assert_eq!(result.sentiment_score, 0.0);
        assert!(result.topics.is_empty());
    }

    #[test]
    fn test_fallback_summary_is_neutral() {
        let summary = fallback_summary();
        assert!(summary.summary.contains("temporary service issue"));
        assert_eq!(summary.sentiment, "neutral");
        assert_eq!(summary.topics, vec!["general"]);
        assert_eq!(summary.key_points.len(), 2);
    }
}

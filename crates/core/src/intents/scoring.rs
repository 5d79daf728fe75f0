//! Multi-signal intent scoring.
//!
//! Every intent is scored independently against the normalized message:
//! a pattern hit is worth [`PATTERN_SCORE`], each distinct keyword found is
//! worth [`KEYWORD_SCORE`], and an intent whose id contains the conversation's
//! last topic earns [`CONTEXT_BOOST`]. The sum is multiplied by the intent's
//! priority.

use serde::Serialize;

use crate::domain::context::ConversationContext;
use crate::intents::catalog::{Intent, IntentCatalog, IntentId};

pub const PATTERN_SCORE: u32 = 100;
pub const KEYWORD_SCORE: u32 = 10;
pub const CONTEXT_BOOST: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntentScore {
    pub intent_id: IntentId,
    pub pattern_score: u32,
    pub keyword_score: u32,
    pub context_boost: u32,
    pub priority: u32,
    pub final_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
}

pub fn normalize_message(message: &str) -> String {
    message.trim().to_lowercase()
}

/// Scores every intent in catalog order. Pure: neither the context nor the
/// catalog is touched.
pub fn score(
    message: &str,
    context: &ConversationContext,
    catalog: &IntentCatalog,
) -> Vec<IntentScore> {
    let normalized = normalize_message(message);
    catalog.iter().map(|intent| score_intent(intent, &normalized, context)).collect()
}

/// Scores one intent against an already-normalized message.
pub fn score_intent(
    intent: &Intent,
    normalized: &str,
    context: &ConversationContext,
) -> IntentScore {
    let matched_pattern = intent
        .patterns()
        .iter()
        .find(|pattern| pattern.is_match(normalized))
        .map(|pattern| pattern.as_str().to_string());
    let pattern_score = if matched_pattern.is_some() { PATTERN_SCORE } else { 0 };

    let matched_keywords = intent
        .keywords()
        .iter()
        .filter(|keyword| normalized.contains(keyword.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let keyword_score = KEYWORD_SCORE.saturating_mul(matched_keywords.len() as u32);

    // The topic boost sharpens an existing signal; on its own it never turns a
    // silent intent into a match.
    let has_signal = pattern_score > 0 || keyword_score > 0;
    let topic_related = context
        .last_topic
        .as_deref()
        .filter(|topic| !topic.is_empty())
        .is_some_and(|topic| intent.id().as_str().contains(topic));
    let context_boost = if has_signal && topic_related { CONTEXT_BOOST } else { 0 };

    let raw = pattern_score + keyword_score + context_boost;

    IntentScore {
        intent_id: intent.id().clone(),
        pattern_score,
        keyword_score,
        context_boost,
        priority: intent.priority(),
        final_score: raw.saturating_mul(intent.priority()),
        matched_pattern,
        matched_keywords,
    }
}

/// Stable max: walks catalog order and only replaces the leader on a strictly
/// greater score, so the earliest intent wins ties. Returns `None` when the
/// best score is zero.
pub fn select_winner(scores: &[IntentScore]) -> Option<&IntentScore> {
    let mut best: Option<&IntentScore> = None;
    for candidate in scores {
        match best {
            Some(leader) if candidate.final_score <= leader.final_score => {}
            _ => best = Some(candidate),
        }
    }
    best.filter(|leader| leader.final_score > 0)
}

use serde::Serialize;
use storefront_agent::storefront_catalog;
use storefront_core::intents::{normalize_message, score, select_winner};
use storefront_core::{ConversationContext, FallbackResolver, IntentScore};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct FallbackPreview {
    clarified_topic: Option<String>,
    text: String,
}

#[derive(Debug, Serialize)]
struct ScoreReport {
    command: &'static str,
    status: &'static str,
    normalized: String,
    last_topic: Option<String>,
    winner: Option<String>,
    fallback: Option<FallbackPreview>,
    scores: Vec<IntentScore>,
}

/// Explains how the default catalog ranks `message`, without running any
/// responder.
pub fn run(message: &str, last_topic: Option<String>) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("score", "invalid_input", "message must not be blank", 2);
    }

    let catalog = match storefront_catalog() {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("score", "catalog", error.to_string(), 2),
    };

    let context = match &last_topic {
        Some(topic) => ConversationContext::new().with_last_topic(topic.clone()),
        None => ConversationContext::new(),
    };

    let scores = score(message, &context, &catalog);
    let winner = select_winner(&scores).map(|best| best.intent_id.to_string());
    let fallback = winner.is_none().then(|| {
        let resolver = FallbackResolver::default();
        FallbackPreview {
            clarified_topic: last_topic
                .clone()
                .filter(|topic| resolver.is_elaborable(topic)),
            text: resolver.resolve(&context).text,
        }
    });

    CommandResult::report(&ScoreReport {
        command: "score",
        status: "ok",
        normalized: normalize_message(message),
        last_topic,
        winner,
        fallback,
        scores,
    })
}

//! Intent resolution: the catalog of known shopper goals, the scorer that ranks
//! them against a message, and the fallback used when nothing matches.

pub mod catalog;
pub mod fallback;
pub mod scoring;

pub use catalog::{Intent, IntentCatalog, IntentDefinition, IntentId, Responder};
pub use fallback::{FallbackResolver, GENERIC_FALLBACK_TEXT};
pub use scoring::{
    normalize_message, score, score_intent, select_winner, IntentScore, CONTEXT_BOOST,
    KEYWORD_SCORE, PATTERN_SCORE,
};

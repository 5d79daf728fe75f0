//! Storefront Core - deterministic intent resolution for the shopping assistant
//!
//! This crate holds everything that decides *what* the assistant says:
//! - The intent catalog (`intents::catalog`) and its construction-time checks
//! - Multi-signal scoring with stable tie-breaking (`intents::scoring`)
//! - Topic-aware fallback replies (`intents::fallback`)
//! - The conversation context and its patch/merge rules (`domain::context`)
//!
//! Timing, sessions and the default storefront responders live in
//! `storefront-agent`.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod intents;

pub use audit::{InMemoryTurnReporter, NoopTurnReporter, TurnEvent, TurnEventKind, TurnReporter};
pub use domain::action::{ActionIcon, ActionId, QuickAction};
pub use domain::context::{ContextPatch, ConversationContext};
pub use domain::message::{Message, Sender};
pub use domain::response::ResponseResult;
pub use errors::{ApplicationError, CatalogError, InterfaceError, ResponderError};
pub use intents::{
    FallbackResolver, Intent, IntentCatalog, IntentDefinition, IntentId, IntentScore, Responder,
};

//! Storefront assistant runtime.
//!
//! Turns a shopper's message into a bot reply on top of `storefront-core`:
//! - `responders`: the built-in catalog of storefront intents and their replies
//! - `conversation`: the synchronous turn loop (score, pick a winner, reply, patch context)
//! - `runtime`: paced sessions that deliver replies after a typing delay, in send order
//! - `actions`: host handlers for the quick actions attached to replies
//!
//! Replies are chosen deterministically by the scorer. Randomness only varies
//! phrasing and typing delay, and both draw from seedable generators.

pub mod actions;
pub mod conversation;
pub mod responders;
pub mod runtime;

pub use actions::{
    storefront_actions, ActionError, ActionHandler, ActionOutcome, ActionRegistry,
    NavigationHandler,
};
pub use conversation::{Dispatcher, Resolution, Turn};
pub use responders::{storefront_catalog, storefront_definitions, StorefrontResponder};
pub use runtime::{
    ConversationSession, FixedTypingDelay, RandomTypingDelay, ScriptedTypingDelay, SessionError,
    SessionState, TypingDelay,
};

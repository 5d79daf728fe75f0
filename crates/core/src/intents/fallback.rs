use std::collections::BTreeMap;

use crate::domain::action::{ids, ActionIcon, QuickAction};
use crate::domain::context::ConversationContext;
use crate::domain::response::ResponseResult;

pub const GENERIC_FALLBACK_TEXT: &str = "I'm not sure I understood that. \
Here are a few things I can help you with:";

/// Reply used when no intent scores above zero.
///
/// Topics listed in the clarification map get a follow-up question so the
/// shopper can elaborate; anything else falls through to the generic reply.
#[derive(Clone, Debug)]
pub struct FallbackResolver {
    clarifications: BTreeMap<String, String>,
}

impl Default for FallbackResolver {
    fn default() -> Self {
        Self::new()
            .with_clarification(
                "payment",
                "Could you tell me a bit more about your payment question? For example, \
                 which payment method you'd like to use or whether a charge looks wrong.",
            )
            .with_clarification(
                "orders",
                "Which order do you mean? If you share roughly when you placed it, \
                 I can point you to the right place to check its status.",
            )
            .with_clarification(
                "products",
                "What kind of product are you after? A category, brand or price range \
                 helps me narrow things down.",
            )
            .with_clarification(
                "shipping",
                "Are you asking about delivery times, shipping costs or where we ship to?",
            )
            .with_clarification(
                "returns",
                "Is this about starting a return, an exchange, or the status of a refund?",
            )
    }
}

impl FallbackResolver {
    /// A resolver with no topic clarifications; every miss gets the generic reply.
    pub fn new() -> Self {
        Self { clarifications: BTreeMap::new() }
    }

    pub fn with_clarification(mut self, topic: impl Into<String>, text: impl Into<String>) -> Self {
        self.clarifications.insert(topic.into(), text.into());
        self
    }

    pub fn is_elaborable(&self, topic: &str) -> bool {
        self.clarifications.contains_key(topic)
    }

    pub fn resolve(&self, context: &ConversationContext) -> ResponseResult {
        context
            .last_topic
            .as_deref()
            .and_then(|topic| self.clarifications.get(topic))
            .map(|text| ResponseResult::text(text.clone()))
            .unwrap_or_else(|| self.generic())
    }

    /// The topic-agnostic reply; also what a failed responder degrades to.
    pub fn generic(&self) -> ResponseResult {
        ResponseResult::text(GENERIC_FALLBACK_TEXT).actions([
            QuickAction::new("Browse catalog", ids::BROWSE_CATALOG).icon(ActionIcon::Search),
            QuickAction::new("View my orders", ids::VIEW_ORDERS).icon(ActionIcon::Package),
            QuickAction::new("Contact support", ids::CONTACT_SUPPORT).icon(ActionIcon::Support),
        ])
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Session-scoped conversation state.
///
/// Only two things change it: merging a [`ContextPatch`] and the dispatcher's
/// per-turn `message_count` increment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub last_topic: Option<String>,
    pub mentioned_products: BTreeSet<String>,
    pub asked_about_orders: bool,
    pub asked_about_payments: bool,
    pub greeting_given: bool,
    pub message_count: u32,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_topic(mut self, topic: impl Into<String>) -> Self {
        self.last_topic = Some(topic.into());
        self
    }

    /// Shallow merge: every field present in the patch replaces the stored value.
    pub fn apply(&mut self, patch: ContextPatch) {
        if let Some(last_topic) = patch.last_topic {
            self.last_topic = last_topic;
        }
        if let Some(mentioned_products) = patch.mentioned_products {
            self.mentioned_products = mentioned_products;
        }
        if let Some(asked_about_orders) = patch.asked_about_orders {
            self.asked_about_orders = asked_about_orders;
        }
        if let Some(asked_about_payments) = patch.asked_about_payments {
            self.asked_about_payments = asked_about_payments;
        }
        if let Some(greeting_given) = patch.greeting_given {
            self.greeting_given = greeting_given;
        }
    }

    pub fn record_turn(&mut self) {
        self.message_count = self.message_count.saturating_add(1);
    }
}

/// Partial context returned by a responder.
///
/// `last_topic` is doubly optional: `Some(None)` clears the topic while `None`
/// leaves it alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_topic: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentioned_products: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asked_about_orders: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asked_about_payments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting_given: Option<bool>,
}

impl ContextPatch {
    pub fn topic(topic: impl Into<String>) -> Self {
        Self { last_topic: Some(Some(topic.into())), ..Self::default() }
    }

    pub fn clear_topic() -> Self {
        Self { last_topic: Some(None), ..Self::default() }
    }

    pub fn mentioned_products(mut self, products: BTreeSet<String>) -> Self {
        self.mentioned_products = Some(products);
        self
    }

    pub fn asked_about_orders(mut self, value: bool) -> Self {
        self.asked_about_orders = Some(value);
        self
    }

    pub fn asked_about_payments(mut self, value: bool) -> Self {
        self.asked_about_payments = Some(value);
        self
    }

    pub fn greeting_given(mut self, value: bool) -> Self {
        self.greeting_given = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

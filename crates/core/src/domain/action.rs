use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionIcon {
    Search,
    Package,
    CreditCard,
    Truck,
    Return,
    Cart,
    User,
    Support,
}

/// A follow-up the shopper can trigger straight from a bot reply.
///
/// The `action_id` is resolved by the host; nothing in the engine performs the
/// navigation itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub label: String,
    pub action_id: ActionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<ActionIcon>,
}

impl QuickAction {
    pub fn new(label: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self { label: label.into(), action_id: ActionId(action_id.into()), icon: None }
    }

    pub fn icon(mut self, icon: ActionIcon) -> Self {
        self.icon = Some(icon);
        self
    }
}

pub mod ids {
    pub const BROWSE_CATALOG: &str = "nav.catalog";
    pub const VIEW_ORDERS: &str = "nav.orders";
    pub const TRACK_SHIPMENT: &str = "nav.orders.tracking";
    pub const PAYMENT_METHODS: &str = "nav.account.payment_methods";
    pub const VIEW_CART: &str = "nav.cart";
    pub const CHECKOUT: &str = "nav.checkout";
    pub const ADDRESSES: &str = "nav.account.addresses";
    pub const ACCOUNT: &str = "nav.account";
    pub const START_RETURN: &str = "nav.orders.returns";
    pub const SHIPPING_INFO: &str = "nav.help.shipping";
    pub const CONTACT_SUPPORT: &str = "support.contact";
}

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use storefront_core::domain::action::ids;
use storefront_core::{ActionId, ApplicationError, QuickAction};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action_id: ActionId,
    pub detail: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("no handler registered for action `{0}`")]
    Unknown(ActionId),
    #[error("action `{action_id}` failed: {message}")]
    Failed { action_id: ActionId, message: String },
}

impl From<ActionError> for ApplicationError {
    fn from(error: ActionError) -> Self {
        match error {
            ActionError::Unknown(_) => Self::InvalidAction(error.to_string()),
            ActionError::Failed { .. } => Self::Integration(error.to_string()),
        }
    }
}

/// Host-side effect behind a quick action. The assistant only names the
/// action; what activating it means belongs to the host.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn action_id(&self) -> &str;
    async fn execute(&self, action: &QuickAction) -> Result<ActionOutcome, ActionError>;
}

#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Box<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn register<H>(&mut self, handler: H)
    where
        H: ActionHandler + 'static,
    {
        self.handlers.insert(handler.action_id().to_string(), Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, action_id: &str) -> bool {
        self.handlers.contains_key(action_id)
    }

    pub fn action_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub async fn dispatch(&self, action: &QuickAction) -> Result<ActionOutcome, ActionError> {
        let handler = self
            .handlers
            .get(action.action_id.as_str())
            .ok_or_else(|| ActionError::Unknown(action.action_id.clone()))?;
        handler.execute(action).await
    }
}

/// Resolves an action to a storefront route.
#[derive(Clone, Debug)]
pub struct NavigationHandler {
    action_id: String,
    route: String,
}

impl NavigationHandler {
    pub fn new(action_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), route: route.into() }
    }
}

#[async_trait]
impl ActionHandler for NavigationHandler {
    fn action_id(&self) -> &str {
        &self.action_id
    }

    async fn execute(&self, action: &QuickAction) -> Result<ActionOutcome, ActionError> {
        Ok(ActionOutcome {
            action_id: action.action_id.clone(),
            detail: format!("navigate {}", self.route),
        })
    }
}

/// Routes for every action id the built-in responders emit.
pub fn storefront_actions() -> ActionRegistry {
    let routes = [
        (ids::BROWSE_CATALOG, "/catalog"),
        (ids::VIEW_ORDERS, "/orders"),
        (ids::TRACK_SHIPMENT, "/orders/tracking"),
        (ids::PAYMENT_METHODS, "/account/payment-methods"),
        (ids::VIEW_CART, "/cart"),
        (ids::CHECKOUT, "/checkout"),
        (ids::ADDRESSES, "/account/addresses"),
        (ids::ACCOUNT, "/account"),
        (ids::START_RETURN, "/orders/returns"),
        (ids::SHIPPING_INFO, "/help/shipping"),
        (ids::CONTACT_SUPPORT, "/support/contact"),
    ];

    let mut registry = ActionRegistry::default();
    for (action_id, route) in routes {
        registry.register(NavigationHandler::new(action_id, route));
    }
    registry
}

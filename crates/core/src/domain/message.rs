use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::action::QuickAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<QuickAction>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User, Vec::new())
    }

    pub fn bot(content: impl Into<String>, actions: Vec<QuickAction>) -> Self {
        Self::new(content, Sender::Bot, actions)
    }

    fn new(content: impl Into<String>, sender: Sender, actions: Vec<QuickAction>) -> Self {
        Self { id: Uuid::new_v4(), content: content.into(), sender, timestamp: Utc::now(), actions }
    }
}

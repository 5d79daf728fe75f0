use serde::{Deserialize, Serialize};

use crate::domain::action::QuickAction;
use crate::domain::context::ContextPatch;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<QuickAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_patch: Option<ContextPatch>,
}

impl ResponseResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn action(mut self, action: QuickAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = QuickAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn patch(mut self, patch: ContextPatch) -> Self {
        self.context_patch = Some(patch);
        self
    }
}

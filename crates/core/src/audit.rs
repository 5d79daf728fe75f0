use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intents::IntentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEventKind {
    IntentMatched,
    FallbackUsed,
    ResponderFailed,
    ActionRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub event_id: String,
    pub session_id: String,
    pub kind: TurnEventKind,
    pub intent_id: Option<IntentId>,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl TurnEvent {
    pub fn new(session_id: impl Into<String>, kind: TurnEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            kind,
            intent_id: None,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_intent(mut self, intent_id: IntentId) -> Self {
        self.intent_id = Some(intent_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Host-side sink for what happened during a turn. Reporting must not fail
/// the turn, so `report` has no error channel.
pub trait TurnReporter: Send + Sync {
    fn report(&self, event: TurnEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTurnReporter;

impl TurnReporter for NoopTurnReporter {
    fn report(&self, _event: TurnEvent) {}
}

impl<T: TurnReporter + ?Sized> TurnReporter for Arc<T> {
    fn report(&self, event: TurnEvent) {
        (**self).report(event);
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTurnReporter {
    events: Arc<Mutex<Vec<TurnEvent>>>,
}

impl InMemoryTurnReporter {
    pub fn events(&self) -> Vec<TurnEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn kinds(&self) -> Vec<TurnEventKind> {
        self.events().iter().map(|event| event.kind).collect()
    }
}

impl TurnReporter for InMemoryTurnReporter {
    fn report(&self, event: TurnEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

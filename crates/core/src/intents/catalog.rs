use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::context::ConversationContext;
use crate::domain::response::ResponseResult;
use crate::errors::{CatalogError, ResponderError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntentId(pub String);

impl IntentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IntentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reply strategy attached to an intent.
///
/// Implementations must not keep per-conversation state: everything they need
/// arrives through `context`, and any randomness comes from `rng`.
pub trait Responder: Send + Sync {
    fn respond(
        &self,
        context: &ConversationContext,
        message: &str,
        rng: &mut dyn RngCore,
    ) -> Result<ResponseResult, ResponderError>;
}

/// Uncompiled intent as authored; turned into an [`Intent`] by
/// [`IntentCatalog::load`].
#[derive(Clone)]
pub struct IntentDefinition {
    pub id: String,
    pub patterns: Vec<String>,
    pub keywords: Vec<String>,
    pub priority: u32,
    pub responder: Arc<dyn Responder>,
}

impl IntentDefinition {
    pub fn new(id: impl Into<String>, responder: Arc<dyn Responder>) -> Self {
        Self { id: id.into(), patterns: Vec::new(), keywords: Vec::new(), priority: 1, responder }
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

pub struct Intent {
    id: IntentId,
    patterns: Vec<Regex>,
    keywords: Vec<String>,
    priority: u32,
    responder: Arc<dyn Responder>,
}

impl Intent {
    pub fn id(&self) -> &IntentId {
        &self.id
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn respond(
        &self,
        context: &ConversationContext,
        message: &str,
        rng: &mut dyn RngCore,
    ) -> Result<ResponseResult, ResponderError> {
        self.responder.respond(context, message, rng)
    }

    fn compile(definition: IntentDefinition) -> Result<Self, CatalogError> {
        let id = definition.id.trim().to_string();
        if id.is_empty() {
            return Err(CatalogError::EmptyIntentId);
        }
        if definition.priority == 0 {
            return Err(CatalogError::ZeroPriority { intent_id: id });
        }

        let patterns = definition
            .patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern).case_insensitive(true).build().map_err(|error| {
                    CatalogError::InvalidPattern {
                        intent_id: id.clone(),
                        pattern: pattern.clone(),
                        message: error.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        let keywords = definition
            .keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .filter(|keyword| seen.insert(keyword.clone()))
            .collect();

        Ok(Self {
            id: IntentId(id),
            patterns,
            keywords,
            priority: definition.priority,
            responder: definition.responder,
        })
    }
}

impl fmt::Debug for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intent")
            .field("id", &self.id)
            .field("patterns", &self.patterns.iter().map(Regex::as_str).collect::<Vec<_>>())
            .field("keywords", &self.keywords)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Ordered, read-only set of intents.
///
/// Order matters only for tie-breaking: on equal scores the earlier intent wins.
#[derive(Debug, Default)]
pub struct IntentCatalog {
    intents: Vec<Intent>,
}

impl IntentCatalog {
    pub fn load<I>(definitions: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = IntentDefinition>,
    {
        let mut seen_ids = BTreeSet::new();
        let mut intents = Vec::new();

        for definition in definitions {
            let intent = Intent::compile(definition)?;
            if !seen_ids.insert(intent.id.clone()) {
                return Err(CatalogError::DuplicateIntentId(intent.id.0));
            }
            intents.push(intent);
        }

        Ok(Self { intents })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Intent> {
        self.intents.iter().find(|intent| intent.id.as_str() == id)
    }

    pub fn ids(&self) -> Vec<&IntentId> {
        self.intents.iter().map(Intent::id).collect()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::RngCore;

    use super::Responder;
    use crate::domain::context::{ContextPatch, ConversationContext};
    use crate::domain::response::ResponseResult;
    use crate::errors::ResponderError;

    pub struct EchoTopic(pub &'static str);

    impl Responder for EchoTopic {
        fn respond(
            &self,
            _context: &ConversationContext,
            _message: &str,
            _rng: &mut dyn RngCore,
        ) -> Result<ResponseResult, ResponderError> {
            Ok(ResponseResult::text(self.0).patch(ContextPatch::topic(self.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::test_support::EchoTopic;
    use super::{IntentCatalog, IntentDefinition};
    use crate::domain::context::ConversationContext;
    use crate::errors::CatalogError;

    fn definition(id: &str) -> IntentDefinition {
        IntentDefinition::new(id, Arc::new(EchoTopic("echo")))
    }

    #[test]
    fn load_preserves_registration_order() {
        let catalog = IntentCatalog::load(vec![
            definition("greeting").priority(10),
            definition("products").priority(7),
            definition("orders").priority(8),
        ])
        .expect("catalog should load");

        let ids = catalog.ids().into_iter().map(|id| id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["greeting", "products", "orders"]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("orders").map(|intent| intent.priority()), Some(8));
    }

    #[test]
    fn duplicate_ids_fail_at_load_time() {
        let result = IntentCatalog::load(vec![definition("greeting"), definition("greeting")]);
        assert_eq!(result.err(), Some(CatalogError::DuplicateIntentId("greeting".to_string())));
    }

    #[test]
    fn invalid_pattern_fails_at_load_time() {
        let result = IntentCatalog::load(vec![definition("payment").pattern("pay (for|with")]);

        let Err(CatalogError::InvalidPattern { intent_id, pattern, .. }) = result else {
            panic!("expected invalid pattern error");
        };
        assert_eq!(intent_id, "payment");
        assert_eq!(pattern, "pay (for|with");
    }

    #[test]
    fn zero_priority_and_blank_ids_are_rejected() {
        assert_eq!(
            IntentCatalog::load(vec![definition("orders").priority(0)]).err(),
            Some(CatalogError::ZeroPriority { intent_id: "orders".to_string() })
        );
        assert_eq!(
            IntentCatalog::load(vec![definition("   ")]).err(),
            Some(CatalogError::EmptyIntentId)
        );
    }

    #[test]
    fn keywords_are_lowercased_and_deduplicated() {
        let catalog = IntentCatalog::load(vec![definition("payment").keywords([
            "Pay", "pay", " PayPal ", "",
        ])])
        .expect("catalog should load");

        let intent = catalog.get("payment").expect("payment intent");
        assert_eq!(intent.keywords(), ["pay".to_string(), "paypal".to_string()]);
    }

    #[test]
    fn intent_delegates_to_its_responder() {
        let catalog = IntentCatalog::load(vec![definition("echo")]).expect("catalog should load");
        let mut rng = StdRng::seed_from_u64(7);

        let reply = catalog
            .get("echo")
            .expect("echo intent")
            .respond(&ConversationContext::new(), "anything", &mut rng)
            .expect("echo responder never fails");

        assert_eq!(reply.text, "echo");
    }
}

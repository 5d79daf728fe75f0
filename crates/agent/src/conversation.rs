use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use storefront_core::intents::{score, select_winner};
use storefront_core::{
    ConversationContext, FallbackResolver, IntentCatalog, IntentId, Message, NoopTurnReporter,
    ResponderError, ResponseResult, TurnEvent, TurnEventKind, TurnReporter,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a turn was answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Matched { intent_id: IntentId, final_score: u32 },
    Fallback { clarified_topic: Option<String> },
    /// The winning responder failed; the generic fallback was sent instead.
    Degraded { intent_id: IntentId, error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub resolution: Resolution,
    pub reply: Message,
}

/// Owns one conversation: the transcript, the context, and the random source
/// responders draw from. Turns are resolved synchronously; pacing lives in
/// [`crate::runtime::ConversationSession`].
pub struct Dispatcher<R = StdRng> {
    session_id: String,
    catalog: Arc<IntentCatalog>,
    fallback: FallbackResolver,
    reporter: Arc<dyn TurnReporter>,
    rng: R,
    context: ConversationContext,
    messages: Vec<Message>,
}

impl Dispatcher<StdRng> {
    /// Seeded dispatchers replay the same phrasing for the same inputs.
    pub fn seeded(catalog: Arc<IntentCatalog>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(catalog, rng)
    }
}

impl<R: RngCore> Dispatcher<R> {
    pub fn new(catalog: Arc<IntentCatalog>, rng: R) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            catalog,
            fallback: FallbackResolver::default(),
            reporter: Arc::new(NoopTurnReporter),
            rng,
            context: ConversationContext::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackResolver) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn TurnReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_context(mut self, context: ConversationContext) -> Self {
        self.context = context;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn reporter(&self) -> Arc<dyn TurnReporter> {
        Arc::clone(&self.reporter)
    }

    /// Appends the shopper's message to the transcript. Blank input is
    /// ignored and yields `None`.
    pub fn accept(&mut self, text: &str) -> Option<&Message> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!(
                event_name = "conversation.message.ignored",
                session_id = %self.session_id,
                "ignoring blank message"
            );
            return None;
        }

        self.messages.push(Message::user(trimmed));
        self.messages.last()
    }

    /// Produces the bot reply for a message already accepted into the
    /// transcript, then folds the reply's context patch in.
    pub fn resolve(&mut self, text: &str) -> Turn {
        let catalog = Arc::clone(&self.catalog);
        let scores = score(text, &self.context, &catalog);
        let winner = select_winner(&scores).and_then(|best| {
            catalog.get(best.intent_id.as_str()).map(|intent| (intent, best.final_score))
        });

        let (resolution, reply) = match winner {
            Some((intent, final_score)) => {
                // A panicking responder is handled like a failing one so the
                // session outlives it.
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    intent.respond(&self.context, text, &mut self.rng)
                }))
                .unwrap_or_else(|payload| {
                    Err(ResponderError::Internal(panic_message(payload.as_ref())))
                });
                match outcome {
                    Ok(reply) => {
                        info!(
                            event_name = "conversation.turn.matched",
                            session_id = %self.session_id,
                            intent_id = %intent.id(),
                            final_score,
                            "resolved message to intent"
                        );
                        self.reporter.report(
                            TurnEvent::new(&self.session_id, TurnEventKind::IntentMatched)
                                .with_intent(intent.id().clone())
                                .with_metadata("final_score", final_score.to_string()),
                        );
                        (
                            Resolution::Matched { intent_id: intent.id().clone(), final_score },
                            reply,
                        )
                    }
                    Err(error) => {
                        warn!(
                            event_name = "conversation.turn.responder_failed",
                            session_id = %self.session_id,
                            intent_id = %intent.id(),
                            error = %error,
                            "responder failed; sending generic fallback"
                        );
                        self.reporter.report(
                            TurnEvent::new(&self.session_id, TurnEventKind::ResponderFailed)
                                .with_intent(intent.id().clone())
                                .with_metadata("error", error.to_string()),
                        );
                        (
                            Resolution::Degraded {
                                intent_id: intent.id().clone(),
                                error: error.to_string(),
                            },
                            self.fallback.generic(),
                        )
                    }
                }
            }
            None => self.fall_back(),
        };

        let ResponseResult { text: reply_text, actions, context_patch } = reply;
        if let Some(patch) = context_patch {
            self.context.apply(patch);
        }
        self.context.record_turn();

        let message = Message::bot(reply_text, actions);
        self.messages.push(message.clone());
        Turn { resolution, reply: message }
    }

    /// Accepts and resolves in one step, for hosts without reply pacing.
    pub fn handle(&mut self, text: &str) -> Option<Turn> {
        let accepted = self.accept(text)?.content.clone();
        Some(self.resolve(&accepted))
    }

    fn fall_back(&self) -> (Resolution, ResponseResult) {
        let clarified_topic = self
            .context
            .last_topic
            .clone()
            .filter(|topic| self.fallback.is_elaborable(topic));

        info!(
            event_name = "conversation.turn.fallback",
            session_id = %self.session_id,
            last_topic = self.context.last_topic.as_deref().unwrap_or("none"),
            clarified = clarified_topic.is_some(),
            "no intent matched; using fallback"
        );

        let mut event = TurnEvent::new(&self.session_id, TurnEventKind::FallbackUsed);
        if let Some(topic) = &clarified_topic {
            event = event.with_metadata("clarified_topic", topic.clone());
        }
        self.reporter.report(event);

        (Resolution::Fallback { clarified_topic }, self.fallback.resolve(&self.context))
    }

    /// Drops a just-accepted user message that will never get a reply.
    pub(crate) fn withdraw(&mut self, message_id: Uuid) {
        if self.messages.last().is_some_and(|message| message.id == message_id) {
            self.messages.pop();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("responder panicked: {detail}"),
        None => "responder panicked".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::RngCore;
    use storefront_core::{
        ConversationContext, FallbackResolver, InMemoryTurnReporter, IntentCatalog,
        IntentDefinition, Responder, ResponderError, ResponseResult, Sender, TurnEventKind,
    };
    use storefront_core::intents::GENERIC_FALLBACK_TEXT;

    use super::{Dispatcher, Resolution};
    use crate::responders::{storefront_catalog, StorefrontResponder};

    struct Broken;

    struct Panicking;

    impl Responder for Panicking {
        fn respond(
            &self,
            _context: &ConversationContext,
            _message: &str,
            _rng: &mut dyn RngCore,
        ) -> Result<ResponseResult, ResponderError> {
            panic!("order lookup exploded")
        }
    }

    impl Responder for Broken {
        fn respond(
            &self,
            _context: &ConversationContext,
            _message: &str,
            _rng: &mut dyn RngCore,
        ) -> Result<ResponseResult, ResponderError> {
            Err(ResponderError::Internal("template missing".to_string()))
        }
    }

    fn storefront() -> Dispatcher {
        let catalog = storefront_catalog().expect("default catalog should load");
        Dispatcher::seeded(Arc::new(catalog), Some(7)).with_session_id("session-test")
    }

    #[test]
    fn order_tracking_question_resolves_to_orders() {
        let mut dispatcher = storefront();
        let turn = dispatcher.handle("Where is my order?").expect("non-blank message");

        match &turn.resolution {
            Resolution::Matched { intent_id, .. } => assert_eq!(intent_id.as_str(), "orders"),
            other => panic!("expected orders match, got {other:?}"),
        }
        assert_eq!(dispatcher.context().last_topic.as_deref(), Some("orders"));
        assert!(dispatcher.context().asked_about_orders);
        assert_eq!(dispatcher.context().message_count, 1);
        assert!(!turn.reply.actions.is_empty());
    }

    #[test]
    fn unmatched_message_after_payment_gets_clarification() {
        let catalog = storefront_catalog().expect("default catalog should load");
        let mut dispatcher = Dispatcher::seeded(Arc::new(catalog), Some(7))
            .with_context(ConversationContext::new().with_last_topic("payment"));

        let turn = dispatcher.handle("what about fees").expect("non-blank message");

        assert_eq!(
            turn.resolution,
            Resolution::Fallback { clarified_topic: Some("payment".to_string()) }
        );
        assert!(turn.reply.content.contains("payment"));
        assert!(turn.reply.actions.is_empty());
        assert_eq!(dispatcher.context().last_topic.as_deref(), Some("payment"));
    }

    #[test]
    fn unmatched_message_without_topic_gets_generic_fallback() {
        let mut dispatcher = storefront();
        let turn = dispatcher.handle("what about fees").expect("non-blank message");

        assert_eq!(turn.resolution, Resolution::Fallback { clarified_topic: None });
        assert_eq!(turn.reply.content, GENERIC_FALLBACK_TEXT);
        assert_eq!(turn.reply.actions.len(), 3);
    }

    #[test]
    fn pay_with_card_scores_pattern_and_keyword() {
        let mut dispatcher = storefront();
        let turn = dispatcher.handle("How do I pay with a card?").expect("non-blank message");

        assert_eq!(
            turn.resolution,
            Resolution::Matched { intent_id: "payment".into(), final_score: 880 }
        );
        assert!(dispatcher.context().asked_about_payments);
        assert_eq!(dispatcher.context().last_topic.as_deref(), Some("payment"));
    }

    #[test]
    fn greeting_then_thanks_clears_topic_but_keeps_greeting() {
        let mut dispatcher = storefront();

        dispatcher.handle("hi").expect("non-blank message");
        assert!(dispatcher.context().greeting_given);
        assert_eq!(dispatcher.context().last_topic.as_deref(), Some("greeting"));

        let turn = dispatcher.handle("thanks").expect("non-blank message");
        assert!(matches!(
            turn.resolution,
            Resolution::Matched { ref intent_id, .. } if intent_id.as_str() == "thanks"
        ));
        assert!(dispatcher.context().greeting_given);
        assert_eq!(dispatcher.context().last_topic, None);
        assert_eq!(dispatcher.context().message_count, 2);
    }

    #[test]
    fn blank_messages_are_ignored() {
        let mut dispatcher = storefront();

        assert!(dispatcher.handle("   ").is_none());
        assert!(dispatcher.accept("").is_none());
        assert!(dispatcher.messages().is_empty());
        assert_eq!(dispatcher.context().message_count, 0);
    }

    #[test]
    fn transcript_alternates_user_and_bot_with_trimmed_content() {
        let mut dispatcher = storefront();
        dispatcher.handle("  hello there  ").expect("non-blank message");

        let senders: Vec<Sender> =
            dispatcher.messages().iter().map(|message| message.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot]);
        assert_eq!(dispatcher.messages()[0].content, "hello there");
    }

    #[test]
    fn failing_responder_degrades_to_generic_fallback() {
        let reporter = InMemoryTurnReporter::default();
        let catalog = IntentCatalog::load([
            IntentDefinition::new("orders", Arc::new(Broken)).pattern(r"\border\b")
        ])
        .expect("catalog should load");
        let mut dispatcher = Dispatcher::seeded(Arc::new(catalog), Some(1))
            .with_fallback(FallbackResolver::new())
            .with_reporter(Arc::new(reporter.clone()));

        let turn = dispatcher.handle("my order").expect("non-blank message");

        assert!(matches!(turn.resolution, Resolution::Degraded { .. }));
        assert_eq!(turn.reply.content, GENERIC_FALLBACK_TEXT);
        assert_eq!(dispatcher.context().last_topic, None);
        assert_eq!(dispatcher.context().message_count, 1);
        assert_eq!(reporter.kinds(), vec![TurnEventKind::ResponderFailed]);
    }

    #[test]
    fn panicking_responder_degrades_and_dispatcher_keeps_working() {
        let reporter = InMemoryTurnReporter::default();
        let catalog = IntentCatalog::load([
            IntentDefinition::new("orders", Arc::new(Panicking)).pattern(r"\border\b"),
            IntentDefinition::new("greeting", Arc::new(StorefrontResponder::Greeting))
                .pattern("^hi$"),
        ])
        .expect("catalog should load");
        let mut dispatcher = Dispatcher::seeded(Arc::new(catalog), Some(1))
            .with_reporter(Arc::new(reporter.clone()));

        let turn = dispatcher.handle("my order").expect("non-blank message");
        match &turn.resolution {
            Resolution::Degraded { intent_id, error } => {
                assert_eq!(intent_id.as_str(), "orders");
                assert!(error.contains("order lookup exploded"), "{error}");
            }
            other => panic!("expected degraded turn, got {other:?}"),
        }
        assert_eq!(turn.reply.content, GENERIC_FALLBACK_TEXT);

        let next = dispatcher.handle("hi").expect("non-blank message");
        assert!(matches!(
            next.resolution,
            Resolution::Matched { ref intent_id, .. } if intent_id.as_str() == "greeting"
        ));
        assert_eq!(dispatcher.messages().len(), 4);
        assert_eq!(dispatcher.context().message_count, 2);
        assert_eq!(
            reporter.kinds(),
            vec![TurnEventKind::ResponderFailed, TurnEventKind::IntentMatched]
        );
    }

    #[test]
    fn reporter_sees_matches_and_fallbacks() {
        let reporter = InMemoryTurnReporter::default();
        let catalog = storefront_catalog().expect("default catalog should load");
        let mut dispatcher = Dispatcher::seeded(Arc::new(catalog), Some(3))
            .with_reporter(Arc::new(reporter.clone()));

        dispatcher.handle("hello").expect("non-blank message");
        dispatcher.handle("zzz").expect("non-blank message");

        let events = reporter.events();
        assert_eq!(
            reporter.kinds(),
            vec![TurnEventKind::IntentMatched, TurnEventKind::FallbackUsed]
        );
        assert_eq!(events[0].intent_id.as_ref().map(|id| id.as_str()), Some("greeting"));
        assert_eq!(events[0].session_id, dispatcher.session_id());
    }

    #[test]
    fn same_seed_replays_same_transcript() {
        let script = ["hi", "looking for sneakers", "how do I pay with paypal", "bye"];
        let run = || {
            let mut dispatcher = storefront();
            script
                .iter()
                .filter_map(|line| dispatcher.handle(line))
                .map(|turn| turn.reply.content)
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn product_mentions_accumulate_across_turns() {
        let mut dispatcher = storefront();
        dispatcher.handle("do you have sneakers").expect("non-blank message");
        dispatcher.handle("show me a backpack").expect("non-blank message");

        let mentioned: Vec<&str> =
            dispatcher.context().mentioned_products.iter().map(String::as_str).collect();
        assert_eq!(mentioned, vec!["bags", "shoes"]);
    }
}

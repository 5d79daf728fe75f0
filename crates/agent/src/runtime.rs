//! Paced conversation sessions.
//!
//! A [`ConversationSession`] records the shopper's message immediately and
//! delivers the bot reply after a simulated typing delay. Replies are resolved
//! strictly in the order their messages were sent, each against the context
//! left by the previous reply, even when a later message drew a shorter delay.
//! Closing or dropping the session cancels every reply still in flight.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use storefront_core::config::AssistantConfig;
use storefront_core::{ConversationContext, Message, QuickAction, TurnEvent, TurnEventKind};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actions::{ActionError, ActionOutcome, ActionRegistry};
use crate::conversation::Dispatcher;

pub trait TypingDelay: Send {
    fn next_delay(&mut self) -> Duration;
}

/// Uniform delay in `[min, max]` milliseconds.
pub struct RandomTypingDelay<R = StdRng> {
    min_ms: u64,
    max_ms: u64,
    rng: R,
}

impl RandomTypingDelay<StdRng> {
    pub fn from_config(config: &AssistantConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config.typing_delay_min_ms, config.typing_delay_max_ms, rng)
    }
}

impl<R: RngCore> RandomTypingDelay<R> {
    pub fn new(min_ms: u64, max_ms: u64, rng: R) -> Self {
        Self { min_ms: min_ms.min(max_ms), max_ms, rng }
    }
}

impl<R: RngCore + Send> TypingDelay for RandomTypingDelay<R> {
    fn next_delay(&mut self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.max_ms);
        }
        Duration::from_millis(self.rng.gen_range(self.min_ms..=self.max_ms))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTypingDelay(pub Duration);

impl TypingDelay for FixedTypingDelay {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}

/// Plays back a fixed list of delays, then repeats the last one.
#[derive(Clone, Debug)]
pub struct ScriptedTypingDelay {
    script: VecDeque<Duration>,
    last: Duration,
}

impl ScriptedTypingDelay {
    pub fn new(script: impl IntoIterator<Item = Duration>) -> Self {
        Self { script: script.into_iter().collect(), last: Duration::ZERO }
    }
}

impl TypingDelay for ScriptedTypingDelay {
    fn next_delay(&mut self) -> Duration {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("conversation session is closed")]
    Closed,
}

struct SessionCore<R> {
    dispatcher: Dispatcher<R>,
    delay: Box<dyn TypingDelay>,
    pending: usize,
}

struct PendingReply {
    text: String,
    deliver_at: Instant,
}

pub struct ConversationSession<R = StdRng> {
    session_id: String,
    core: Arc<Mutex<SessionCore<R>>>,
    queue: mpsc::UnboundedSender<PendingReply>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl<R: RngCore + Send + 'static> ConversationSession<R> {
    /// Spawns the reply worker on the current tokio runtime. Bot replies are
    /// published on the returned receiver, which closes once the session ends.
    pub fn start(
        dispatcher: Dispatcher<R>,
        delay: impl TypingDelay + 'static,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let session_id = dispatcher.session_id().to_string();
        let core = Arc::new(Mutex::new(SessionCore {
            dispatcher,
            delay: Box::new(delay),
            pending: 0,
        }));
        let (queue, pending_replies) = mpsc::unbounded_channel();
        let (replies, reply_receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(deliver_replies(
            Arc::clone(&core),
            pending_replies,
            replies,
            cancel.clone(),
            session_id.clone(),
        ));

        info!(
            event_name = "conversation.session.started",
            session_id = %session_id,
            "conversation session started"
        );

        (Self { session_id, core, queue, cancel, worker: Some(worker) }, reply_receiver)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Records the shopper's message and schedules the reply. Returns the
    /// recorded message, or `None` when the input was blank.
    pub fn send(&self, text: &str) -> Result<Option<Message>, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }

        let mut core = lock(&self.core);
        // A stopped worker would leave the message without a reply.
        if self.queue.is_closed() {
            return Err(SessionError::Closed);
        }
        let Some(accepted) = core.dispatcher.accept(text).cloned() else {
            return Ok(None);
        };

        let delay = core.delay.next_delay();
        let pending =
            PendingReply { text: accepted.content.clone(), deliver_at: Instant::now() + delay };
        if self.queue.send(pending).is_err() {
            core.dispatcher.withdraw(accepted.id);
            return Err(SessionError::Closed);
        }
        core.pending += 1;

        debug!(
            event_name = "conversation.reply.scheduled",
            session_id = %self.session_id,
            delay_ms = delay.as_millis() as u64,
            pending = core.pending,
            "scheduled bot reply"
        );

        Ok(Some(accepted))
    }

    pub fn state(&self) -> SessionState {
        if lock(&self.core).pending > 0 {
            SessionState::AwaitingReply
        } else {
            SessionState::Idle
        }
    }

    pub fn context(&self) -> ConversationContext {
        lock(&self.core).dispatcher.context().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.core).dispatcher.messages().to_vec()
    }

    /// Hands a quick action from a bot reply to the host's handlers.
    pub async fn activate(
        &self,
        registry: &ActionRegistry,
        action: &QuickAction,
    ) -> Result<ActionOutcome, ActionError> {
        let reporter = lock(&self.core).dispatcher.reporter();
        reporter.report(
            TurnEvent::new(&self.session_id, TurnEventKind::ActionRequested)
                .with_metadata("action_id", action.action_id.to_string()),
        );
        registry.dispatch(action).await
    }

    /// Cancels replies still in flight. Messages sent afterwards are refused.
    pub fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        let mut core = lock(&self.core);
        let dropped = core.pending;
        core.pending = 0;
        info!(
            event_name = "conversation.session.closed",
            session_id = %self.session_id,
            dropped_replies = dropped,
            "conversation session closed"
        );
    }

    /// Closes the session and waits for the reply worker to stop.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(worker) = self.worker.take() {
            if let Err(error) = worker.await {
                warn!(
                    event_name = "conversation.session.worker_failed",
                    session_id = %self.session_id,
                    error = %error,
                    "reply worker ended abnormally"
                );
            }
        }
    }
}

impl<R> Drop for ConversationSession<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn deliver_replies<R: RngCore>(
    core: Arc<Mutex<SessionCore<R>>>,
    mut pending_replies: mpsc::UnboundedReceiver<PendingReply>,
    replies: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    session_id: String,
) {
    loop {
        let pending = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = pending_replies.recv() => match next {
                Some(pending) => pending,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(pending.deliver_at) => {}
        }

        let reply = {
            let mut core = lock(&core);
            // `close` may have run between the wakeup and taking the lock.
            if cancel.is_cancelled() {
                break;
            }
            let turn = core.dispatcher.resolve(&pending.text);
            core.pending = core.pending.saturating_sub(1);
            turn.reply
        };

        if replies.send(reply).is_err() {
            debug!(
                event_name = "conversation.reply.unobserved",
                session_id = %session_id,
                "reply receiver dropped; reply kept in transcript only"
            );
        }
    }

    debug!(
        event_name = "conversation.session.worker_stopped",
        session_id = %session_id,
        "reply worker stopped"
    );
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use storefront_core::intents::GENERIC_FALLBACK_TEXT;
    use storefront_core::{
        ConversationContext, InMemoryTurnReporter, IntentCatalog, IntentDefinition, QuickAction,
        Responder, ResponderError, ResponseResult, Sender, TurnEventKind,
    };
    use tokio::time::Instant;

    use super::{
        lock, ConversationSession, FixedTypingDelay, RandomTypingDelay, ScriptedTypingDelay,
        SessionError, SessionState, TypingDelay,
    };
    use crate::actions::storefront_actions;
    use crate::conversation::Dispatcher;
    use crate::responders::{storefront_catalog, StorefrontResponder};

    struct Exploding;

    impl Responder for Exploding {
        fn respond(
            &self,
            _context: &ConversationContext,
            _message: &str,
            _rng: &mut dyn RngCore,
        ) -> Result<ResponseResult, ResponderError> {
            panic!("order service unreachable")
        }
    }

    fn dispatcher() -> Dispatcher {
        let catalog = storefront_catalog().expect("default catalog should load");
        Dispatcher::seeded(Arc::new(catalog), Some(11)).with_session_id("session-runtime")
    }

    #[tokio::test(start_paused = true)]
    async fn replies_arrive_in_send_order_even_when_later_delay_is_shorter() {
        let delays =
            ScriptedTypingDelay::new([Duration::from_millis(500), Duration::from_millis(10)]);
        let (session, mut replies) = ConversationSession::start(dispatcher(), delays);
        let started = Instant::now();

        session.send("hi").expect("session open");
        session.send("thanks").expect("session open");
        assert_eq!(session.state(), SessionState::AwaitingReply);
        assert_eq!(session.messages().len(), 2);

        let first = replies.recv().await.expect("greeting reply");
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(first.sender, Sender::Bot);
        assert_eq!(first.actions.len(), 3);

        let second = replies.recv().await.expect("thanks reply");
        assert!(second.actions.is_empty());

        assert_eq!(session.state(), SessionState::Idle);
        let context = session.context();
        assert!(context.greeting_given);
        assert_eq!(context.last_topic, None);
        assert_eq!(context.message_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn user_message_is_recorded_before_reply() {
        let (session, mut replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_secs(1)));

        let recorded = session.send("  where is my order?  ").expect("session open");
        assert_eq!(
            recorded.map(|message| message.content),
            Some("where is my order?".to_string())
        );
        assert_eq!(session.context().message_count, 0);

        replies.recv().await.expect("orders reply");
        let senders: Vec<Sender> =
            session.messages().iter().map(|message| message.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot]);
        assert!(session.context().asked_about_orders);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_message_schedules_nothing() {
        let (session, _replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_millis(5)));

        assert_eq!(session.send("   "), Ok(None));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_replies() {
        let (session, mut replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_secs(1)));

        session.send("hi").expect("session open");
        session.close();

        assert!(replies.recv().await.is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.context().message_count, 0);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.send("hello?"), Err(SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_session_stops_the_worker() {
        let (session, mut replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_secs(1)));
        session.send("hi").expect("session open");
        drop(session);

        assert!(replies.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_worker() {
        let (session, mut replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_millis(50)));
        session.send("bye").expect("session open");
        session.shutdown().await;

        assert!(replies.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn close_racing_a_due_reply_keeps_it_out_of_the_transcript() {
        let (session, mut replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_millis(50)));
        session.send("hi").expect("session open");

        {
            // The delay elapses while the core is held, so the worker wakes
            // and then waits on the lock. Closing happens before it gets in.
            let mut core = lock(&session.core);
            std::thread::sleep(Duration::from_millis(200));
            session.cancel.cancel();
            core.pending = 0;
        }

        assert!(replies.recv().await.is_none());
        assert_eq!(session.context().message_count, 0);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_responder_does_not_end_the_session() {
        let catalog = IntentCatalog::load([
            IntentDefinition::new("orders", Arc::new(Exploding)).pattern(r"\border\b"),
            IntentDefinition::new("greeting", Arc::new(StorefrontResponder::Greeting))
                .pattern("^hi$"),
        ])
        .expect("catalog should load");
        let dispatcher = Dispatcher::seeded(Arc::new(catalog), Some(5));
        let (session, mut replies) =
            ConversationSession::start(dispatcher, FixedTypingDelay(Duration::from_millis(10)));

        session.send("my order").expect("session open");
        let degraded = replies.recv().await.expect("fallback reply");
        assert_eq!(degraded.content, GENERIC_FALLBACK_TEXT);

        session.send("hi").expect("session still open");
        let greeting = replies.recv().await.expect("greeting reply");
        assert_eq!(greeting.sender, Sender::Bot);
        assert!(session.context().greeting_given);
        assert_eq!(session.context().message_count, 2);
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn send_after_worker_stopped_records_nothing() {
        let (mut session, mut replies) =
            ConversationSession::start(dispatcher(), FixedTypingDelay(Duration::from_millis(10)));
        if let Some(worker) = session.worker.take() {
            worker.abort();
            let _ = worker.await;
        }
        assert!(replies.recv().await.is_none());

        assert_eq!(session.send("hi"), Err(SessionError::Closed));
        assert!(session.messages().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn activating_an_action_is_reported() {
        let reporter = InMemoryTurnReporter::default();
        let dispatcher = dispatcher().with_reporter(Arc::new(reporter.clone()));
        let (session, _replies) =
            ConversationSession::start(dispatcher, FixedTypingDelay(Duration::ZERO));

        let outcome = session
            .activate(&storefront_actions(), &QuickAction::new("View cart", "nav.cart"))
            .await
            .expect("cart action is registered");

        assert_eq!(outcome.detail, "navigate /cart");
        assert_eq!(reporter.kinds(), vec![TurnEventKind::ActionRequested]);
        assert_eq!(
            reporter.events()[0].metadata.get("action_id").map(String::as_str),
            Some("nav.cart")
        );
    }

    #[test]
    fn random_delay_stays_within_bounds() {
        let mut delay = RandomTypingDelay::new(400, 1200, StdRng::seed_from_u64(5));
        for _ in 0..200 {
            let next = delay.next_delay();
            assert!(next >= Duration::from_millis(400));
            assert!(next <= Duration::from_millis(1200));
        }

        let mut pinned = RandomTypingDelay::new(300, 300, StdRng::seed_from_u64(5));
        assert_eq!(pinned.next_delay(), Duration::from_millis(300));
    }

    #[test]
    fn scripted_delay_repeats_last_entry() {
        let mut delay =
            ScriptedTypingDelay::new([Duration::from_millis(20), Duration::from_millis(40)]);
        assert_eq!(delay.next_delay(), Duration::from_millis(20));
        assert_eq!(delay.next_delay(), Duration::from_millis(40));
        assert_eq!(delay.next_delay(), Duration::from_millis(40));
    }
}

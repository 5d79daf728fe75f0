use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use storefront_agent::{
    storefront_actions, storefront_catalog, ActionRegistry, ConversationSession, Dispatcher,
    RandomTypingDelay,
};
use storefront_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use storefront_core::{ApplicationError, Message, QuickAction};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::commands::CommandResult;
use crate::logging::init_logging;

const BANNER: &str = "Storefront assistant. Type a message, `/go <n>` to follow a quick action, \
`/context` to inspect the conversation, `/quit` to leave.";

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

pub fn run(options: ChatOptions) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        config_path: options.config_path,
        require_file: false,
        overrides: options.overrides,
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2)
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("chat", "runtime", error.to_string(), 1),
    };

    runtime.block_on(async {
        let input = BufReader::new(tokio::io::stdin());
        tokio::select! {
            result = converse(&config, input, tokio::io::stdout()) => result,
            _ = tokio::signal::ctrl_c() => {
                CommandResult::success("chat", "conversation interrupted")
            }
        }
    })
}

/// Runs a paced conversation over line-oriented input until `/quit` or end of
/// input. Replies still pending at end of input are awaited before returning.
pub async fn converse<I, O>(config: &AppConfig, input: I, output: O) -> CommandResult
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    match chat_loop(config, input, output).await {
        Ok(replies) => {
            CommandResult::success("chat", format!("conversation ended after {replies} replies"))
        }
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 1),
    }
}

enum ChatInput {
    Quit,
    Context,
    Follow(usize),
    Message(String),
}

fn parse_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    match trimmed {
        "/quit" | "/exit" => ChatInput::Quit,
        "/context" => ChatInput::Context,
        _ => match trimmed.strip_prefix("/go ").map(|rest| rest.trim().parse::<usize>()) {
            Some(Ok(index)) => ChatInput::Follow(index),
            _ => ChatInput::Message(trimmed.to_string()),
        },
    }
}

struct Transcript<O> {
    output: O,
    outstanding: usize,
    delivered: usize,
    last_actions: Vec<QuickAction>,
}

impl<O: AsyncWrite + Unpin> Transcript<O> {
    async fn line(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await.context("flushing chat output")
    }

    async fn reply(&mut self, message: Message) -> Result<()> {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.delivered += 1;

        self.line(&format!("bot> {}", message.content)).await?;
        for (index, action) in message.actions.iter().enumerate() {
            self.line(&format!("  [{}] {} ({})", index + 1, action.label, action.action_id))
                .await?;
        }
        self.last_actions = message.actions;
        Ok(())
    }

    async fn drain(&mut self, replies: &mut UnboundedReceiver<Message>) -> Result<()> {
        while self.outstanding > 0 {
            match replies.recv().await {
                Some(message) => self.reply(message).await?,
                None => {
                    self.outstanding = 0;
                    break;
                }
            }
        }
        Ok(())
    }
}

async fn chat_loop<I, O>(config: &AppConfig, input: I, output: O) -> Result<usize>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let catalog = storefront_catalog().context("loading storefront intents")?;
    let dispatcher = Dispatcher::seeded(Arc::new(catalog), config.assistant.seed);
    let delay = RandomTypingDelay::from_config(&config.assistant);
    let (session, mut replies) = ConversationSession::start(dispatcher, delay);
    let registry = storefront_actions();

    info!(
        event_name = "cli.chat.started",
        session_id = %session.session_id(),
        "interactive chat started"
    );

    let mut transcript =
        Transcript { output, outstanding: 0, delivered: 0, last_actions: Vec::new() };
    let mut lines = input.lines();
    transcript.line(BANNER).await?;

    loop {
        tokio::select! {
            reply = replies.recv(), if transcript.outstanding > 0 => match reply {
                Some(message) => transcript.reply(message).await?,
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line.context("reading chat input")? else {
                    transcript.drain(&mut replies).await?;
                    break;
                };

                match parse_input(&line) {
                    ChatInput::Quit => break,
                    ChatInput::Context => {
                        transcript.drain(&mut replies).await?;
                        let context = serde_json::to_string(&session.context())?;
                        transcript.line(&format!("context> {context}")).await?;
                    }
                    ChatInput::Follow(index) => {
                        transcript.drain(&mut replies).await?;
                        let text =
                            follow(&session, &registry, &transcript.last_actions, index).await;
                        transcript.line(&text).await?;
                    }
                    ChatInput::Message(text) => {
                        if session.send(&text)?.is_some() {
                            transcript.outstanding += 1;
                        }
                    }
                }
            }
        }
    }

    let delivered = transcript.delivered;
    session.shutdown().await;
    Ok(delivered)
}

async fn follow(
    session: &ConversationSession,
    registry: &ActionRegistry,
    actions: &[QuickAction],
    index: usize,
) -> String {
    let Some(action) = index.checked_sub(1).and_then(|position| actions.get(position)) else {
        return format!("action> no quick action #{index} in the last reply");
    };

    match session.activate(registry, action).await {
        Ok(outcome) => format!("action> {}: {}", outcome.action_id, outcome.detail),
        Err(error) => {
            let interface = ApplicationError::from(error).into_interface(session.session_id());
            format!("action> {}", interface.user_message())
        }
    }
}

//! Telegram transport and long-polling dispatcher.
//!
//! [`TelegramTransport`] implements the outbound [`Transport`] operations on a
//! `teloxide::Bot`. [`run_polling`] deletes any registered webhook, then feeds
//! every message update into the [`MessagePipeline`]. Each message runs on its
//! own task, so a slow backend call in one chat never holds up another.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, Update};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::{ConversationId, Transport, TransportError};
use crate::pipeline::{InboundMessage, MessagePipeline};

/// Outbound Telegram operations.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TelegramTransport([REDACTED])")
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), TransportError> {
        self.bot
            .send_message(ChatId(conversation.as_i64()), text)
            .await
            .map_err(|e| TransportError::with_source("send_message failed", e))?;
        Ok(())
    }

    async fn send_typing(&self, conversation: ConversationId) -> Result<(), TransportError> {
        self.bot
            .send_chat_action(ChatId(conversation.as_i64()), ChatAction::Typing)
            .await
            .map_err(|e| TransportError::with_source("send_chat_action failed", e))?;
        Ok(())
    }
}

/// How an incoming text is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/start` (optionally `/start@botname` or with a payload).
    Start,
    /// Any other `/command`; not forwarded to the backend.
    OtherCommand(String),
    /// Plain text (or no text) for the pipeline.
    Message,
}

/// Decide where a message goes.
///
/// Only a leading `/` followed by a command word counts as a command; a bare
/// `/` or text that merely contains a slash goes to the pipeline.
pub fn route(text: Option<&str>) -> Route {
    let Some(text) = text.map(str::trim_start) else {
        return Route::Message;
    };
    let Some(rest) = text.strip_prefix('/') else {
        return Route::Message;
    };

    let word = rest.split(char::is_whitespace).next().unwrap_or_default();
    let command = word.split('@').next().unwrap_or_default();
    if command.is_empty() {
        return Route::Message;
    }
    if command == "start" {
        Route::Start
    } else {
        Route::OtherCommand(command.to_string())
    }
}

/// Shared state handed to the dispatcher endpoint.
#[derive(Clone)]
struct Relay {
    pipeline: Arc<MessagePipeline>,
    tasks: TaskTracker,
}

async fn message_endpoint(msg: Message, relay: Relay) -> ResponseResult<()> {
    let conversation = ConversationId(msg.chat.id.0);
    let text = msg.text().map(str::to_string);
    debug!(chat_id = %conversation, has_text = text.is_some(), "Message received");

    match route(text.as_deref()) {
        Route::Start => {
            let pipeline = Arc::clone(&relay.pipeline);
            relay.tasks.spawn(async move {
                pipeline.greet(conversation).await;
            });
        }
        Route::OtherCommand(command) => {
            debug!(chat_id = %conversation, command = %command, "Ignoring unsupported command");
        }
        Route::Message => {
            let pipeline = Arc::clone(&relay.pipeline);
            relay.tasks.spawn(async move {
                pipeline.handle(InboundMessage { conversation, text }).await;
            });
        }
    }
    Ok(())
}

/// Poll Telegram until Ctrl-C, then wait for in-flight messages to finish.
pub async fn run_polling(bot: Bot, pipeline: Arc<MessagePipeline>) {
    if let Err(e) = bot.delete_webhook().await {
        warn!("Failed to remove webhook before polling: {}", e);
    } else {
        info!("Webhook removed");
    }

    let relay = Relay {
        pipeline,
        tasks: TaskTracker::new(),
    };
    let tasks = relay.tasks.clone();

    let handler = dptree::entry().branch(Update::filter_message().endpoint(message_endpoint));

    info!("Starting long polling");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error while handling an update",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tasks.close();
    info!(in_flight = tasks.len(), "Dispatcher stopped, draining in-flight messages");
    tasks.wait().await;
}

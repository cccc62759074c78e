//! The Telegram Bot API webhook that forwards chat messages to the [IngestionHandler].
//!
//! Telegram lets a webhook answer an update with a Bot API method call in
//! the response body, so replies are sent without an outgoing HTTP client.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::ingest::{IngestionHandler, replies};

/// The header Telegram uses to echo the secret token set with `setWebhook`.
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// The state needed by the bot's routes.
#[derive(Clone)]
pub struct BotState {
    /// Handles the text of incoming messages.
    pub handler: IngestionHandler,
    /// If set, requests must carry this value in [SECRET_TOKEN_HEADER].
    pub webhook_secret: Option<String>,
}

/// The subset of a Telegram `Update` the bot reads.
#[derive(Debug, Deserialize)]
pub struct Update {
    /// Telegram's sequential ID for the update.
    pub update_id: i64,
    /// The new message, if the update is one.
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Deserialize)]
pub struct Message {
    /// The chat the message was sent in, and where the reply goes.
    pub chat: Chat,
    /// The message text. Missing for stickers, photos and the like.
    pub text: Option<String>,
}

/// A Telegram chat.
#[derive(Debug, Deserialize)]
pub struct Chat {
    /// The chat's ID, used as `chat_id` in replies.
    pub id: i64,
}

/// A `sendMessage` call returned in the webhook response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SendMessage {
    pub method: String,
    pub chat_id: i64,
    pub text: String,
}

impl SendMessage {
    fn new(chat_id: i64, text: &str) -> Self {
        Self {
            method: "sendMessage".to_owned(),
            chat_id,
            text: text.to_owned(),
        }
    }
}

/// Middleware that rejects requests whose [SECRET_TOKEN_HEADER] does not
/// match [BotState::webhook_secret] with a 401, before the body is read.
///
/// Every request passes when no secret is set.
pub async fn verify_secret_token(
    State(state): State<BotState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ref secret) = state.webhook_secret {
        let token = request
            .headers()
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        if token != Some(secret.as_str()) {
            tracing::warn!(
                "Rejected {} {} with a bad secret token",
                request.method(),
                request.uri()
            );
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    next.run(request).await
}

/// Receive an update from Telegram and answer text messages.
///
/// Updates without a text message (stickers, edits, joins) are acknowledged
/// with an empty response so Telegram does not resend them.
pub async fn telegram_webhook(
    State(state): State<BotState>,
    Json(update): Json<Update>,
) -> Response {
    let Some((chat_id, text)) = update
        .message
        .and_then(|message| message.text.map(|text| (message.chat.id, text)))
    else {
        tracing::debug!("Ignoring update {} without a text message", update.update_id);
        return StatusCode::OK.into_response();
    };

    // The handler sleeps between retries, keep it off the async workers.
    let handler = state.handler;
    let reply = tokio::task::spawn_blocking(move || handler.handle_message(&text))
        .await
        .unwrap_or_else(|error| {
            tracing::error!("Message handler failed: {error}");
            replies::UNEXPECTED
        });

    Json(SendMessage::new(chat_id, reply)).into_response()
}

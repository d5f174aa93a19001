//! Telegram Bot API transport.
//!
//! Outbound alerts go through `sendMessage` with an `inline_keyboard` reply
//! markup carrying the single link button. Inbound registration commands
//! arrive through `getUpdates` long-polling (see [`crate::register`]).
//!
//! Only the handful of fields this crate reads are modelled; everything else
//! in the Bot API payloads is ignored by serde.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use listing_watch_core::notify::{Message, Notifier};

use crate::config::TelegramConfig;

/// Thin client over the Bot API methods this crate uses.
pub struct TelegramBot {
    client: reqwest::Client,
    endpoint: String,
    send_timeout: Duration,
    poll_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// One entry of a `getUpdates` result.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config.token()?;
        Self::new(config, &token)
    }

    async fn call<T>(&self, method: &str, body: &Value, timeout: Duration) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {} request failed", method))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Telegram {} returned an unreadable body ({})", method, status))?;

        if !parsed.ok {
            bail!(
                "Telegram {} error {}: {}",
                method,
                status,
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .ok_or_else(|| anyhow::anyhow!("Telegram {} response has no result", method))
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        // Leave headroom over the server-side long-poll duration
        let timeout = Duration::from_secs(self.poll_timeout_secs.saturating_add(10));
        self.call("getUpdates", &body, timeout).await
    }
}

/// `sendMessage` payload for a [`Message`].
pub fn send_message_body(chat_id: i64, message: &Message) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": message.text,
    });
    if let Some(button) = &message.button {
        body["reply_markup"] = json!({
            "inline_keyboard": [[{ "text": button.text, "url": button.url }]]
        });
    }
    body
}

#[async_trait]
impl Notifier for TelegramBot {
    async fn send(&self, chat_id: i64, message: &Message) -> Result<()> {
        let body = send_message_body(chat_id, message);
        let _: Value = self.call("sendMessage", &body, self.send_timeout).await?;
        Ok(())
    }
}

/// Whether a message text is the registration command (`/start`, optionally
/// addressed as `/start@bot_name` or followed by a payload).
pub fn is_registration_command(text: &str) -> bool {
    let first = text.split_whitespace().next().unwrap_or("");
    let command = first.split('@').next().unwrap_or("");
    command == "/start"
}

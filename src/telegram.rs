use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::TelegramConfig;
use crate::conversation::{ChatId, Inbound, Keyboard, Replier};

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("request to the Bot API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Bot API error ({status}): {description}")]
    Api {
        status: StatusCode,
        description: String,
    },

    #[error("invalid Bot API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

impl Update {
    /// The chat and dialogue event carried by this update, if it is a text
    /// message.
    pub fn event(&self) -> Option<(ChatId, Inbound)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?;
        Some((message.chat.id, Inbound::parse(text)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl OutgoingMessage {
    pub fn new(chat_id: ChatId, text: impl ToString) -> Self {
        Self {
            chat_id,
            text: text.to_string(),
            reply_markup: None,
        }
    }

    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.reply_markup = ReplyMarkup::from_keyboard(keyboard);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub one_time_keyboard: bool,
    pub resize_keyboard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

impl ReplyMarkup {
    pub fn from_keyboard(keyboard: Keyboard) -> Option<ReplyMarkup> {
        match keyboard {
            Keyboard::Unchanged => None,
            Keyboard::Menu(options) => Some(ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
                keyboard: options
                    .into_iter()
                    .map(|text| vec![KeyboardButton { text }])
                    .collect(),
                one_time_keyboard: true,
                resize_keyboard: true,
            })),
            Keyboard::Remove => Some(ReplyMarkup::Remove(ReplyKeyboardRemove {
                remove_keyboard: true,
            })),
        }
    }
}

/// Minimal Bot API client: long polling plus the two send methods the bot
/// needs.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/bot{token}", config.api_url.trim_end_matches('/')),
            poll_timeout_secs: config.poll_timeout_secs,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, TelegramError> {
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Api {
                    status,
                    description: body,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } if status.is_success() => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::Api {
                status,
                description: description.unwrap_or_else(|| String::from("no description")),
            }),
        }
    }

    /// Long poll for updates starting at `offset`.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", self.poll_timeout_secs as i64)])
            .send()
            .await?;

        let updates: Vec<Update> = Self::read_response(response).await?;
        trace!("received {} updates", updates.len());
        Ok(updates)
    }

    #[instrument(skip(self, message), fields(chat = message.chat_id))]
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TelegramError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(message)
            .send()
            .await?;

        Self::read_response::<serde_json::Value>(response).await?;
        debug!("sent message");
        Ok(())
    }

    #[instrument(skip(self, caption))]
    pub async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TelegramError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TelegramError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("chart.png"));
        let photo = Part::bytes(bytes).file_name(file_name).mime_str("image/png")?;

        let mut form = Form::new()
            .text("chat_id", chat.to_string())
            .part("photo", photo);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        Self::read_response::<serde_json::Value>(response).await?;
        debug!("sent photo {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl Replier for TelegramClient {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Keyboard) -> anyhow::Result<()> {
        let message = OutgoingMessage::new(chat, text).keyboard(keyboard);
        self.send_message(&message).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> anyhow::Result<()> {
        TelegramClient::send_photo(self, chat, path, caption).await?;
        Ok(())
    }
}

use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use url::Url;

use crate::TelegramError;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base: String,
    pub connect_timeout: Duration,
    /// Must stay above `long_poll_timeout`, otherwise every idle poll times out.
    pub request_timeout: Duration,
    /// How long Telegram may hold `getUpdates` open waiting for new updates.
    pub long_poll_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            long_poll_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

/// Minimal Bot API client: long-poll for updates and send text replies.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: Url,
    settings: ClientSettings,
}

impl TelegramClient {
    pub fn new(token: &str, settings: ClientSettings) -> Result<Self, TelegramError> {
        let base = Url::parse(&format!(
            "{}/bot{}/",
            settings.api_base.trim_end_matches('/'),
            token
        ))
        // Keep the token out of the error.
        .map_err(|_| TelegramError::InvalidUrl(settings.api_base.clone()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TelegramError::Network(err.without_url().to_string()))?;

        Ok(Self {
            http,
            base,
            settings,
        })
    }

    /// Updates with id `>= offset`, at most `limit` of them. Telegram holds the
    /// request open for up to `long_poll_timeout` when nothing is pending.
    pub async fn updates(&self, offset: i64, limit: usize) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                (
                    "timeout",
                    self.settings.long_poll_timeout.as_secs().to_string(),
                ),
            ],
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let _: IgnoredAny = self
            .call(
                "sendMessage",
                &[("chat_id", chat_id.to_string()), ("text", text.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, TelegramError> {
        let mut url = self
            .base
            .join(method)
            .map_err(|_| TelegramError::InvalidUrl(method.to_string()))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        // Telegram reports most failures as a JSON envelope with ok=false, even
        // on non-2xx statuses. Only fall back to the status when the body is not
        // an envelope.
        let envelope: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::HttpStatus(status.as_u16()));
            }
            Err(err) => return Err(TelegramError::Decode(err.to_string())),
        };

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.or(Some(i64::from(status.as_u16()))),
                description: envelope.description.unwrap_or_default(),
            });
        }
        envelope
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{method}: missing result")))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TelegramError {
    // The request url embeds the bot token.
    let err = err.without_url();
    if err.is_timeout() {
        return TelegramError::Timeout;
    }
    TelegramError::Network(err.to_string())
}

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

/// Outgoing-webhook payload as sent by Mattermost and Slack-compatible chat
/// servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookRequest {
    pub token: String,
    pub user_name: String,
    pub text: String,
    pub trigger_word: Option<String>,
}

impl WebhookRequest {
    /// The message text without the trigger word that fired the webhook.
    pub fn command_text(&self) -> &str {
        let text = self.text.trim();
        match self.trigger_word.as_deref().map(str::trim) {
            Some(trigger) if !trigger.is_empty() => {
                text.strip_prefix(trigger).unwrap_or(text).trim()
            }
            _ => text,
        }
    }

    pub fn creator(&self) -> &str {
        match self.user_name.trim() {
            "" => "anonymous",
            name => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub text: String,
}

impl WebhookResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl<S> FromRequest<S> for WebhookRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(payload) = Form::<WebhookRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(payload)
        } else {
            let Json(payload) = Json::<WebhookRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(payload)
        }
    }
}

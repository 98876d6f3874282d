use std::sync::Arc;

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ExplError;
use crate::webhook::{Webhook, WebhookHandler, WebhookRequest, WebhookResponse};

/// Ensure the webhook payload carries the operation's shared secret.
///
/// The comparison is constant-time and exact; an empty secret never matches.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

/// Stage that rejects a webhook call before it reaches `inner` unless the
/// payload token equals `secret`.
pub fn require_token(secret: Arc<str>) -> impl Fn(Webhook) -> Webhook + Clone {
    move |inner: Webhook| -> Webhook {
        Arc::new(RequireToken {
            secret: secret.clone(),
            inner,
        })
    }
}

struct RequireToken {
    secret: Arc<str>,
    inner: Webhook,
}

#[async_trait]
impl WebhookHandler for RequireToken {
    async fn handle(&self, req: WebhookRequest) -> Result<WebhookResponse, ExplError> {
        if !token_matches(&req.token, &self.secret) {
            warn!(user = %req.user_name, "webhook call rejected: token mismatch");
            return Err(ExplError::Unauthorized);
        }
        self.inner.handle(req).await
    }
}

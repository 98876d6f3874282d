//! Authenticated command surface.
//!
//! Webhook handlers work on parsed payloads rather than HTTP requests, so the
//! shared-secret stage can wrap them without knowing about HTTP, and
//! [`into_http`] turns the result into a route.

pub mod payload;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::routing::{MethodRouter, post};
use tracing::info;

pub use payload::{WebhookRequest, WebhookResponse};

use crate::error::ExplError;
use crate::middleware::ClientAddr;

#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, req: WebhookRequest) -> Result<WebhookResponse, ExplError>;
}

pub type Webhook = Arc<dyn WebhookHandler>;

pub fn webhook(handler: impl WebhookHandler + 'static) -> Webhook {
    Arc::new(handler)
}

/// Serve `handler` as a `POST` route taking a JSON or form-encoded payload.
pub fn into_http<S>(handler: Webhook) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    post(move |client: Option<ClientAddr>, req: WebhookRequest| {
        let handler = handler.clone();
        async move {
            let client = client.map_or_else(|| "unknown".to_string(), |ClientAddr(ip)| ip.to_string());
            info!(client = %client, user = %req.user_name, "webhook call");
            handler.handle(req).await.map(Json)
        }
    })
}

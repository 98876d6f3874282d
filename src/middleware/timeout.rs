use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use tracing::warn;

use crate::error::ExplError;

/// Bound the wrapped route to `limit`.
///
/// When the limit elapses the inner future is dropped, which cancels whatever
/// it was awaiting (database queries included), and a timeout response is
/// returned instead.
pub fn timeout<S>(limit: Duration) -> impl Fn(MethodRouter<S>) -> MethodRouter<S> + Clone
where
    S: Clone + Send + Sync + 'static,
{
    move |route: MethodRouter<S>| {
        route.layer(middleware::from_fn_with_state(limit, enforce_timeout))
    }
}

async fn enforce_timeout(State(limit): State<Duration>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(resp) => resp,
        Err(_) => {
            let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(path = %path, limit_ms, "request timed out");
            ExplError::Timeout.into_response()
        }
    }
}

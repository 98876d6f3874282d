//! Anonymous redemption of links minted by the webhook surface.
//!
//! Any failure to verify a token is answered like a missing resource so the
//! caller cannot tell a forged token from an expired one.

use axum::extract::{Path, State};
use tracing::debug;

use crate::db::IndexedEntry;
use crate::error::ExplError;
use crate::router::AppState;

/// GET /expl/{token} -> all entries of the key the token was minted for.
pub async fn expl_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<String, ExplError> {
    let key = redeem(&state, &token)?;
    let entries = state.db.list_entries(&key).await?;
    render(&state, &entries)
}

/// GET /find/{token} -> all entries matching the query the token was minted for.
pub async fn find_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<String, ExplError> {
    let query = redeem(&state, &token)?;
    let entries = state.db.find_entries(&query).await?;
    render(&state, &entries)
}

fn redeem(state: &AppState, token: &str) -> Result<String, ExplError> {
    state
        .codec
        .verify(token, state.clock.now())
        .inspect_err(|e| debug!(error = %e, "link rejected"))
        .map_err(ExplError::from)
}

fn render(state: &AppState, entries: &[IndexedEntry]) -> Result<String, ExplError> {
    if entries.is_empty() {
        return Err(ExplError::NotFound);
    }
    Ok(state.formatter.format_all(entries))
}

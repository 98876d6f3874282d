//! The five webhook operations. Each one parses the command text of the
//! payload; authentication has already happened in the stage around it.

use async_trait::async_trait;
use tracing::info;

use crate::db::IndexedEntry;
use crate::error::ExplError;
use crate::router::AppState;
use crate::types::IndexSpec;
use crate::webhook::{WebhookHandler, WebhookRequest, WebhookResponse};

const NO_ENTRIES: &str = "No entries found.";

/// Split off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

fn select(entries: Vec<IndexedEntry>, spec: &IndexSpec) -> Vec<IndexedEntry> {
    let positions = spec.select(entries.len());
    entries
        .into_iter()
        .enumerate()
        .filter(|(pos, _)| positions.binary_search(pos).is_ok())
        .map(|(_, e)| e)
        .collect()
}

/// `add <key> <value>`
#[derive(Clone)]
pub struct AddHandler {
    state: AppState,
}

impl AddHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl WebhookHandler for AddHandler {
    async fn handle(&self, req: WebhookRequest) -> Result<WebhookResponse, ExplError> {
        let (key, value) = split_word(req.command_text());
        if key.is_empty() || value.is_empty() {
            return Err(ExplError::InvalidInput("usage: <key> <value>".to_string()));
        }

        let settings = &self.state.settings;
        if utf16_len(key) > settings.max_key_length {
            return Err(ExplError::InvalidInput(format!(
                "key longer than {} characters",
                settings.max_key_length
            )));
        }
        if utf16_len(value) > settings.max_value_length {
            return Err(ExplError::InvalidInput(format!(
                "value longer than {} characters",
                settings.max_value_length
            )));
        }

        let entry = self
            .state
            .db
            .add_entry(key, value, req.creator(), self.state.clock.now())
            .await?;
        info!(key = %key, index = entry.index, user = %req.creator(), "entry added");
        Ok(WebhookResponse::text(self.state.formatter.format(&entry)))
    }
}

/// `expl <key> [index-spec]`
#[derive(Clone)]
pub struct ExplHandler {
    state: AppState,
}

impl ExplHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl WebhookHandler for ExplHandler {
    async fn handle(&self, req: WebhookRequest) -> Result<WebhookResponse, ExplError> {
        let (key, spec) = split_word(req.command_text());
        if key.is_empty() {
            return Err(ExplError::InvalidInput("usage: <key> [index]".to_string()));
        }
        let spec: IndexSpec = spec.parse()?;

        let entries = select(self.state.db.list_entries(key).await?, &spec);
        if entries.is_empty() {
            return Ok(WebhookResponse::text(NO_ENTRIES));
        }

        let settings = &self.state.settings;
        let text = self.state.list_formatter().render(
            &entries,
            settings.max_expl_count,
            "expl",
            key,
            settings.expl_token_validity(),
        );
        Ok(WebhookResponse::text(text))
    }
}

/// `del <key> <index-spec>`
#[derive(Clone)]
pub struct DelHandler {
    state: AppState,
}

impl DelHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl WebhookHandler for DelHandler {
    async fn handle(&self, req: WebhookRequest) -> Result<WebhookResponse, ExplError> {
        let (key, spec) = split_word(req.command_text());
        let spec: IndexSpec = spec.parse()?;
        if key.is_empty() || spec.is_all() {
            return Err(ExplError::InvalidInput("usage: <key> <index>".to_string()));
        }

        let entries = select(self.state.db.list_entries(key).await?, &spec);
        if entries.is_empty() {
            return Ok(WebhookResponse::text(NO_ENTRIES));
        }

        let ids: Vec<i64> = entries.iter().map(|e| e.entry.id).collect();
        let removed = self.state.db.delete_entries(&ids).await?;
        info!(key = %key, removed, user = %req.creator(), "entries deleted");
        Ok(WebhookResponse::text(self.state.formatter.format_all(&entries)))
    }
}

/// `find <query>`
#[derive(Clone)]
pub struct FindHandler {
    state: AppState,
}

impl FindHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl WebhookHandler for FindHandler {
    async fn handle(&self, req: WebhookRequest) -> Result<WebhookResponse, ExplError> {
        let query = req.command_text();
        if query.is_empty() {
            return Err(ExplError::InvalidInput("usage: <query>".to_string()));
        }

        let entries = self.state.db.find_entries(query).await?;
        if entries.is_empty() {
            return Ok(WebhookResponse::text(NO_ENTRIES));
        }

        let settings = &self.state.settings;
        let text = self.state.list_formatter().render(
            &entries,
            settings.max_find_count,
            "find",
            query,
            settings.find_token_validity(),
        );
        Ok(WebhookResponse::text(text))
    }
}

/// `top`
#[derive(Clone)]
pub struct TopHandler {
    state: AppState,
}

impl TopHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl WebhookHandler for TopHandler {
    async fn handle(&self, _req: WebhookRequest) -> Result<WebhookResponse, ExplError> {
        let top = self
            .state
            .db
            .top_keys(self.state.settings.max_top_count)
            .await?;
        if top.is_empty() {
            return Ok(WebhookResponse::text(NO_ENTRIES));
        }

        let text = top
            .iter()
            .map(|k| format!("{} ({})", k.key, k.count))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(WebhookResponse::text(text))
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::db::IndexedEntry;
use crate::router::AppState;
use crate::security::{Clock, TokenCodec};
use crate::types::EntryFormatter;

/// Formats a bounded entry list and appends a public link to the full list.
pub struct EntryListFormatter {
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    formatter: Arc<EntryFormatter>,
    public_url: String,
}

impl EntryListFormatter {
    pub fn new(state: &AppState) -> Self {
        Self {
            codec: state.codec.clone(),
            clock: state.clock.clone(),
            formatter: state.formatter.clone(),
            public_url: state.settings.public_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<public_url>/<route>/<token>` for a token bound to `resource`.
    pub fn link(&self, route: &str, resource: &str, validity: Duration) -> String {
        let token = self.codec.mint(resource, validity, self.clock.now());
        format!("{}/{}/{}", self.public_url, route, token)
    }

    /// At most `max` lines, a note on how many were left out, and a link
    /// under `route` that shows everything `resource` refers to.
    pub fn render(
        &self,
        entries: &[IndexedEntry],
        max: usize,
        route: &str,
        resource: &str,
        validity: Duration,
    ) -> String {
        let mut out = self.formatter.format_all(entries.iter().take(max));
        if entries.len() > max {
            out.push_str(&format!("\n... and {} more", entries.len() - max));
        }
        out.push_str(&format!("\nFull list: {}", self.link(route, resource, validity)));
        out
    }
}

use chrono::FixedOffset;
use chrono::format::{Item, StrftimeItems};

use crate::db::IndexedEntry;
use crate::error::ExplError;

/// Renders entries as `key[index]: value (creator, created)`.
#[derive(Debug, Clone)]
pub struct EntryFormatter {
    time_format: String,
    offset: FixedOffset,
}

impl EntryFormatter {
    /// Fails on a format string chrono cannot render.
    pub fn new(time_format: impl Into<String>, offset: FixedOffset) -> Result<Self, ExplError> {
        let time_format = time_format.into();
        if StrftimeItems::new(&time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ExplError::InvalidConfig(format!(
                "invalid time format: {time_format:?}"
            )));
        }
        Ok(Self {
            time_format,
            offset,
        })
    }

    pub fn format(&self, e: &IndexedEntry) -> String {
        let created = e
            .entry
            .created
            .with_timezone(&self.offset)
            .format(&self.time_format);
        format!(
            "{}[{}]: {} ({}, {})",
            e.entry.key, e.index, e.entry.value, e.entry.creator, created
        )
    }

    pub fn format_all<'a>(&self, entries: impl IntoIterator<Item = &'a IndexedEntry>) -> String {
        entries
            .into_iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Entry {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub creator: String,
    pub created: DateTime<Utc>,
}

/// An entry together with its 1-based position among the entries of its key.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub index: usize,
    pub entry: Entry,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct KeyCount {
    pub key: String,
    pub count: i64,
}

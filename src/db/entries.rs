use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::ExplDb;
use super::models::{Entry, IndexedEntry, KeyCount};
use crate::error::ExplError;

#[derive(FromRow)]
struct IndexedRow {
    idx: i64,
    #[sqlx(flatten)]
    entry: Entry,
}

impl From<IndexedRow> for IndexedEntry {
    fn from(row: IndexedRow) -> Self {
        IndexedEntry {
            index: usize::try_from(row.idx).unwrap_or_default(),
            entry: row.entry,
        }
    }
}

/// Entries numbered per key, case-insensitively, by creation time with the id
/// breaking ties.
const NUMBERED: &str = r#"
    SELECT id, key, value, creator, created,
           ROW_NUMBER() OVER (PARTITION BY lower(key) ORDER BY created, id) AS idx
    FROM entries
"#;

impl ExplDb {
    /// Insert a new entry and return it with its index within its key.
    pub async fn add_entry(
        &self,
        key: &str,
        value: &str,
        creator: &str,
        created: DateTime<Utc>,
    ) -> Result<IndexedEntry, ExplError> {
        let mut tx = self.pool.begin().await?;

        let entry: Entry = sqlx::query_as(
            r#"INSERT INTO entries (key, value, creator, created) VALUES (?, ?, ?, ?)
               RETURNING id, key, value, creator, created"#,
        )
        .bind(key)
        .bind(value)
        .bind(creator)
        .bind(created)
        .fetch_one(&mut *tx)
        .await?;

        let (idx,): (i64,) = sqlx::query_as(&format!("SELECT idx FROM ({NUMBERED}) WHERE id = ?"))
            .bind(entry.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(IndexedEntry {
            index: usize::try_from(idx).unwrap_or_default(),
            entry,
        })
    }

    /// All entries of `key`, oldest first.
    pub async fn list_entries(&self, key: &str) -> Result<Vec<IndexedEntry>, ExplError> {
        let rows: Vec<IndexedRow> = sqlx::query_as(&format!(
            "SELECT * FROM ({NUMBERED}) WHERE lower(key) = lower(?) ORDER BY idx"
        ))
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Entries whose key or value contains `query`, ignoring ASCII case.
    pub async fn find_entries(&self, query: &str) -> Result<Vec<IndexedEntry>, ExplError> {
        let rows: Vec<IndexedRow> = sqlx::query_as(&format!(
            r#"SELECT * FROM ({NUMBERED})
               WHERE instr(lower(key), lower(?1)) > 0 OR instr(lower(value), lower(?1)) > 0
               ORDER BY lower(key), idx"#
        ))
        .bind(query)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete entries by id in one transaction. Returns the number removed.
    pub async fn delete_entries(&self, ids: &[i64]) -> Result<u64, ExplError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for id in ids {
            removed += sqlx::query("DELETE FROM entries WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    /// Keys with the most entries, largest first.
    pub async fn top_keys(&self, limit: usize) -> Result<Vec<KeyCount>, ExplError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as(
            r#"SELECT MIN(key) AS key, COUNT(*) AS count
               FROM entries
               GROUP BY lower(key)
               ORDER BY count DESC, lower(key)
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

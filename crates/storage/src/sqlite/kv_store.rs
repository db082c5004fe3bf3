use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{KeyValueStore, Revision, StorageError, StoredValue};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn revision_from_i64(v: i64) -> Result<Revision, StorageError> {
    u64::try_from(v)
        .map(Revision::new)
        .map_err(|_| StorageError::Serialization(format!("invalid revision: {v}")))
}

fn revision_to_i64(rev: Revision) -> Result<i64, StorageError> {
    i64::try_from(rev.value()).map_err(|_| StorageError::Serialization("revision overflow".into()))
}

#[async_trait]
impl KeyValueStore for SqliteRepository {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StorageError> {
        let row = sqlx::query("SELECT value, revision FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.try_get("value").map_err(ser)?;
        let revision = revision_from_i64(row.try_get::<i64, _>("revision").map_err(ser)?)?;
        Ok(Some(StoredValue { value, revision }))
    }

    async fn put(&self, key: &str, value: &str) -> Result<Revision, StorageError> {
        let row = sqlx::query(
            r"
                INSERT INTO kv_entries (key, value, revision, updated_at)
                VALUES (?1, ?2, 1, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    revision = kv_entries.revision + 1,
                    updated_at = excluded.updated_at
                RETURNING revision
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        revision_from_i64(row.try_get::<i64, _>("revision").map_err(ser)?)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: &str,
    ) -> Result<Revision, StorageError> {
        let now = Utc::now();
        let affected = match expected {
            None => sqlx::query(
                r"
                    INSERT INTO kv_entries (key, value, revision, updated_at)
                    VALUES (?1, ?2, 1, ?3)
                    ON CONFLICT(key) DO NOTHING
                ",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(conn)?
            .rows_affected(),
            Some(rev) => sqlx::query(
                r"
                    UPDATE kv_entries
                    SET value = ?2, revision = revision + 1, updated_at = ?3
                    WHERE key = ?1 AND revision = ?4
                ",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .bind(revision_to_i64(rev)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?
            .rows_affected(),
        };

        if affected == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(expected.map_or(Revision::new(1), |r| r.next()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT key FROM kv_entries
                WHERE substr(key, 1, length(?1)) = ?1
                ORDER BY key
            ",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(ser))
            .collect()
    }
}

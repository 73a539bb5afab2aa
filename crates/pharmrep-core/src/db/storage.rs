//! Key/value local storage: the cached auth token and sync markers.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

const AUTH_TOKEN_KEY: &str = "auth_token";
const CATALOG_LAST_SYNC_KEY: &str = "catalog_last_sync";

impl Database {
    /// Read a raw value. Empty strings count as absent.
    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Write a raw value.
    pub fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a value. Returns true if something was removed.
    pub fn remove_value(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM local_storage WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }

    /// Cached bearer token, if the user has logged in.
    pub fn get_auth_token(&self) -> DbResult<Option<String>> {
        self.get_value(AUTH_TOKEN_KEY)
    }

    pub fn set_auth_token(&self, token: &str) -> DbResult<()> {
        self.set_value(AUTH_TOKEN_KEY, token)
    }

    pub fn clear_auth_token(&self) -> DbResult<bool> {
        self.remove_value(AUTH_TOKEN_KEY)
    }

    /// RFC 3339 timestamp of the last catalog snapshot write.
    pub fn catalog_last_sync(&self) -> DbResult<Option<String>> {
        self.get_value(CATALOG_LAST_SYNC_KEY)
    }
}

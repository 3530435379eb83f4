use rusqlite::params;
use std::collections::HashMap;

use crate::db::DbPool;

/// Keys of the runtime settings table.
pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const SHOPIFY_STORE_URL: &str = "shopify_store_url";
pub const SHOPIFY_API_TOKEN: &str = "shopify_api_token";
pub const SHOPIFY_API_VERSION: &str = "shopify_api_version";
pub const SCHEMA_VERSION: &str = "schema_version";

const UPSERT: &str = "INSERT INTO settings (key, value) VALUES (?1, ?2)
     ON CONFLICT(key) DO UPDATE SET value = ?2";

pub struct Setting;

impl Setting {
    pub fn get(pool: &DbPool, key: &str) -> Option<String> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .ok()
    }

    pub fn set(pool: &DbPool, key: &str, value: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(UPSERT, params![key, value])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn set_many(pool: &DbPool, settings: &HashMap<String, String>) -> Result<(), String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        for (key, value) in settings {
            tx.execute(UPSERT, params![key, value])
                .map_err(|e| e.to_string())?;
        }
        tx.commit().map_err(|e| e.to_string())
    }

    pub fn delete(pool: &DbPool, key: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

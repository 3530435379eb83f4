use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

/// How many records one import run brought in.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub profiles: i64,
    pub products: i64,
    pub texts: i64,
    pub skipped: i64,
}

/// History entry for a profile import, newest first in listings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImportRun {
    pub id: i64,
    /// Export shape that was read, e.g. `profiles_json` or `legacy_mapping`.
    pub source: String,
    pub filename: Option<String>,
    pub counts: ImportCounts,
    pub log: Vec<String>,
    pub imported_at: NaiveDateTime,
}

const HISTORY_LIMIT: i64 = 50;

impl ImportRun {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let log: Option<String> = row.get("log")?;
        Ok(ImportRun {
            id: row.get("id")?,
            source: row.get("source")?,
            filename: row.get("filename")?,
            counts: ImportCounts {
                profiles: row.get("profiles_count")?,
                products: row.get("products_count")?,
                texts: row.get("texts_count")?,
                skipped: row.get("skipped_count")?,
            },
            log: log
                .map(|l| l.lines().map(String::from).collect())
                .unwrap_or_default(),
            imported_at: row.get("imported_at")?,
        })
    }

    pub fn history(pool: &DbPool) -> Vec<Self> {
        let Ok(conn) = pool.get() else {
            return vec![];
        };
        let Ok(mut stmt) = conn.prepare(
            "SELECT * FROM imports ORDER BY imported_at DESC, id DESC LIMIT ?1",
        ) else {
            return vec![];
        };
        stmt.query_map(params![HISTORY_LIMIT], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Record a finished run and return its id.
    pub fn record(
        pool: &DbPool,
        source: &str,
        filename: Option<&str>,
        counts: &ImportCounts,
        log: &[String],
    ) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let log = (!log.is_empty()).then(|| log.join("\n"));
        conn.execute(
            "INSERT INTO imports (source, filename, profiles_count, products_count,
                texts_count, skipped_count, log)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                source,
                filename,
                counts.profiles,
                counts.products,
                counts.texts,
                counts.skipped,
                log
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }
}

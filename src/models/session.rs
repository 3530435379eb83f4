use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::import::shopify_csv::{CsvSummary, CsvTable};

/// An uploaded export kept for the translator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvFile {
    pub file_id: String,
    pub table: CsvTable,
}

/// Everything a browser session accumulates between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub current_profile: Option<String>,
    pub csv_files: Vec<CsvFile>,
    /// Rows picked out for translation, see `filter-untranslated`.
    pub translation_table: Option<CsvTable>,
}

impl SessionState {
    /// Add an uploaded table under `<filename>_<n>`.
    pub fn add_csv(&mut self, table: CsvTable) -> String {
        let mut n = self.csv_files.len();
        let mut file_id = format!("{}_{}", table.filename, n);
        while self.csv_files.iter().any(|f| f.file_id == file_id) {
            n += 1;
            file_id = format!("{}_{}", table.filename, n);
        }
        self.csv_files.push(CsvFile {
            file_id: file_id.clone(),
            table,
        });
        file_id
    }

    pub fn remove_csv(&mut self, file_id: &str) -> Option<CsvFile> {
        let pos = self.csv_files.iter().position(|f| f.file_id == file_id)?;
        Some(self.csv_files.remove(pos))
    }

    pub fn clear_translator(&mut self) {
        self.csv_files.clear();
        self.translation_table = None;
    }

    /// Totals over every uploaded file.
    pub fn csv_summary(&self) -> CsvSummary {
        let mut summary = CsvSummary::default();
        for file in &self.csv_files {
            let s = file.table.summary();
            summary.total_rows += s.total_rows;
            summary.untranslated_rows += s.untranslated_rows;
            for (locale, stats) in s.locale_stats {
                let entry = summary.locale_stats.entry(locale).or_default();
                entry.total_rows += stats.total_rows;
                entry.needs_translation += stats.needs_translation;
            }
        }
        summary.locales = summary.locale_stats.keys().cloned().collect();
        summary
    }
}

pub struct Session;

impl Session {
    pub fn get(pool: &DbPool, id: &str) -> Option<SessionState> {
        let conn = pool.get().ok()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .ok()?;
        data.and_then(|d| match serde_json::from_str(&d) {
            Ok(state) => Some(state),
            Err(e) => {
                log::warn!("Discarding unreadable session {}: {}", id, e);
                None
            }
        })
    }

    pub fn put(pool: &DbPool, id: &str, state: &SessionState) -> Result<(), String> {
        let data = serde_json::to_string(state).map_err(|e| e.to_string())?;
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO sessions (id, data, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET data = ?2, updated_at = CURRENT_TIMESTAMP",
            params![id, data],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Drop sessions untouched for more than `max_age_days`.
    pub fn cleanup(pool: &DbPool, max_age_days: i64) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "DELETE FROM sessions WHERE updated_at < datetime('now', ?1)",
            params![format!("-{} days", max_age_days)],
        )
        .map_err(|e| e.to_string())
    }

    /// Clear `current_profile` in every session pointing at `profile`.
    pub fn forget_profile(pool: &DbPool, profile: &str) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE sessions SET data = json_set(data, '$.current_profile', NULL)
             WHERE json_extract(data, '$.current_profile') = ?1",
            params![profile],
        )
        .map_err(|e| e.to_string())
    }
}

use std::collections::HashMap;

use crate::models::import::{ImportCounts, ImportRun};
use crate::models::profile::{Product, ProductForm, Profile, ProfileForm};
use crate::models::saved_text::{SavedText, SavedTextForm};
use crate::models::session::SessionState;

pub mod sqlite;

/// Unified data-access trait. Every database operation goes through here.
/// Implementation: `SqliteStore` (wraps rusqlite/r2d2).
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;
    fn seed_defaults(&self) -> Result<(), String>;

    // ── Settings ────────────────────────────────────────────────────
    fn setting_get(&self, key: &str) -> Option<String>;
    fn setting_get_or(&self, key: &str, default: &str) -> String {
        self.setting_get(key).unwrap_or_else(|| default.to_string())
    }
    fn setting_set(&self, key: &str, value: &str) -> Result<(), String>;
    fn setting_set_many(&self, settings: &HashMap<String, String>) -> Result<(), String>;
    fn setting_delete(&self, key: &str) -> Result<(), String>;

    // ── Profiles ────────────────────────────────────────────────────
    fn profile_find(&self, name: &str) -> Option<Profile>;
    fn profile_list(&self) -> Vec<Profile>;
    fn profile_create(&self, form: &ProfileForm) -> Result<(), String>;
    fn profile_update(&self, name: &str, form: &ProfileForm) -> Result<(), String>;
    fn profile_delete(&self, name: &str) -> Result<(), String>;

    // ── Products ────────────────────────────────────────────────────
    fn product_list(&self, profile: &str) -> Vec<Product>;
    fn product_create(&self, profile: &str, form: &ProductForm) -> Result<Product, String>;
    fn product_update(&self, profile: &str, id: &str, form: &ProductForm) -> Result<Product, String>;
    fn product_delete(&self, profile: &str, id: &str) -> Result<(), String>;

    // ── Saved texts ─────────────────────────────────────────────────
    fn saved_text_list(&self, profile: &str) -> Vec<SavedText>;
    fn saved_text_save(&self, profile: &str, form: &SavedTextForm) -> Result<(), String>;
    fn saved_text_auto_save(
        &self,
        profile: &str,
        name: &str,
        content: &str,
        title: &str,
    ) -> Result<(), String>;
    fn saved_text_restore(&self, text: &SavedText) -> Result<(), String>;
    fn saved_text_delete(&self, profile: &str, name: &str) -> Result<(), String>;

    // ── Sessions ────────────────────────────────────────────────────
    fn session_get(&self, id: &str) -> Option<SessionState>;
    fn session_put(&self, id: &str, state: &SessionState) -> Result<(), String>;
    fn task_cleanup_sessions(&self, max_age_days: i64) -> Result<usize, String>;

    // ── Imports ─────────────────────────────────────────────────────
    fn import_history(&self) -> Vec<ImportRun>;
    fn import_record(
        &self,
        source: &str,
        filename: Option<&str>,
        counts: &ImportCounts,
        log: &[String],
    ) -> Result<i64, String>;
}

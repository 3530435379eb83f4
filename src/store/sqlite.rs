use std::collections::HashMap;

use crate::db::DbPool;
use crate::models::import::{ImportCounts, ImportRun};
use crate::models::profile::{Product, ProductForm, Profile, ProfileForm};
use crate::models::saved_text::{SavedText, SavedTextForm};
use crate::models::session::{Session, SessionState};
use crate::models::settings::Setting;

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn new_at(path: &str) -> Result<Self, String> {
        let pool = crate::db::init_pool_at(path)?;
        Ok(Self { pool })
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    fn seed_defaults(&self) -> Result<(), String> {
        crate::db::seed_defaults(&self.pool).map_err(|e| e.to_string())
    }

    // ── Settings ────────────────────────────────────────────────────

    fn setting_get(&self, key: &str) -> Option<String> {
        Setting::get(&self.pool, key)
    }

    fn setting_set(&self, key: &str, value: &str) -> Result<(), String> {
        Setting::set(&self.pool, key, value)
    }

    fn setting_set_many(&self, settings: &HashMap<String, String>) -> Result<(), String> {
        Setting::set_many(&self.pool, settings)
    }

    fn setting_delete(&self, key: &str) -> Result<(), String> {
        Setting::delete(&self.pool, key)
    }

    // ── Profiles ────────────────────────────────────────────────────

    fn profile_find(&self, name: &str) -> Option<Profile> {
        Profile::find(&self.pool, name)
    }

    fn profile_list(&self) -> Vec<Profile> {
        Profile::list(&self.pool)
    }

    fn profile_create(&self, form: &ProfileForm) -> Result<(), String> {
        Profile::create(&self.pool, form)
    }

    fn profile_update(&self, name: &str, form: &ProfileForm) -> Result<(), String> {
        Profile::update(&self.pool, name, form)
    }

    fn profile_delete(&self, name: &str) -> Result<(), String> {
        Profile::delete(&self.pool, name)?;
        Session::forget_profile(&self.pool, name)?;
        Ok(())
    }

    // ── Products ────────────────────────────────────────────────────

    fn product_list(&self, profile: &str) -> Vec<Product> {
        Product::list_for(&self.pool, profile)
    }

    fn product_create(&self, profile: &str, form: &ProductForm) -> Result<Product, String> {
        Product::create(&self.pool, profile, form)
    }

    fn product_update(&self, profile: &str, id: &str, form: &ProductForm) -> Result<Product, String> {
        Product::update(&self.pool, profile, id, form)
    }

    fn product_delete(&self, profile: &str, id: &str) -> Result<(), String> {
        Product::delete(&self.pool, profile, id)
    }

    // ── Saved texts ─────────────────────────────────────────────────

    fn saved_text_list(&self, profile: &str) -> Vec<SavedText> {
        SavedText::list_for(&self.pool, profile)
    }

    fn saved_text_save(&self, profile: &str, form: &SavedTextForm) -> Result<(), String> {
        if !Profile::exists(&self.pool, profile) {
            return Err("Profile not found".into());
        }
        SavedText::save(&self.pool, profile, form)
    }

    fn saved_text_auto_save(
        &self,
        profile: &str,
        name: &str,
        content: &str,
        title: &str,
    ) -> Result<(), String> {
        if !Profile::exists(&self.pool, profile) {
            return Err("Profile not found".into());
        }
        SavedText::auto_save(&self.pool, profile, name, content, title)
    }

    fn saved_text_restore(&self, text: &SavedText) -> Result<(), String> {
        SavedText::restore(&self.pool, text)
    }

    fn saved_text_delete(&self, profile: &str, name: &str) -> Result<(), String> {
        SavedText::delete(&self.pool, profile, name)
    }

    // ── Sessions ────────────────────────────────────────────────────

    fn session_get(&self, id: &str) -> Option<SessionState> {
        Session::get(&self.pool, id)
    }

    fn session_put(&self, id: &str, state: &SessionState) -> Result<(), String> {
        Session::put(&self.pool, id, state)
    }

    fn task_cleanup_sessions(&self, max_age_days: i64) -> Result<usize, String> {
        Session::cleanup(&self.pool, max_age_days)
    }

    // ── Imports ─────────────────────────────────────────────────────

    fn import_history(&self) -> Vec<ImportRun> {
        ImportRun::history(&self.pool)
    }

    fn import_record(
        &self,
        source: &str,
        filename: Option<&str>,
        counts: &ImportCounts,
        log: &[String],
    ) -> Result<i64, String> {
        ImportRun::record(&self.pool, source, filename, counts, log)
    }
}

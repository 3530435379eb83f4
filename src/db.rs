use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::models::settings::SCHEMA_VERSION;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Version written by `run_migrations`.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

pub fn init_pool_at(path: &str) -> Result<DbPool, String> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON;"));
    let pool = Pool::builder()
        .max_size(10)
        .build(manager)
        .map_err(|e| e.to_string())?;

    // WAL for better concurrent read performance
    let conn = pool.get().map_err(|e| e.to_string())?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .map_err(|e| e.to_string())?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Settings (key-value)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        -- Writing profiles
        CREATE TABLE IF NOT EXISTS profiles (
            name TEXT PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            brand_values TEXT NOT NULL DEFAULT '',
            tone TEXT NOT NULL DEFAULT '',
            api_key TEXT NOT NULL DEFAULT '',
            blocked_words TEXT NOT NULL DEFAULT '[]',
            url TEXT NOT NULL DEFAULT '',
            internal_links TEXT NOT NULL DEFAULT '',
            shopify_store_url TEXT NOT NULL DEFAULT '',
            shopify_api_token TEXT NOT NULL DEFAULT '',
            shopify_api_version TEXT NOT NULL DEFAULT '',
            settings TEXT NOT NULL DEFAULT '{}',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Products per profile
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            profile_name TEXT NOT NULL REFERENCES profiles(name) ON DELETE CASCADE ON UPDATE CASCADE,
            position INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL,
            url TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_products_profile ON products(profile_name, position);

        -- Saved texts per profile
        CREATE TABLE IF NOT EXISTS saved_texts (
            id INTEGER PRIMARY KEY,
            profile_name TEXT NOT NULL REFERENCES profiles(name) ON DELETE CASCADE ON UPDATE CASCADE,
            name TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            meta_description TEXT NOT NULL DEFAULT '',
            keywords TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            featured_image_url TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME,
            UNIQUE(profile_name, name)
        );

        -- Browser sessions
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL DEFAULT '{}',
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Profile import history
        CREATE TABLE IF NOT EXISTS imports (
            id INTEGER PRIMARY KEY,
            source TEXT NOT NULL,
            filename TEXT,
            profiles_count INTEGER DEFAULT 0,
            products_count INTEGER DEFAULT 0,
            texts_count INTEGER DEFAULT 0,
            skipped_count INTEGER DEFAULT 0,
            log TEXT,
            imported_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )?;

    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = ?2",
        params![SCHEMA_VERSION, CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn seed_defaults(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    let defaults = vec![
        // Background tasks
        ("task_session_cleanup_interval", "60"),
        ("task_session_max_age_days", "30"),
    ];

    for (key, value) in defaults {
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }

    Ok(())
}

/// Schema version recorded in the database, 0 before the first migration.
pub fn schema_version(pool: &DbPool) -> i64 {
    crate::models::settings::Setting::get(pool, SCHEMA_VERSION)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

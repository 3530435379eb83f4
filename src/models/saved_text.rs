use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

/// A generated text kept under a name within one profile. Title and meta
/// description live beside the body, never inside it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SavedText {
    pub name: String,
    pub profile: String,
    pub content: String,
    pub title: String,
    pub meta_description: String,
    pub keywords: String,
    pub category: String,
    pub featured_image_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SavedTextForm {
    pub name: String,
    pub content: String,
    pub title: String,
    pub meta_description: String,
    pub keywords: String,
    pub category: String,
    pub featured_image_url: Option<String>,
}

impl SavedText {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(SavedText {
            name: row.get("name")?,
            profile: row.get("profile_name")?,
            content: row.get("content")?,
            title: row.get("title")?,
            meta_description: row.get("meta_description")?,
            keywords: row.get("keywords")?,
            category: row.get("category")?,
            featured_image_url: row.get("featured_image_url")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn list_for(pool: &DbPool, profile: &str) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn
            .prepare("SELECT * FROM saved_texts WHERE profile_name = ?1 ORDER BY created_at DESC, name")
        {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![profile], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Store a text under its name, replacing an earlier one with the same name.
    pub fn save(pool: &DbPool, profile: &str, form: &SavedTextForm) -> Result<(), String> {
        let name = form.name.trim();
        let content = form.content.trim();
        if name.is_empty() || content.is_empty() {
            return Err("Name and content are required".into());
        }
        let featured = form
            .featured_image_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO saved_texts (profile_name, name, content, title, meta_description,
                keywords, category, featured_image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, CURRENT_TIMESTAMP, NULL)
             ON CONFLICT(profile_name, name) DO UPDATE SET
                content = ?3, title = ?4, meta_description = ?5, keywords = ?6,
                category = ?7, featured_image_url = ?8,
                created_at = CURRENT_TIMESTAMP, updated_at = NULL",
            params![
                profile,
                name,
                content,
                form.title.trim(),
                form.meta_description.trim(),
                form.keywords,
                form.category,
                featured,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Update the body (and the title when one is given) of an edited text,
    /// or create a minimal record when the name is new.
    pub fn auto_save(pool: &DbPool, profile: &str, name: &str, content: &str, title: &str) -> Result<(), String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Name and profile required".into());
        }
        let content = content.trim();
        let title = title.trim();
        let conn = pool.get().map_err(|e| e.to_string())?;
        let updated = conn
            .execute(
                "UPDATE saved_texts SET content = ?1,
                    title = CASE WHEN ?2 = '' THEN title ELSE ?2 END,
                    updated_at = CURRENT_TIMESTAMP
                 WHERE profile_name = ?3 AND name = ?4",
                params![content, title, profile, name],
            )
            .map_err(|e| e.to_string())?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO saved_texts (profile_name, name, content, title)
                 VALUES (?1, ?2, ?3, ?4)",
                params![profile, name, content, title],
            )
            .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    pub fn delete(pool: &DbPool, profile: &str, name: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let affected = conn
            .execute(
                "DELETE FROM saved_texts WHERE profile_name = ?1 AND name = ?2",
                params![profile, name],
            )
            .map_err(|e| e.to_string())?;
        if affected == 0 {
            return Err("Text not found".into());
        }
        Ok(())
    }

    /// Insert a text as-is, keeping its timestamps. Used by profile import.
    pub fn restore(pool: &DbPool, text: &SavedText) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO saved_texts (profile_name, name, content, title, meta_description,
                keywords, category, featured_image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(profile_name, name) DO UPDATE SET
                content = ?3, title = ?4, meta_description = ?5, keywords = ?6,
                category = ?7, featured_image_url = ?8, created_at = ?9, updated_at = ?10",
            params![
                text.profile,
                text.name,
                text.content,
                text.title,
                text.meta_description,
                text.keywords,
                text.category,
                text.featured_image_url,
                text.created_at,
                text.updated_at,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }
}

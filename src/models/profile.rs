use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::filter::normalize_blocked_words;

pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2023-10";

/// Writing settings used by basic generation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub tone: String,
    pub target_audience: String,
    pub language: String,
    pub seo_focus: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            tone: "Professionel".into(),
            target_audience: "Alle".into(),
            language: "Dansk".into(),
            seo_focus: "Høj".into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub url: String,
    pub description: String,
}

impl ProductForm {
    fn trimmed(&self) -> Result<ProductForm, String> {
        let form = ProductForm {
            name: self.name.trim().to_string(),
            url: self.url.trim().to_string(),
            description: self.description.trim().to_string(),
        };
        if form.name.is_empty() {
            return Err("Product name is required".into());
        }
        Ok(form)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub values: String,
    pub tone: String,
    pub api_key: String,
    pub blocked_words: Vec<String>,
    pub url: String,
    pub internal_links: String,
    pub shopify_store_url: String,
    pub shopify_api_token: String,
    pub shopify_api_version: String,
    pub settings: GenerationSettings,
    pub products: Vec<Product>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Editable profile fields. The name is only read on create.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProfileForm {
    pub name: String,
    pub description: String,
    pub values: String,
    pub tone: String,
    pub api_key: String,
    pub blocked_words: Vec<String>,
    pub url: String,
    pub internal_links: String,
    pub shopify_store_url: String,
    pub shopify_api_token: String,
    pub shopify_api_version: String,
    pub settings: Option<GenerationSettings>,
}

impl Profile {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let blocked: String = row.get("blocked_words")?;
        let settings: String = row.get("settings")?;
        Ok(Profile {
            name: row.get("name")?,
            description: row.get("description")?,
            values: row.get("brand_values")?,
            tone: row.get("tone")?,
            api_key: row.get("api_key")?,
            blocked_words: serde_json::from_str(&blocked).unwrap_or_default(),
            url: row.get("url")?,
            internal_links: row.get("internal_links")?,
            shopify_store_url: row.get("shopify_store_url")?,
            shopify_api_token: row.get("shopify_api_token")?,
            shopify_api_version: row.get("shopify_api_version")?,
            settings: serde_json::from_str(&settings).unwrap_or_default(),
            products: Vec::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Flat list of blocked terms, comma-joined entries split apart.
    pub fn blocked_terms(&self) -> Vec<String> {
        normalize_blocked_words(&self.blocked_words)
    }

    /// Internal links, one per non-empty line.
    pub fn internal_link_list(&self) -> Vec<String> {
        self.internal_links
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn api_version(&self) -> &str {
        if self.shopify_api_version.trim().is_empty() {
            DEFAULT_SHOPIFY_API_VERSION
        } else {
            self.shopify_api_version.trim()
        }
    }

    pub fn find(pool: &DbPool, name: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        let mut profile = conn
            .query_row(
                "SELECT * FROM profiles WHERE name = ?1",
                params![name],
                Self::from_row,
            )
            .ok()?;
        profile.products = Product::list_for(pool, name);
        Some(profile)
    }

    pub fn exists(pool: &DbPool, name: &str) -> bool {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return false,
        };
        conn.query_row(
            "SELECT 1 FROM profiles WHERE name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .unwrap_or(false)
    }

    pub fn list(pool: &DbPool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare("SELECT * FROM profiles ORDER BY name") {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let mut profiles: Vec<Self> = stmt
            .query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default();
        for p in profiles.iter_mut() {
            p.products = Product::list_for(pool, &p.name);
        }
        profiles
    }

    pub fn create(pool: &DbPool, form: &ProfileForm) -> Result<(), String> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err("Profile name is required".into());
        }
        if Self::exists(pool, name) {
            return Err("Profile already exists".into());
        }
        let blocked = serde_json::to_string(&normalize_blocked_words(&form.blocked_words))
            .map_err(|e| e.to_string())?;
        let settings = serde_json::to_string(&form.settings.clone().unwrap_or_default())
            .map_err(|e| e.to_string())?;
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO profiles (name, description, brand_values, tone, api_key, blocked_words,
                url, internal_links, shopify_store_url, shopify_api_token, shopify_api_version, settings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                name,
                form.description,
                form.values,
                form.tone,
                form.api_key.trim(),
                blocked,
                form.url,
                form.internal_links,
                form.shopify_store_url.trim(),
                form.shopify_api_token.trim(),
                form.shopify_api_version.trim(),
                settings,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Overwrite every field except the name. Settings are kept when the
    /// form leaves them out.
    pub fn update(pool: &DbPool, name: &str, form: &ProfileForm) -> Result<(), String> {
        let current = Self::find(pool, name).ok_or_else(|| "Profile not found".to_string())?;
        let blocked = serde_json::to_string(&normalize_blocked_words(&form.blocked_words))
            .map_err(|e| e.to_string())?;
        let settings = serde_json::to_string(&form.settings.clone().unwrap_or(current.settings))
            .map_err(|e| e.to_string())?;
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE profiles SET description = ?1, brand_values = ?2, tone = ?3, api_key = ?4,
                blocked_words = ?5, url = ?6, internal_links = ?7, shopify_store_url = ?8,
                shopify_api_token = ?9, shopify_api_version = ?10, settings = ?11,
                updated_at = CURRENT_TIMESTAMP
             WHERE name = ?12",
            params![
                form.description,
                form.values,
                form.tone,
                form.api_key.trim(),
                blocked,
                form.url,
                form.internal_links,
                form.shopify_store_url.trim(),
                form.shopify_api_token.trim(),
                form.shopify_api_version.trim(),
                settings,
                name,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Remove a profile together with its products and saved texts.
    pub fn delete(pool: &DbPool, name: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let affected = conn
            .execute("DELETE FROM profiles WHERE name = ?1", params![name])
            .map_err(|e| e.to_string())?;
        if affected == 0 {
            return Err("Profile not found".into());
        }
        Ok(())
    }
}

impl Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get("id")?,
            name: row.get("name")?,
            url: row.get("url")?,
            description: row.get("description")?,
        })
    }

    pub fn list_for(pool: &DbPool, profile: &str) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(
            "SELECT * FROM products WHERE profile_name = ?1 ORDER BY position, rowid",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![profile], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn find(pool: &DbPool, profile: &str, id: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM products WHERE profile_name = ?1 AND id = ?2",
            params![profile, id],
            Self::from_row,
        )
        .ok()
    }

    fn name_taken(pool: &DbPool, profile: &str, name: &str, except_id: Option<&str>) -> bool {
        let wanted = name.to_lowercase();
        Self::list_for(pool, profile)
            .iter()
            .any(|p| p.name.to_lowercase() == wanted && Some(p.id.as_str()) != except_id)
    }

    pub fn create(pool: &DbPool, profile: &str, form: &ProductForm) -> Result<Product, String> {
        let form = form.trimmed()?;
        if !Profile::exists(pool, profile) {
            return Err("Profile not found".into());
        }
        if Self::name_taken(pool, profile, &form.name, None) {
            return Err("A product with this name already exists".into());
        }
        let product = Product {
            id: uuid::Uuid::new_v4().to_string(),
            name: form.name,
            url: form.url,
            description: form.description,
        };
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO products (id, profile_name, position, name, url, description)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM products WHERE profile_name = ?2), ?3, ?4, ?5)",
            params![product.id, profile, product.name, product.url, product.description],
        )
        .map_err(|e| e.to_string())?;
        Ok(product)
    }

    pub fn update(pool: &DbPool, profile: &str, id: &str, form: &ProductForm) -> Result<Product, String> {
        let form = form.trimmed()?;
        if Self::find(pool, profile, id).is_none() {
            return Err("Product not found".into());
        }
        if Self::name_taken(pool, profile, &form.name, Some(id)) {
            return Err("A product with this name already exists".into());
        }
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE products SET name = ?1, url = ?2, description = ?3
             WHERE profile_name = ?4 AND id = ?5",
            params![form.name, form.url, form.description, profile, id],
        )
        .map_err(|e| e.to_string())?;
        Ok(Product {
            id: id.to_string(),
            name: form.name,
            url: form.url,
            description: form.description,
        })
    }

    pub fn delete(pool: &DbPool, profile: &str, id: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let affected = conn
            .execute(
                "DELETE FROM products WHERE profile_name = ?1 AND id = ?2",
                params![profile, id],
            )
            .map_err(|e| e.to_string())?;
        if affected == 0 {
            return Err("Product not found".into());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_profile(name: &str) -> Profile {
    let now = chrono::Utc::now().naive_utc();
    Profile {
        name: name.to_string(),
        description: String::new(),
        values: String::new(),
        tone: String::new(),
        api_key: String::new(),
        blocked_words: Vec::new(),
        url: String::new(),
        internal_links: String::new(),
        shopify_store_url: String::new(),
        shopify_api_token: String::new(),
        shopify_api_version: String::new(),
        settings: GenerationSettings::default(),
        products: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_terms_are_flattened() {
        let mut p = test_profile("Butik");
        p.blocked_words = vec!["billig, spam".into(), "klima".into()];
        assert_eq!(p.blocked_terms(), vec!["billig", "spam", "klima"]);
    }

    #[test]
    fn test_internal_link_list() {
        let mut p = test_profile("Butik");
        p.internal_links = "https://a.dk/x\n\n  https://a.dk/y  \n".into();
        assert_eq!(p.internal_link_list(), vec!["https://a.dk/x", "https://a.dk/y"]);
    }

    #[test]
    fn test_api_version_default() {
        let mut p = test_profile("Butik");
        assert_eq!(p.api_version(), DEFAULT_SHOPIFY_API_VERSION);
        p.shopify_api_version = "2024-04".into();
        assert_eq!(p.api_version(), "2024-04");
    }

    #[test]
    fn test_product_form_requires_name() {
        let form = ProductForm { name: "  ".into(), ..Default::default() };
        assert!(form.trimmed().is_err());
        let form = ProductForm { name: " Stol ".into(), url: " https://x ".into(), ..Default::default() };
        let t = form.trimmed().unwrap();
        assert_eq!(t.name, "Stol");
        assert_eq!(t.url, "https://x");
    }
}

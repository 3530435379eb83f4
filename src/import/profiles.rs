use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::import::ImportCounts;
use crate::models::profile::{GenerationSettings, ProductForm, ProfileForm};
use crate::models::saved_text::SavedText;
use crate::store::Store;

pub const EXPORT_VERSION: u32 = 1;

/// Self-contained copy of one profile with its products and texts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
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
    pub products: Vec<ProductRecord>,
    pub saved_texts: Vec<TextRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub name: String,
    pub content: String,
    pub title: String,
    pub meta_description: String,
    pub keywords: String,
    pub category: String,
    pub featured_image_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileExport {
    pub version: u32,
    pub exported_at: NaiveDateTime,
    pub profiles: Vec<ProfileRecord>,
}

/// Result of a profile import
#[derive(Debug, Default, Serialize)]
pub struct ProfileImportResult {
    pub profiles_imported: i64,
    pub products_imported: i64,
    pub texts_imported: i64,
    pub skipped: i64,
    pub log: Vec<String>,
}

/// Snapshot every profile with its products and saved texts.
pub fn export_profiles(store: &dyn Store) -> ProfileExport {
    let profiles = store
        .profile_list()
        .into_iter()
        .map(|p| {
            let saved_texts = store
                .saved_text_list(&p.name)
                .into_iter()
                .map(|t| TextRecord {
                    name: t.name,
                    content: t.content,
                    title: t.title,
                    meta_description: t.meta_description,
                    keywords: t.keywords,
                    category: t.category,
                    featured_image_url: t.featured_image_url,
                    created_at: Some(t.created_at),
                    updated_at: t.updated_at,
                })
                .collect();
            ProfileRecord {
                products: p
                    .products
                    .iter()
                    .map(|pr| ProductRecord {
                        name: pr.name.clone(),
                        url: pr.url.clone(),
                        description: pr.description.clone(),
                    })
                    .collect(),
                saved_texts,
                name: p.name,
                description: p.description,
                values: p.values,
                tone: p.tone,
                api_key: p.api_key,
                blocked_words: p.blocked_words,
                url: p.url,
                internal_links: p.internal_links,
                shopify_store_url: p.shopify_store_url,
                shopify_api_token: p.shopify_api_token,
                shopify_api_version: p.shopify_api_version,
                settings: p.settings,
            }
        })
        .collect();

    ProfileExport {
        version: EXPORT_VERSION,
        exported_at: Utc::now().naive_utc(),
        profiles,
    }
}

// ── Reading exports ───────────────────────────────────

/// Read any supported export shape into profile records.
///
/// Accepts the versioned `{"version":1,"profiles":[...]}` document, older
/// exports with a `profiles` object keyed by name, and a bare name to
/// profile mapping. Legacy field shapes are coerced on the way in.
pub fn parse_export(json: &str) -> Result<(String, Vec<ProfileRecord>), String> {
    let doc: Value = serde_json::from_str(json).map_err(|e| format!("Import error: {}", e))?;
    let obj = doc
        .as_object()
        .ok_or_else(|| "Import error: expected a JSON object".to_string())?;

    match obj.get("profiles") {
        Some(Value::Array(list)) => {
            let records = list
                .iter()
                .filter_map(|v| coerce_profile(None, v))
                .collect();
            Ok(("profiles_json".into(), records))
        }
        Some(Value::Object(map)) => {
            let mut records = coerce_mapping(map);
            // Very old exports kept texts beside the profiles, tagged with the owner.
            if let Some(texts) = obj.get("saved_texts") {
                for (name, text) in text_entries(texts) {
                    let owner = text.get("profile").and_then(Value::as_str).unwrap_or("");
                    if let Some(record) = records.iter_mut().find(|r| r.name == owner) {
                        if !record.saved_texts.iter().any(|t| t.name == name) {
                            if let Some(t) = coerce_text(&name, text) {
                                record.saved_texts.push(t);
                            }
                        }
                    }
                }
            }
            Ok(("legacy_export".into(), records))
        }
        Some(_) => Err("Import error: profiles must be a list or an object".into()),
        None => Ok(("legacy_mapping".into(), coerce_mapping(obj))),
    }
}

fn coerce_mapping(map: &Map<String, Value>) -> Vec<ProfileRecord> {
    map.iter()
        .filter(|(_, v)| v.is_object())
        .filter_map(|(name, v)| coerce_profile(Some(name), v))
        .collect()
}

fn str_field(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Blocked words stored as a single string or as a list of strings.
fn coerce_blocked(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_profile(name_hint: Option<&str>, v: &Value) -> Option<ProfileRecord> {
    let name = match str_field(v, "name").trim() {
        "" => name_hint?.trim().to_string(),
        n => n.to_string(),
    };
    if name.is_empty() {
        return None;
    }

    let products = v
        .get("products")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|p| !str_field(p, "name").trim().is_empty())
                .map(|p| ProductRecord {
                    name: str_field(p, "name"),
                    url: str_field(p, "url"),
                    description: str_field(p, "description"),
                })
                .collect()
        })
        .unwrap_or_default();

    let saved_texts = v
        .get("saved_texts")
        .map(|t| {
            text_entries(t)
                .into_iter()
                .filter_map(|(n, text)| coerce_text(&n, text))
                .collect()
        })
        .unwrap_or_default();

    let settings = v
        .get("settings")
        .and_then(|s| serde_json::from_value(s.clone()).ok())
        .unwrap_or_default();

    Some(ProfileRecord {
        name,
        description: str_field(v, "description"),
        values: str_field(v, "values"),
        tone: str_field(v, "tone"),
        api_key: str_field(v, "api_key"),
        blocked_words: coerce_blocked(v.get("blocked_words")),
        url: str_field(v, "url"),
        internal_links: str_field(v, "internal_links"),
        shopify_store_url: str_field(v, "shopify_store_url"),
        shopify_api_token: str_field(v, "shopify_api_token"),
        shopify_api_version: str_field(v, "shopify_api_version"),
        settings,
        products,
        saved_texts,
    })
}

/// Saved texts as (name, text) pairs, from a name-keyed object or a list.
fn text_entries(v: &Value) -> Vec<(String, &Value)> {
    match v {
        Value::Object(map) => map.iter().map(|(k, t)| (k.clone(), t)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let name = match str_field(t, "name").trim() {
                    "" => format!("Tekst {}", i + 1),
                    n => n.to_string(),
                };
                (name, t)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_timestamp(v: &Value, key: &str) -> Option<NaiveDateTime> {
    let raw = v.get(key)?.as_str()?;
    serde_json::from_value(Value::String(raw.to_string()))
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok())
}

fn coerce_text(name: &str, v: &Value) -> Option<TextRecord> {
    let content = match v {
        Value::String(s) => s.clone(),
        Value::Object(_) => str_field(v, "content"),
        _ => return None,
    };
    if name.trim().is_empty() || content.trim().is_empty() {
        return None;
    }
    Some(TextRecord {
        name: name.trim().to_string(),
        content,
        title: str_field(v, "title"),
        meta_description: str_field(v, "meta_description"),
        keywords: str_field(v, "keywords"),
        category: str_field(v, "category"),
        featured_image_url: v
            .get("featured_image_url")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(String::from),
        created_at: parse_timestamp(v, "created_at"),
        updated_at: parse_timestamp(v, "updated_at"),
    })
}

// ── Writing ───────────────────────────────────────────

/// Merge exported profiles into the store by name. An existing profile is
/// replaced by the imported one, products and texts included.
pub fn import_profiles(
    store: &dyn Store,
    json: &str,
    filename: Option<&str>,
) -> Result<ProfileImportResult, String> {
    let (source, records) = parse_export(json)?;
    let mut result = ProfileImportResult::default();

    for record in records {
        match import_one(store, &record, &mut result) {
            Ok(()) => {
                result.profiles_imported += 1;
                result.log.push(format!("Imported profile: {}", record.name));
            }
            Err(e) => {
                result.skipped += 1;
                result.log.push(format!("Skipped profile '{}': {}", record.name, e));
            }
        }
    }

    log::info!(
        "Profile import ({}): {} profiles, {} products, {} texts, {} skipped",
        source,
        result.profiles_imported,
        result.products_imported,
        result.texts_imported,
        result.skipped
    );

    let counts = ImportCounts {
        profiles: result.profiles_imported,
        products: result.products_imported,
        texts: result.texts_imported,
        skipped: result.skipped,
    };
    store.import_record(&source, filename, &counts, &result.log)?;

    Ok(result)
}

fn import_one(
    store: &dyn Store,
    record: &ProfileRecord,
    result: &mut ProfileImportResult,
) -> Result<(), String> {
    let form = ProfileForm {
        name: record.name.clone(),
        description: record.description.clone(),
        values: record.values.clone(),
        tone: record.tone.clone(),
        api_key: record.api_key.clone(),
        blocked_words: record.blocked_words.clone(),
        url: record.url.clone(),
        internal_links: record.internal_links.clone(),
        shopify_store_url: record.shopify_store_url.clone(),
        shopify_api_token: record.shopify_api_token.clone(),
        shopify_api_version: record.shopify_api_version.clone(),
        settings: Some(record.settings.clone()),
    };

    if store.profile_find(&record.name).is_some() {
        store.profile_update(&record.name, &form)?;
        for product in store.product_list(&record.name) {
            store.product_delete(&record.name, &product.id)?;
        }
    } else {
        store.profile_create(&form)?;
    }

    for product in &record.products {
        let form = ProductForm {
            name: product.name.clone(),
            url: product.url.clone(),
            description: product.description.clone(),
        };
        match store.product_create(&record.name, &form) {
            Ok(_) => result.products_imported += 1,
            Err(e) => result
                .log
                .push(format!("Skipped product '{}' of '{}': {}", product.name, record.name, e)),
        }
    }

    let now = Utc::now().naive_utc();
    for text in &record.saved_texts {
        let saved = SavedText {
            name: text.name.clone(),
            profile: record.name.clone(),
            content: text.content.clone(),
            title: text.title.clone(),
            meta_description: text.meta_description.clone(),
            keywords: text.keywords.clone(),
            category: text.category.clone(),
            featured_image_url: text.featured_image_url.clone(),
            created_at: text.created_at.unwrap_or(now),
            updated_at: text.updated_at,
        };
        store.saved_text_restore(&saved)?;
        result.texts_imported += 1;
    }

    Ok(())
}

use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::ai::{redact, validate_api_key};
use crate::models::profile::DEFAULT_SHOPIFY_API_VERSION;
use crate::models::settings::{
    OPENAI_API_KEY, SHOPIFY_API_TOKEN, SHOPIFY_API_VERSION, SHOPIFY_STORE_URL,
};
use crate::store::Store;

use super::{bad_request, server_error, ApiResult};

#[get("/settings")]
pub fn get_settings(store: &State<Arc<dyn Store>>) -> Json<Value> {
    let configured = |key: &str| {
        store
            .setting_get(key)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    };
    Json(json!({
        "ok": true,
        "api_key_configured": configured(OPENAI_API_KEY),
        "shopify_configured": configured(SHOPIFY_STORE_URL) && configured(SHOPIFY_API_TOKEN),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    #[serde(default)]
    pub api_key: String,
}

#[post("/settings/openai", format = "json", data = "<body>")]
pub fn set_openai_key(store: &State<Arc<dyn Store>>, body: Json<ApiKeyRequest>) -> ApiResult {
    let key = validate_api_key(&body.api_key).map_err(bad_request)?;
    store
        .setting_set(OPENAI_API_KEY, &key)
        .map_err(server_error)?;
    log::info!("[ai] Global API key set ({})", redact(&key));
    Ok(Json(json!({"ok": true, "message": "API key saved successfully"})))
}

#[post("/settings/openai/reset")]
pub fn reset_openai_key(store: &State<Arc<dyn Store>>) -> ApiResult {
    store
        .setting_delete(OPENAI_API_KEY)
        .map_err(server_error)?;
    log::info!("[ai] Global API key reset");
    Ok(Json(json!({"ok": true, "message": "API key reset successfully"})))
}

#[derive(Debug, Deserialize)]
pub struct ShopifySettingsRequest {
    #[serde(default)]
    pub store_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub api_version: String,
}

#[post("/settings/shopify", format = "json", data = "<body>")]
pub fn set_shopify_credentials(
    store: &State<Arc<dyn Store>>,
    body: Json<ShopifySettingsRequest>,
) -> ApiResult {
    let store_url = body.store_url.trim();
    let api_token = body.api_token.trim();
    if store_url.is_empty() || api_token.is_empty() {
        return Err(bad_request("Store URL and API token are required"));
    }
    let api_version = match body.api_version.trim() {
        "" => DEFAULT_SHOPIFY_API_VERSION,
        v => v,
    };

    let mut values = HashMap::new();
    values.insert(SHOPIFY_STORE_URL.to_string(), store_url.to_string());
    values.insert(SHOPIFY_API_TOKEN.to_string(), api_token.to_string());
    values.insert(SHOPIFY_API_VERSION.to_string(), api_version.to_string());
    store.setting_set_many(&values).map_err(server_error)?;

    log::info!("[shopify] Global credentials saved for {}", store_url);
    Ok(Json(json!({"ok": true, "message": "Shopify credentials saved successfully"})))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![get_settings, set_openai_key, reset_openai_key, set_shopify_credentials]
}

use rocket::data::{Data, ToByteUnit};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use std::sync::Arc;

use crate::import::profiles::{export_profiles, import_profiles};
use crate::models::profile::{ProductForm, ProfileForm};
use crate::page_info::{self, HttpFetcher};
use crate::session::SessionId;
use crate::store::Store;

use super::{
    bad_request, blocking, not_found, resolve_profile, server_error, store_error, ApiResult,
    Attachment,
};

// ── Profiles ──────────────────────────────────────────

#[get("/profiles")]
pub fn profiles_list(store: &State<Arc<dyn Store>>, session: SessionId) -> Json<Value> {
    let state = session.load(&**store.inner());
    let profiles = store.profile_list();
    // A current profile deleted elsewhere reads as none.
    let current = state
        .current_profile
        .filter(|name| profiles.iter().any(|p| &p.name == name));
    Json(json!({
        "ok": true,
        "profiles": profiles,
        "current_profile": current,
    }))
}

#[post("/profiles", format = "json", data = "<body>")]
pub fn profile_create(store: &State<Arc<dyn Store>>, body: Json<ProfileForm>) -> ApiResult {
    store.profile_create(&body).map_err(bad_request)?;
    let name = body.name.trim();
    log::info!("Profile created: {}", name);
    let profile = store
        .profile_find(name)
        .ok_or_else(|| server_error("Profile could not be read back"))?;
    Ok(Json(json!({
        "ok": true,
        "message": "Profile created successfully",
        "profile": profile,
    })))
}

#[put("/profiles/<name>", format = "json", data = "<body>")]
pub fn profile_update(
    store: &State<Arc<dyn Store>>,
    name: &str,
    body: Json<ProfileForm>,
) -> ApiResult {
    store.profile_update(name, &body).map_err(store_error)?;
    let profile = store
        .profile_find(name)
        .ok_or_else(|| not_found("Profile not found"))?;
    Ok(Json(json!({
        "ok": true,
        "message": "Profile updated successfully",
        "profile": profile,
    })))
}

#[delete("/profiles/<name>")]
pub fn profile_delete(store: &State<Arc<dyn Store>>, name: &str) -> ApiResult {
    store.profile_delete(name).map_err(store_error)?;
    log::info!("Profile deleted: {}", name);
    Ok(Json(json!({"ok": true, "message": "Profile deleted successfully"})))
}

#[post("/profiles/<name>/select")]
pub fn profile_select(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    name: &str,
) -> ApiResult {
    if store.profile_find(name).is_none() {
        return Err(not_found("Profile not found"));
    }
    let mut state = session.load(&**store.inner());
    state.current_profile = Some(name.to_string());
    session
        .save(&**store.inner(), &state)
        .map_err(server_error)?;
    Ok(Json(json!({"ok": true, "message": "Profile selected successfully"})))
}

// ── Products ──────────────────────────────────────────

fn list_products(store: &dyn Store, profile: &str) -> Json<Value> {
    Json(json!({"ok": true, "products": store.product_list(profile)}))
}

fn add_product(store: &dyn Store, profile: &str, form: &ProductForm) -> ApiResult {
    let product = store.product_create(profile, form).map_err(store_error)?;
    Ok(Json(json!({
        "ok": true,
        "message": "Product added successfully",
        "product": product,
    })))
}

fn update_product(store: &dyn Store, profile: &str, id: &str, form: &ProductForm) -> ApiResult {
    let product = store
        .product_update(profile, id, form)
        .map_err(store_error)?;
    Ok(Json(json!({
        "ok": true,
        "message": "Product updated successfully",
        "product": product,
    })))
}

fn remove_product(store: &dyn Store, profile: &str, id: &str) -> ApiResult {
    store.product_delete(profile, id).map_err(store_error)?;
    Ok(Json(json!({"ok": true, "message": "Product deleted successfully"})))
}

/// Products of the current profile; empty when none is selected.
#[get("/products")]
pub fn products_current(store: &State<Arc<dyn Store>>, session: SessionId) -> Json<Value> {
    let state = session.load(&**store.inner());
    match state.current_profile {
        Some(profile) => list_products(&**store.inner(), &profile),
        None => Json(json!({"ok": true, "products": []})),
    }
}

#[post("/products", format = "json", data = "<body>")]
pub fn product_create_current(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<ProductForm>,
) -> ApiResult {
    let state = session.load(&**store.inner());
    let profile = resolve_profile(&**store.inner(), &state, None)?;
    add_product(&**store.inner(), &profile.name, &body)
}

#[put("/products/<id>", format = "json", data = "<body>")]
pub fn product_update_current(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    id: &str,
    body: Json<ProductForm>,
) -> ApiResult {
    let state = session.load(&**store.inner());
    let profile = resolve_profile(&**store.inner(), &state, None)?;
    update_product(&**store.inner(), &profile.name, id, &body)
}

#[delete("/products/<id>")]
pub fn product_delete_current(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    id: &str,
) -> ApiResult {
    let state = session.load(&**store.inner());
    let profile = resolve_profile(&**store.inner(), &state, None)?;
    remove_product(&**store.inner(), &profile.name, id)
}

#[get("/profiles/<name>/products")]
pub fn products_for_profile(store: &State<Arc<dyn Store>>, name: &str) -> ApiResult {
    if store.profile_find(name).is_none() {
        return Err(not_found("Profile not found"));
    }
    Ok(list_products(&**store.inner(), name))
}

#[post("/profiles/<name>/products", format = "json", data = "<body>")]
pub fn product_create_for_profile(
    store: &State<Arc<dyn Store>>,
    name: &str,
    body: Json<ProductForm>,
) -> ApiResult {
    add_product(&**store.inner(), name, &body)
}

#[put("/profiles/<name>/products/<id>", format = "json", data = "<body>")]
pub fn product_update_for_profile(
    store: &State<Arc<dyn Store>>,
    name: &str,
    id: &str,
    body: Json<ProductForm>,
) -> ApiResult {
    update_product(&**store.inner(), name, id, &body)
}

#[delete("/profiles/<name>/products/<id>")]
pub fn product_delete_for_profile(store: &State<Arc<dyn Store>>, name: &str, id: &str) -> ApiResult {
    remove_product(&**store.inner(), name, id)
}

#[derive(Debug, Deserialize)]
pub struct UrlInfoRequest {
    /// Product page URLs, one per line.
    #[serde(default)]
    pub urls: String,
}

/// Product entries built from the title and description of each page.
#[post("/fetch-url-info", format = "json", data = "<body>")]
pub async fn fetch_url_info(body: Json<UrlInfoRequest>) -> ApiResult {
    let urls = body.into_inner().urls;
    if urls.trim().is_empty() {
        return Err(bad_request("At least one URL is required"));
    }
    let products = blocking(move || page_info::fetch_products(&HttpFetcher, &urls)).await?;
    log::info!("Fetched product info for {} URLs", products.len());
    Ok(Json(json!({"ok": true, "products": products})))
}

// ── Export / Import ───────────────────────────────────

#[get("/profiles/export")]
pub fn profiles_export(store: &State<Arc<dyn Store>>) -> Result<Attachment, super::ApiError> {
    let export = export_profiles(&**store.inner());
    let body = serde_json::to_vec_pretty(&export).map_err(|e| server_error(e.to_string()))?;
    let filename = format!(
        "blogsmith-profiles-{}.json",
        export.exported_at.format("%Y%m%d-%H%M%S")
    );
    log::info!("Exported {} profiles", export.profiles.len());
    Ok(Attachment::new(body, ContentType::JSON, &filename))
}

#[post("/profiles/import?<filename>", data = "<data>")]
pub async fn profiles_import(
    store: &State<Arc<dyn Store>>,
    filename: Option<String>,
    data: Data<'_>,
) -> ApiResult {
    let bytes = match data.open(20.mebibytes()).into_bytes().await {
        Ok(b) if b.is_complete() => b.into_inner(),
        Ok(_) => return Err(bad_request("Upload is too large")),
        Err(e) => return Err(bad_request(format!("Failed to read upload data: {}", e))),
    };
    if bytes.is_empty() {
        return Err(bad_request("No file uploaded"));
    }
    let json_str = String::from_utf8_lossy(&bytes).to_string();

    let result = import_profiles(&**store.inner(), &json_str, filename.as_deref())
        .map_err(bad_request)?;
    Ok(Json(json!({
        "ok": true,
        "message": format!("Imported {} profiles", result.profiles_imported),
        "result": result,
    })))
}

#[get("/profiles/imports")]
pub fn profiles_import_history(store: &State<Arc<dyn Store>>) -> ApiResult {
    Ok(Json(json!({"ok": true, "imports": store.import_history()})))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        profiles_list,
        profile_create,
        profile_update,
        profile_delete,
        profile_select,
        products_current,
        product_create_current,
        product_update_current,
        product_delete_current,
        products_for_profile,
        product_create_for_profile,
        product_update_for_profile,
        product_delete_for_profile,
        fetch_url_info,
        profiles_export,
        profiles_import,
        profiles_import_history,
    ]
}

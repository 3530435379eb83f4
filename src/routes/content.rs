use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use std::sync::Arc;

use crate::ai::prompts::{GenerationRequest, RevisionInstruction};
use crate::config::AppConfig;
use crate::generate::{self, GenerationResult};
use crate::models::saved_text::SavedTextForm;
use crate::session::SessionId;
use crate::store::Store;

use super::{
    ai_failure, bad_request, blocking, completer, optional_profile, resolve_profile, store_error,
    ApiResult,
};

// ── Request Types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VariationsRequest {
    #[serde(default)]
    pub keywords: String,
    #[serde(default = "default_count", alias = "batch_count")]
    pub count: usize,
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_count() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionEditRequest {
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub target_language: String,
    #[serde(default, alias = "profile_name")]
    pub profile: Option<String>,
}

fn default_language() -> String {
    "engelsk".into()
}

#[derive(Debug, Deserialize)]
pub struct RawTextRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_raw_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_raw_temperature")]
    pub temperature: f32,
    #[serde(default, alias = "profile_name")]
    pub profile: Option<String>,
}

fn default_raw_tokens() -> u32 {
    100
}

fn default_raw_temperature() -> f32 {
    0.7
}

#[derive(Debug, Deserialize)]
pub struct AutoSaveRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: String,
}

fn generation_json(result: &GenerationResult) -> Json<Value> {
    Json(json!({
        "ok": true,
        "title": result.title,
        "meta_description": result.meta_description,
        "content": result.text,
        "body": result.body,
        "html_content": result.html,
        "keywords": result.keywords,
        "profile": result.profile,
    }))
}

// ── Generation ────────────────────────────────────────

async fn run_generation(
    store: Arc<dyn Store>,
    config: &AppConfig,
    session: &SessionId,
    req: GenerationRequest,
    enhanced: bool,
) -> ApiResult {
    if req.keywords.trim().is_empty() {
        return Err(bad_request("Keywords are required"));
    }
    let state = session.load(&*store);
    let profile = optional_profile(&*store, &state, req.profile.as_deref())?;
    let model = if enhanced {
        config.ai.enhanced_model.clone()
    } else {
        config.ai.basic_model.clone()
    };
    let client = completer(&*store, config, profile.as_ref(), &model)?;

    log::info!(
        "[ai] {} generation for '{}'",
        if enhanced { "Enhanced" } else { "Basic" },
        req.keywords.trim()
    );
    let result = blocking(move || {
        generate::generate(&client, profile.as_ref(), &req, enhanced, &model)
    })
    .await?
    .map_err(ai_failure)?;
    Ok(generation_json(&result))
}

#[post("/generate-seo", format = "json", data = "<body>")]
pub async fn generate_seo(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<GenerationRequest>,
) -> ApiResult {
    run_generation(store.inner().clone(), config, &session, body.into_inner(), false).await
}

#[post("/enhanced-generate-seo", format = "json", data = "<body>")]
pub async fn enhanced_generate_seo(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<GenerationRequest>,
) -> ApiResult {
    run_generation(store.inner().clone(), config, &session, body.into_inner(), true).await
}

async fn run_variations(
    store: Arc<dyn Store>,
    config: &AppConfig,
    session: &SessionId,
    req: VariationsRequest,
) -> ApiResult {
    let keywords = req.keywords.trim().to_string();
    if keywords.is_empty() {
        return Err(bad_request("Keywords are required"));
    }
    let state = session.load(&*store);
    let profile = resolve_profile(&*store, &state, req.profile.as_deref())?;
    let model = config.ai.basic_model.clone();
    let client = completer(&*store, config, Some(&profile), &model)?;
    let throttle = config.throttle();
    let count = req.count;

    let variations = blocking(move || {
        generate::generate_variations(&client, &profile, &keywords, count, &model, &throttle)
    })
    .await?;
    let failed = variations.iter().filter(|v| v.error.is_some()).count();
    log::info!("[ai] Generated {} variations ({} failed)", variations.len(), failed);

    Ok(Json(json!({
        "ok": true,
        "count": variations.len(),
        "failed": failed,
        "variations": variations,
    })))
}

#[post("/generate-seo-variations", format = "json", data = "<body>")]
pub async fn generate_seo_variations(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<VariationsRequest>,
) -> ApiResult {
    run_variations(store.inner().clone(), config, &session, body.into_inner()).await
}

#[post("/batch-generate-seo", format = "json", data = "<body>")]
pub async fn batch_generate_seo(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<VariationsRequest>,
) -> ApiResult {
    run_variations(store.inner().clone(), config, &session, body.into_inner()).await
}

#[post("/generate-text", format = "json", data = "<body>")]
pub async fn generate_text(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<RawTextRequest>,
) -> ApiResult {
    let req = body.into_inner();
    if req.prompt.trim().is_empty() {
        return Err(bad_request("Prompt is required"));
    }
    let store = store.inner().clone();
    let state = session.load(&*store);
    let profile = optional_profile(&*store, &state, req.profile.as_deref())?;
    let model = config.ai.basic_model.clone();
    let client = completer(&*store, config, profile.as_ref(), &model)?;

    let text = blocking(move || {
        generate::generate_text(&client, &req.prompt, req.max_tokens, req.temperature, &model)
    })
    .await?
    .map_err(ai_failure)?;
    Ok(Json(json!({
        "ok": true,
        "status": "success",
        "generated_text": text,
    })))
}

// ── Editing ───────────────────────────────────────────

#[post("/revision-request", format = "json", data = "<body>")]
pub async fn revision_request(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<RevisionRequest>,
) -> ApiResult {
    let req = body.into_inner();
    if req.original_text.trim().is_empty() || req.instruction.trim().is_empty() {
        return Err(bad_request("Original text and instruction are required"));
    }
    let store = store.inner().clone();
    let state = session.load(&*store);
    let profile = optional_profile(&*store, &state, req.profile.as_deref())?;
    let model = config.ai.edit_model.clone();
    let client = completer(&*store, config, profile.as_ref(), &model)?;
    let instruction = RevisionInstruction::parse(&req.instruction);

    let revision = blocking(move || {
        generate::revise(&client, profile.as_ref(), &req.original_text, &instruction, &model)
    })
    .await?
    .map_err(ai_failure)?;
    Ok(Json(json!({
        "ok": true,
        "revised_text": revision.revised_text,
        "revised_html": revision.revised_html,
    })))
}

#[post("/ai-edit-selection", format = "json", data = "<body>")]
pub async fn ai_edit_selection(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<SelectionEditRequest>,
) -> ApiResult {
    let req = body.into_inner();
    if req.full_text.trim().is_empty()
        || req.selected_text.trim().is_empty()
        || req.instruction.trim().is_empty()
    {
        return Err(bad_request(
            "Full text, selected text and instruction are required",
        ));
    }
    let store = store.inner().clone();
    let state = session.load(&*store);
    let profile = optional_profile(&*store, &state, req.profile.as_deref())?;
    let model = config.ai.edit_model.clone();
    let client = completer(&*store, config, profile.as_ref(), &model)?;
    let instruction = RevisionInstruction::parse(&req.instruction);

    let edit = blocking(move || {
        generate::edit_selection(
            &client,
            profile.as_ref(),
            &req.full_text,
            &req.selected_text,
            (req.start_index, req.end_index),
            &instruction,
            &model,
        )
    })
    .await?
    .map_err(ai_failure)?;
    Ok(Json(json!({
        "ok": true,
        "edited_selection": edit.edited_selection,
        "new_full_text": edit.new_full_text,
        "original_selection": edit.original_selection,
    })))
}

// ── Translation ───────────────────────────────────────

async fn run_translation(
    store: Arc<dyn Store>,
    config: &AppConfig,
    session: &SessionId,
    req: TranslateRequest,
) -> ApiResult {
    if req.text.trim().is_empty() {
        return Err(bad_request("Text is required"));
    }
    let state = session.load(&*store);
    let profile = optional_profile(&*store, &state, req.profile.as_deref())?;
    let model = config.ai.translate_model.clone();
    let client = completer(&*store, config, profile.as_ref(), &model)?;
    let language = req.target_language.trim().to_string();
    let text = req.text;

    let target = language.clone();
    let translated = blocking(move || {
        generate::quick_translate(&client, &text, &target, &model)
    })
    .await?
    .map_err(ai_failure)?;
    Ok(Json(json!({
        "ok": true,
        "translated_text": translated,
        "target_language": language,
    })))
}

#[post("/translate", format = "json", data = "<body>")]
pub async fn translate_text(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<TranslateRequest>,
) -> ApiResult {
    run_translation(store.inner().clone(), config, &session, body.into_inner()).await
}

#[post("/quick-translate", format = "json", data = "<body>")]
pub async fn quick_translate(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<TranslateRequest>,
) -> ApiResult {
    run_translation(store.inner().clone(), config, &session, body.into_inner()).await
}

// ── Saved Texts ───────────────────────────────────────

#[post("/save-text", format = "json", data = "<body>")]
pub fn save_text(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<SavedTextForm>,
) -> ApiResult {
    if body.name.trim().is_empty() || body.content.trim().is_empty() {
        return Err(bad_request("Name and content are required"));
    }
    let state = session.load(&**store.inner());
    let profile = resolve_profile(&**store.inner(), &state, None)?;
    store
        .saved_text_save(&profile.name, &body)
        .map_err(store_error)?;
    Ok(Json(json!({"ok": true, "message": "Text saved successfully"})))
}

#[post("/auto-save-text", format = "json", data = "<body>")]
pub fn auto_save_text(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<AutoSaveRequest>,
) -> ApiResult {
    let state = session.load(&**store.inner());
    if body.name.trim().is_empty() || state.current_profile.is_none() {
        return Err(bad_request("Name and profile required"));
    }
    let profile = resolve_profile(&**store.inner(), &state, None)?;
    store
        .saved_text_auto_save(
            &profile.name,
            body.name.trim(),
            body.content.trim(),
            body.title.trim(),
        )
        .map_err(store_error)?;
    Ok(Json(json!({"ok": true, "message": "Text auto-saved successfully"})))
}

#[get("/saved-texts")]
pub fn saved_texts(store: &State<Arc<dyn Store>>, session: SessionId) -> Json<Value> {
    let state = session.load(&**store.inner());
    let texts = state
        .current_profile
        .map(|profile| store.saved_text_list(&profile))
        .unwrap_or_default();
    Json(json!({"ok": true, "saved_texts": texts}))
}

#[delete("/saved-texts/<name>")]
pub fn saved_text_delete(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    name: &str,
) -> ApiResult {
    let state = session.load(&**store.inner());
    let profile = resolve_profile(&**store.inner(), &state, None)?;
    store
        .saved_text_delete(&profile.name, name)
        .map_err(store_error)?;
    Ok(Json(json!({"ok": true, "message": "Text deleted successfully"})))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        generate_seo,
        enhanced_generate_seo,
        generate_seo_variations,
        batch_generate_seo,
        generate_text,
        revision_request,
        ai_edit_selection,
        translate_text,
        quick_translate,
        save_text,
        auto_save_text,
        saved_texts,
        saved_text_delete,
    ]
}

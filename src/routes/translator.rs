use chrono::Utc;
use rocket::data::{Data, ToByteUnit};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::import::shopify_csv::{
    self, combine, parse_csv, untranslated_export_filename, write_csv, CsvTable,
};
use crate::models::session::SessionState;
use crate::session::SessionId;
use crate::store::Store;
use crate::translate::{
    self, language_name, select_pending, ErrorRowPolicy, COL_SOURCE_FILE, COL_TRANSLATED,
};

use super::{
    bad_request, blocking, completer, not_found, optional_profile, server_error,
    ApiError, ApiResult, Attachment,
};

const FILTERED_FILENAME: &str = "filtered_untranslated.csv";
const UPLOAD_LIMIT_MIB: u64 = 50;

// ── Request Types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TranslateCsvRequest {
    #[serde(default)]
    pub selected_locales: Vec<String>,
    #[serde(default, alias = "profile_name")]
    pub profile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFileRequest {
    #[serde(default)]
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTranslationRequest {
    pub row_index: Option<usize>,
    #[serde(default)]
    pub translated_content: String,
}

// ── Helpers ───────────────────────────────────────────

fn save_state(store: &dyn Store, session: &SessionId, state: &SessionState) -> Result<(), ApiError> {
    session.save(store, state).map_err(server_error)
}

/// Pending rows of every uploaded file, tagged with their source file.
fn pending_rows(state: &SessionState, policy: ErrorRowPolicy) -> CsvTable {
    combine(
        FILTERED_FILENAME,
        state.csv_files.iter().map(|f| {
            let selection = select_pending::<&str>(&f.table.rows, None, policy);
            (&f.table, selection.indices)
        }),
    )
}

/// The table translation works on: the filtered rows when present,
/// otherwise every row of every upload.
fn working_table(state: &SessionState) -> Option<CsvTable> {
    if let Some(table) = &state.translation_table {
        return Some(table.clone());
    }
    let first = state.csv_files.first()?;
    Some(combine(
        &first.table.filename,
        state
            .csv_files
            .iter()
            .map(|f| (&f.table, (0..f.table.rows.len()).collect())),
    ))
}

fn csv_download(table: &CsvTable, exclude: &[&str], filename: &str) -> Result<Attachment, ApiError> {
    let body = write_csv(table, exclude).map_err(server_error)?;
    Ok(Attachment::new(body, ContentType::CSV, filename))
}

// ── Upload / Preview ──────────────────────────────────

#[post("/upload-csv?<filename>&<reset>", data = "<data>")]
pub async fn upload_csv(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    filename: Option<String>,
    reset: Option<bool>,
    data: Data<'_>,
) -> ApiResult {
    let filename = filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| bad_request("No file selected"))?;

    let bytes = match data.open(UPLOAD_LIMIT_MIB.mebibytes()).into_bytes().await {
        Ok(b) if b.is_complete() => b.into_inner(),
        Ok(_) => return Err(bad_request("Upload is too large")),
        Err(e) => return Err(bad_request(format!("Failed to read upload data: {}", e))),
    };
    let table = parse_csv(&bytes, &filename).map_err(bad_request)?;
    let summary = table.summary();

    let mut state = session.load(&**store.inner());
    if reset.unwrap_or(false) {
        state.clear_translator();
    }
    let file_id = state.add_csv(table);
    save_state(&**store.inner(), &session, &state)?;

    log::info!(
        "[translate] Uploaded {} ({} rows, {} untranslated)",
        filename,
        summary.total_rows,
        summary.untranslated_rows
    );
    Ok(Json(json!({
        "ok": true,
        "file_id": file_id,
        "file": summary,
        "session": state.csv_summary(),
        "total_files": state.csv_files.len(),
        "message": format!("{} uploaded", filename),
    })))
}

#[get("/csv-preview")]
pub fn csv_preview(store: &State<Arc<dyn Store>>, session: SessionId) -> ApiResult {
    let state = session.load(&**store.inner());
    if state.csv_files.is_empty() {
        return Err(bad_request("No CSV data found"));
    }
    let files: serde_json::Map<String, Value> = state
        .csv_files
        .iter()
        .map(|f| {
            let summary = f.table.summary();
            (
                f.file_id.clone(),
                json!({
                    "filename": summary.filename,
                    "data": f.table.rows,
                    "columns": f.table.headers,
                    "total_rows": summary.total_rows,
                    "untranslated_rows": summary.untranslated_rows,
                    "locales": summary.locales,
                    "locale_stats": summary.locale_stats,
                }),
            )
        })
        .collect();
    Ok(Json(json!({
        "ok": true,
        "files": files,
        "total_files": state.csv_files.len(),
        "summary": state.csv_summary(),
    })))
}

#[post("/filter-untranslated")]
pub fn filter_untranslated(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
) -> ApiResult {
    let mut state = session.load(&**store.inner());
    if state.csv_files.is_empty() {
        return Err(bad_request("No CSV files found"));
    }
    let table = pending_rows(&state, config.error_row_policy());
    let selection = select_pending::<&str>(&table.rows, None, config.error_row_policy());
    let locales: Vec<&String> = selection.locale_stats.keys().collect();
    let message = format!(
        "Filtered {} untranslated rows from {} files",
        table.rows.len(),
        state.csv_files.len()
    );
    let response = json!({
        "ok": true,
        "untranslated_rows": table.rows.len(),
        "available_locales": locales,
        "locale_stats": selection.locale_stats,
        "message": message,
    });

    state.translation_table = Some(table);
    save_state(&**store.inner(), &session, &state)?;
    log::info!("[translate] {}", message);
    Ok(Json(response))
}

// ── Translate ─────────────────────────────────────────

#[post("/translate-csv", format = "json", data = "<body>")]
pub async fn translate_csv(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
    body: Json<TranslateCsvRequest>,
) -> ApiResult {
    let req = body.into_inner();
    if req.selected_locales.is_empty() {
        return Err(bad_request("No languages selected for translation"));
    }
    let store = store.inner().clone();
    let mut state = session.load(&*store);
    let mut table = working_table(&state)
        .ok_or_else(|| bad_request("No CSV data found. Upload a CSV file first."))?;

    let profile = optional_profile(&*store, &state, req.profile.as_deref())?;
    let model = config.ai.translate_model.clone();
    let client = completer(&*store, config, profile.as_ref(), &model)?;
    let throttle = config.throttle();
    let policy = config.error_row_policy();
    let locales = req.selected_locales;

    let unsupported: Vec<String> = locales
        .iter()
        .filter(|l| language_name(l.as_str()).is_none())
        .cloned()
        .collect();
    if !unsupported.is_empty() {
        log::warn!("[translate] Skipping unsupported locales: {}", unsupported.join(", "));
    }

    let (table, report) = blocking(move || {
        let report = translate::translate_rows(
            &client,
            &mut table.rows,
            &locales,
            policy,
            &model,
            &throttle,
        );
        (table, report)
    })
    .await?;

    let message = format!(
        "Translated {} of {} rows",
        report.translated_count, report.total_rows
    );
    state.translation_table = Some(table);
    save_state(&*store, &session, &state)?;

    Ok(Json(json!({
        "ok": true,
        "message": message,
        "translated_count": report.translated_count,
        "total_rows": report.total_rows,
        "errors": report.errors,
        "progress_updates": report.progress_updates,
    })))
}

// ── Download / Export ─────────────────────────────────

#[get("/download-translated-csv")]
pub fn download_translated_csv(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
) -> Result<Attachment, ApiError> {
    let state = session.load(&**store.inner());
    let table = state
        .translation_table
        .ok_or_else(|| bad_request("No CSV data found"))?;
    let filename = shopify_csv::translated_filename(&table.filename);
    csv_download(&table, &[], &filename)
}

#[get("/export-untranslated")]
pub fn export_untranslated(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    session: SessionId,
) -> Result<Attachment, ApiError> {
    let state = session.load(&**store.inner());
    if state.csv_files.is_empty() {
        return Err(bad_request("No CSV files found"));
    }
    let table = pending_rows(&state, config.error_row_policy());
    if table.rows.is_empty() {
        return Err(bad_request("No untranslated rows found"));
    }
    let filename = untranslated_export_filename(Utc::now().naive_utc());
    csv_download(&table, &[COL_SOURCE_FILE], &filename)
}

// ── Edit ──────────────────────────────────────────────

#[post("/remove-csv-file", format = "json", data = "<body>")]
pub fn remove_csv_file(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<RemoveFileRequest>,
) -> ApiResult {
    if body.file_id.trim().is_empty() {
        return Err(bad_request("File id is required"));
    }
    let mut state = session.load(&**store.inner());
    let removed = state
        .remove_csv(body.file_id.trim())
        .ok_or_else(|| not_found("File not found"))?;
    save_state(&**store.inner(), &session, &state)?;
    Ok(Json(json!({
        "ok": true,
        "message": format!("File {} was removed", removed.table.filename),
    })))
}

#[post("/update-translation", format = "json", data = "<body>")]
pub fn update_translation(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<UpdateTranslationRequest>,
) -> ApiResult {
    let mut state = session.load(&**store.inner());
    let table = state
        .translation_table
        .as_mut()
        .ok_or_else(|| bad_request("No CSV data found"))?;
    let row = body
        .row_index
        .and_then(|i| table.rows.get_mut(i))
        .ok_or_else(|| bad_request("Invalid row index"))?;
    row.set(COL_TRANSLATED, body.translated_content.trim());
    let updated = row.clone();

    save_state(&**store.inner(), &session, &state)?;
    Ok(Json(json!({
        "ok": true,
        "message": "Translation updated",
        "updated_row": updated,
    })))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        upload_csv,
        csv_preview,
        filter_untranslated,
        translate_csv,
        download_translated_csv,
        export_untranslated,
        remove_csv_file,
        update_translation,
    ]
}

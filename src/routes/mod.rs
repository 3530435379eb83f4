use rocket::http::{ContentType, Header, Status};
use rocket::serde::json::Json;
use rocket::Route;
use serde_json::{json, Value};

use crate::ai::{resolve_api_key, AiError, OpenAiClient};
use crate::config::AppConfig;
use crate::models::profile::Profile;
use crate::models::session::SessionState;
use crate::models::settings::OPENAI_API_KEY;
use crate::store::Store;

pub mod content;
pub mod profiles;
pub mod settings;
pub mod shopify;
pub mod translator;

/// Error response: a status and `{"ok": false, "error": ...}`.
pub type ApiError = (Status, Json<Value>);
pub type ApiResult = Result<Json<Value>, ApiError>;

pub fn fail(status: Status, message: impl Into<String>) -> ApiError {
    (status, Json(json!({"ok": false, "error": message.into()})))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    fail(Status::BadRequest, message)
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    fail(Status::NotFound, message)
}

pub fn server_error(message: impl Into<String>) -> ApiError {
    fail(Status::InternalServerError, message)
}

/// Store errors naming a missing record become 404, the rest 400.
pub fn store_error(message: String) -> ApiError {
    if message.ends_with("not found") {
        not_found(message)
    } else {
        bad_request(message)
    }
}

/// A file download: body, content type and `Content-Disposition`.
#[derive(Responder)]
pub struct Attachment {
    body: Vec<u8>,
    content_type: ContentType,
    disposition: Header<'static>,
}

impl Attachment {
    pub fn new(body: Vec<u8>, content_type: ContentType, filename: &str) -> Self {
        Attachment {
            body,
            content_type,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", disposition_filename(filename)),
            ),
        }
    }
}

/// Filename safe inside a quoted `Content-Disposition` parameter: quotes,
/// backslashes and control characters are dropped.
pub(crate) fn disposition_filename(name: &str) -> String {
    let clean: String = name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    match clean.trim() {
        "" => "download".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// The profile named in the request, or the session's current one.
pub fn resolve_profile(
    store: &dyn Store,
    state: &SessionState,
    explicit: Option<&str>,
) -> Result<Profile, ApiError> {
    let name = explicit
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .or_else(|| state.current_profile.clone())
        .ok_or_else(|| bad_request("No profile selected"))?;
    store
        .profile_find(&name)
        .ok_or_else(|| not_found("Profile not found"))
}

/// Like `resolve_profile`, but a missing selection is not an error. A
/// profile named explicitly must exist.
pub fn optional_profile(
    store: &dyn Store,
    state: &SessionState,
    explicit: Option<&str>,
) -> Result<Option<Profile>, ApiError> {
    match explicit.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => store
            .profile_find(name)
            .map(Some)
            .ok_or_else(|| not_found("Profile not found")),
        None => Ok(state
            .current_profile
            .as_deref()
            .and_then(|name| store.profile_find(name))),
    }
}

/// Model failures are reported as 500s.
pub fn ai_failure(err: AiError) -> ApiError {
    log::warn!("[ai] Request failed: {}", err);
    server_error(format!("AI request failed: {}", err))
}

/// OpenAI client keyed for `profile`, falling back to the global key.
pub fn completer(
    store: &dyn Store,
    config: &AppConfig,
    profile: Option<&Profile>,
    model: &str,
) -> Result<OpenAiClient, ApiError> {
    let global = store.setting_get(OPENAI_API_KEY);
    let key = resolve_api_key(profile.map(|p| p.api_key.as_str()), global.as_deref())
        .map_err(bad_request)?;
    Ok(OpenAiClient::new(
        &key,
        &config.ai.base_url,
        model,
        config.ai.timeout_secs,
    ))
}

/// Run blocking work (model or Shopify calls) off the async workers.
pub async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    rocket::tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| server_error(format!("Background task failed: {}", e)))
}

pub fn routes() -> Vec<Route> {
    let mut all = profiles::routes();
    all.extend(content::routes());
    all.extend(translator::routes());
    all.extend(shopify::routes());
    all.extend(settings::routes());
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename_strips_header_breakers() {
        assert_eq!(disposition_filename("produkter.csv"), "produkter.csv");
        assert_eq!(
            disposition_filename("a\"b\r\nSet-Cookie: x=1.csv"),
            "abSet-Cookie: x=1.csv"
        );
        assert_eq!(disposition_filename("mappe\\fil.csv"), "mappefil.csv");
        assert_eq!(disposition_filename("\"\r\n"), "download");
    }

    #[test]
    fn test_store_error_status() {
        assert_eq!(store_error("Profile not found".into()).0, Status::NotFound);
        assert_eq!(store_error("Name is required".into()).0, Status::BadRequest);
    }
}

use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::json;

use std::sync::Arc;

use crate::models::profile::Profile;
use crate::models::settings::{SHOPIFY_API_TOKEN, SHOPIFY_API_VERSION, SHOPIFY_STORE_URL};
use crate::session::SessionId;
use crate::shopify::{
    self, ArticleDraft, PublishOutcome, ShopifyApi, ShopifyClient, ShopifyCredentials,
    DEFAULT_AUTHOR,
};
use crate::store::Store;

use super::{bad_request, blocking, optional_profile, server_error, ApiError, ApiResult};

// ── Request Types ─────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionRequest {
    #[serde(alias = "profile_name")]
    pub profile: Option<String>,
    pub store_url: String,
    pub api_token: String,
    pub api_version: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadPostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub featured_image_url: Option<String>,
    #[serde(default)]
    pub blog_id: Option<i64>,
    #[serde(default, alias = "profile_name")]
    pub profile: Option<String>,
}

// ── Helpers ───────────────────────────────────────────

/// Credentials given in the request, else the profile's, else the global
/// ones from settings.
fn credentials(
    store: &dyn Store,
    profile: Option<&Profile>,
    explicit: Option<&ConnectionRequest>,
) -> Result<ShopifyCredentials, ApiError> {
    if let Some(req) = explicit {
        if let Some(c) = ShopifyCredentials::new(&req.store_url, &req.api_token, &req.api_version) {
            return Ok(c);
        }
    }
    if let Some(c) = profile.and_then(ShopifyCredentials::from_profile) {
        return Ok(c);
    }
    ShopifyCredentials::new(
        &store.setting_get_or(SHOPIFY_STORE_URL, ""),
        &store.setting_get_or(SHOPIFY_API_TOKEN, ""),
        &store.setting_get_or(SHOPIFY_API_VERSION, ""),
    )
    .ok_or_else(|| bad_request("Shopify credentials are not configured"))
}

fn shopify_failure(err: String) -> ApiError {
    log::warn!("[shopify] {}", err);
    server_error(err)
}

// ── Routes ────────────────────────────────────────────

#[post("/shopify/test-connection", format = "json", data = "<body>")]
pub async fn test_connection(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<ConnectionRequest>,
) -> ApiResult {
    let req = body.into_inner();
    let state = session.load(&**store.inner());
    let profile = optional_profile(&**store.inner(), &state, req.profile.as_deref())?;
    let creds = credentials(&**store.inner(), profile.as_ref(), Some(&req))?;
    let store_url = creds.store_url.clone();
    let api_version = creds.api_version.clone();

    let (shop, blogs) = blocking(move || {
        let client = ShopifyClient::new(creds);
        let shop = client.shop()?;
        let blogs = client.blogs()?;
        Ok::<_, String>((shop, blogs))
    })
    .await?
    .map_err(shopify_failure)?;

    log::info!("[shopify] Connected to {} ({} blogs)", store_url, blogs.len());
    Ok(Json(json!({
        "ok": true,
        "message": format!("Connected to {}", shop.shop_name),
        "shop_name": shop.shop_name,
        "domain": shop.domain,
        "store_url": store_url,
        "api_version": api_version,
        "blogs_count": blogs.len(),
        "blogs": blogs,
    })))
}

#[get("/shopify/blogs?<profile>")]
pub async fn blogs(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    profile: Option<String>,
) -> ApiResult {
    let state = session.load(&**store.inner());
    let profile = optional_profile(&**store.inner(), &state, profile.as_deref())?;
    let creds = credentials(&**store.inner(), profile.as_ref(), None)?;

    let blogs = blocking(move || ShopifyClient::new(creds).blogs())
        .await?
        .map_err(shopify_failure)?;
    Ok(Json(json!({"ok": true, "blogs": blogs})))
}

#[get("/shopify/products?<profile>&<profile_name>")]
pub async fn products(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    profile: Option<String>,
    profile_name: Option<String>,
) -> ApiResult {
    let state = session.load(&**store.inner());
    let explicit = profile.or(profile_name);
    let profile = optional_profile(&**store.inner(), &state, explicit.as_deref())?;
    let creds = credentials(&**store.inner(), profile.as_ref(), None)?;
    let store_url = creds.store_url.clone();

    let products = blocking(move || ShopifyClient::new(creds).products())
        .await?
        .map_err(shopify_failure)?;
    log::info!("[shopify] Listed {} products from {}", products.len(), store_url);
    Ok(Json(json!({"ok": true, "count": products.len(), "products": products})))
}

#[post("/shopify/upload-blog-post", format = "json", data = "<body>")]
pub async fn upload_blog_post(
    store: &State<Arc<dyn Store>>,
    session: SessionId,
    body: Json<UploadPostRequest>,
) -> ApiResult {
    let req = body.into_inner();
    if req.title.trim().is_empty() || req.body_html.trim().is_empty() {
        return Err(bad_request("Title and body content are required"));
    }
    let state = session.load(&**store.inner());
    let profile = optional_profile(&**store.inner(), &state, req.profile.as_deref())?;
    let creds = credentials(&**store.inner(), profile.as_ref(), None)?;

    let author = match req.author.trim() {
        "" => DEFAULT_AUTHOR.to_string(),
        a => a.to_string(),
    };
    let draft = ArticleDraft {
        title: req.title.trim().to_string(),
        body_html: req.body_html.trim().to_string(),
        author,
        featured_image_url: req.featured_image_url,
    };
    let blog_id = req.blog_id;

    let outcome = blocking(move || {
        let client = ShopifyClient::new(creds);
        shopify::publish(&client, &draft, blog_id)
    })
    .await?
    .map_err(shopify_failure)?;

    Ok(Json(match outcome {
        PublishOutcome::Published(article) => {
            log::info!(
                "[shopify] Draft {} created in blog \"{}\"",
                article.article_id,
                article.blog_title
            );
            json!({
                "ok": true,
                "message": format!("Blog post uploaded to \"{}\" as a draft", article.blog_title),
                "article_id": article.article_id,
                "admin_url": article.admin_url,
                "blog_id": article.blog_id,
                "blog_title": article.blog_title,
                "status": article.status,
            })
        }
        PublishOutcome::ChooseBlog(blogs) => json!({
            "ok": true,
            "requires_blog_selection": true,
            "message": "Several blogs found, choose one to publish to",
            "blogs": blogs,
        }),
    }))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![test_connection, blogs, products, upload_blog_post]
}

#[macro_use]
extern crate rocket;

use rocket::serde::json::Json;
use rocket::Request;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

mod ai;
mod boot;
mod config;
mod db;
mod filter;
mod generate;
mod page_info;
mod render;
mod seo;
mod session;
mod shopify;
mod tasks;
mod throttle;
mod translate;

mod import;
mod models;
mod routes;
mod store;


use config::AppConfig;
use store::sqlite::SqliteStore;
use store::Store;

fn error_body(req: &Request<'_>, message: &str) -> Json<Value> {
    Json(json!({
        "ok": false,
        "error": message,
        "path": req.uri().path().to_string(),
    }))
}

#[catch(400)]
fn bad_request(req: &Request<'_>) -> Json<Value> {
    error_body(req, "Bad request")
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Json<Value> {
    error_body(req, "Not found")
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> Json<Value> {
    error_body(req, "Malformed request body")
}

#[catch(500)]
fn server_error(req: &Request<'_>) -> Json<Value> {
    error_body(req, "Internal server error")
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let config = AppConfig::load(Path::new(config::CONFIG_FILE));

    // Boot check: data directory, effective config
    boot::run(&config);

    let store = SqliteStore::new_at(&config.database.path)
        .expect("Failed to initialize database pool");
    store
        .run_migrations()
        .expect("Failed to run database migrations");
    store
        .seed_defaults()
        .expect("Failed to seed default settings");
    log::info!("[boot] Schema version {}", db::schema_version(&store.pool));

    let store: Arc<dyn Store> = Arc::new(store);

    rocket::build()
        .manage(store)
        .manage(config)
        .attach(tasks::BackgroundTasks)
        .mount("/api", routes::routes())
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, server_error],
        )
}

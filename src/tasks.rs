use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::sync::Arc;
use std::time::Duration;

use crate::store::Store;

pub const SESSION_CLEANUP_INTERVAL: &str = "task_session_cleanup_interval";
pub const SESSION_MAX_AGE_DAYS: &str = "task_session_max_age_days";

pub struct BackgroundTasks;

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let store = rocket
            .state::<Arc<dyn Store>>()
            .expect("Store not found in managed state")
            .clone();

        // Session cleanup: uploaded CSVs and selections of idle sessions
        let s = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                let interval = get_interval(&*s, SESSION_CLEANUP_INTERVAL, 60);
                tokio::time::sleep(Duration::from_secs(interval * 60)).await;
                let max_age = get_setting_i64(&*s, SESSION_MAX_AGE_DAYS, 30);
                let cleanup = Arc::clone(&s);
                let outcome =
                    tokio::task::spawn_blocking(move || cleanup.task_cleanup_sessions(max_age))
                        .await;
                match outcome {
                    Ok(Ok(count)) => {
                        if count > 0 {
                            log::info!("[task] Cleaned up {} expired sessions", count);
                        }
                    }
                    Ok(Err(e)) => log::error!("[task] Session cleanup failed: {}", e),
                    Err(e) => log::error!("[task] Session cleanup panicked: {}", e),
                }
            }
        });

        log::info!("[task] Background tasks started");
    }
}

/// Interval in minutes, never below one.
pub(crate) fn get_interval(store: &dyn Store, key: &str, default: u64) -> u64 {
    store
        .setting_get_or(key, &default.to_string())
        .parse::<u64>()
        .unwrap_or(default)
        .max(1)
}

pub(crate) fn get_setting_i64(store: &dyn Store, key: &str, default: i64) -> i64 {
    store
        .setting_get_or(key, &default.to_string())
        .parse::<i64>()
        .unwrap_or(default)
}

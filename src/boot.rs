use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

use crate::config::{AppConfig, CONFIG_FILE};

/// Directory the database file lives in, `.` for a bare file name.
pub fn data_dir(db_path: &str) -> &Path {
    match Path::new(db_path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Run all boot checks. Call this before Rocket launches.
/// Creates the data directory and aborts when it cannot be written.
pub fn run(config: &AppConfig) {
    info!("[boot] Blogsmith boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Data directory ───────────────────────────────
    let dir = data_dir(&config.database.path);
    if !dir.exists() {
        match fs::create_dir_all(dir) {
            Ok(_) => info!("[boot]   Created directory: {}", dir.display()),
            Err(e) => {
                error!("[boot]   FAILED to create directory {}: {}", dir.display(), e);
                errors += 1;
            }
        }
    }

    // ── 2. Data directory writable ──────────────────────
    if dir.exists() {
        let test_file = dir.join(".write_test");
        match fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                error!("[boot]   Data directory not writable: {}", e);
                errors += 1;
            }
        }
    }

    // ── 3. Config files ─────────────────────────────────
    if !Path::new(CONFIG_FILE).exists() {
        warn!("[boot]   {} not found, using defaults", CONFIG_FILE);
        warnings += 1;
    }
    if !Path::new("Rocket.toml").exists() {
        warn!("[boot]   Rocket.toml not found, sessions will not survive a restart without ROCKET_SECRET_KEY");
        warnings += 1;
    }

    // ── 4. Effective configuration ──────────────────────
    info!("[boot]   Database: {}", config.database.path);
    info!(
        "[boot]   Model API: {} (timeout {}s)",
        config.ai.base_url, config.ai.timeout_secs
    );
    info!(
        "[boot]   Models: basic={} enhanced={} edit={} translate={}",
        config.ai.basic_model,
        config.ai.enhanced_model,
        config.ai.edit_model,
        config.ai.translate_model
    );
    info!(
        "[boot]   Throttle: {}ms between calls, {}ms after a rate limit; retry error rows: {}",
        config.throttle.delay_ms,
        config.throttle.rate_limit_delay_ms,
        config.translate.retry_error_rows
    );

    // ── Summary ─────────────────────────────────────────
    if errors > 0 {
        error!(
            "[boot] Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "[boot] Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("[boot] Boot check passed. All systems go.");
    }
}

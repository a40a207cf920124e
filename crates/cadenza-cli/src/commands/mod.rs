pub mod config;
pub mod similar;
pub mod status;
pub mod train;

pub use similar::run_similar;
pub use status::show_status;
pub use train::run_train;

use anyhow::{Context, Result};
use cadenza_core::schema::Database;
use cadenza_recommend::{Config, FeaturesEngine, ModelCache};
use cadenza_som::{CancellationToken, Progress};

type Engine<'a> = FeaturesEngine<&'a Database, &'a Database>;

/// Open the catalog and run `f` against an engine built from `config`.
///
/// Blocking: call from `spawn_blocking`.
fn with_engine<T>(
    config: &Config,
    cancel: CancellationToken,
    f: impl FnOnce(&Engine<'_>) -> Result<T>,
) -> Result<T> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = Database::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;

    let engine = FeaturesEngine::new(&db, &db)
        .with_cache(ModelCache::new(&config.cache_dir))
        .with_train_settings(config.train_settings()?)
        .with_cancellation_token(cancel);

    f(&engine)
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping...");
            token.cancel();
        }
    });
}

fn log_progress(progress: Progress) {
    log::info!(
        "Training iteration {}/{}",
        progress.current_iteration + 1,
        progress.total_iterations
    );
}

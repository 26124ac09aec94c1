pub mod api; // HTTP + WebSocket surface
pub mod assignment; // Validation guard + atomic assign/discharge
pub mod config;
pub mod core_state; // Transport-agnostic state
pub mod db;
pub mod models;
pub mod realtime; // Snapshot synchronizer
pub mod reconciler; // Optimistic client cache
pub mod store; // Entity store adapter

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Database(#[from] db::DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env()?;
    if let Some(parent) = app_config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::info!(
        db_path = %app_config.db_path.display(),
        bind_addr = %app_config.bind_addr,
        department_policy = app_config.department_policy.as_str(),
        "Configuration loaded"
    );

    let bind_addr = app_config.bind_addr;
    let core = Arc::new(core_state::CoreState::open(app_config)?);

    // Report drift only; repair goes through the admin endpoint
    let report = core.store().check_consistency()?;
    if report.issues.is_empty() {
        tracing::info!(beds_checked = report.beds_checked, "Bed occupancy consistent");
    } else {
        for issue in &report.issues {
            tracing::warn!(
                category = %issue.category,
                severity = %issue.severity,
                bed_id = issue.bed_id.as_deref().unwrap_or("-"),
                "{}",
                issue.description
            );
        }
    }

    let mut server = api::start_server(core, bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Bed board ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}

//! services/web/src/bin/web.rs

use show_tell_core::flow::PageFlow;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_lib::{
    adapters::{DbAdapter, JsonClassifierLoader, SmtpMailer},
    config::Config,
    error::AppError,
    web::{router, AppState},
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Prepare the Database ---
    // The pool connects on first use so an unreachable store only affects submissions.
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url)?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    match db_adapter.run_migrations().await {
        Ok(()) => info!("Database migrations complete."),
        Err(e) => warn!("Could not run database migrations, submissions will not be stored: {}", e),
    }

    // --- 3. Initialize Service Adapters ---
    let classifier = Arc::new(JsonClassifierLoader::new(
        config.model_path.clone(),
        config.vectorizer_path.clone(),
    ));
    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    // --- 4. Build the Shared AppState ---
    let flow = PageFlow::new(classifier, db_adapter, mailer, config.week_label.clone());
    let app_state = Arc::new(AppState::new(
        flow,
        config.prompt_image_path.clone(),
        config.session_ttl,
    ));

    // --- 5. Start the Server ---
    let app = router(app_state);
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

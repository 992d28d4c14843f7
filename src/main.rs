use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

use sitesafe::core::config::AppConfig;
use sitesafe::core::shared::state::AppState;
use sitesafe::core::shared::utils::{create_conn, run_migrations};
use sitesafe::main_module::run_axum_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        "Starting sitesafe {} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );

    let pool = create_conn(&config.database_url).context("Failed to connect to database")?;

    if config.run_migrations {
        run_migrations(&pool).map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations applied");
    }

    for (service, configured) in [
        ("OpenAI", config.openai.is_configured()),
        ("VWorld", config.vworld.is_configured()),
        ("KMA", config.kma.is_configured()),
        ("Telegram", config.telegram.is_configured()),
    ] {
        if !configured {
            warn!("{} is not configured; its endpoints will return errors", service);
        }
    }
    if !config.reports.pdf_enabled() {
        warn!("reports.pdf_font_path is not set; PDF exports are disabled");
    }

    let state = AppState::new(config, pool).context("Failed to build HTTP client")?;
    run_axum_server(Arc::new(state)).await?;

    info!("Server stopped");
    Ok(())
}

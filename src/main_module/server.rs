//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::security::{auth::handle_get_me, create_cors_layer};

use super::{health_check, health_check_simple, shutdown_signal};

pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = create_cors_layer(&app_state.config.server.cors_origins);

    #[allow(unused_mut)]
    let mut api_router = Router::new()
        .route("/health", get(health_check_simple))
        .route(ApiUrls::HEALTH, get(health_check))
        .route(ApiUrls::ME, get(handle_get_me))
        .merge(crate::projects::configure())
        .merge(crate::tbm::configure())
        .merge(crate::inspections::configure())
        .merge(crate::heat_wave::configure())
        .merge(crate::geocoding::configure());

    #[cfg(feature = "weather")]
    {
        api_router = api_router.merge(crate::weather::configure());
        info!("Weather routes enabled");
    }

    #[cfg(feature = "ai")]
    {
        api_router = api_router.merge(crate::ai::configure());
        info!("AI routes enabled");
    }

    #[cfg(feature = "telegram")]
    {
        api_router = api_router.merge(crate::telegram::configure());
        info!("Telegram routes enabled");
    }

    #[cfg(feature = "export")]
    {
        api_router = api_router.merge(crate::reports::configure());
        info!("Report export routes enabled");
    }

    api_router
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let server = &app_state.config.server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .map_err(std::io::Error::other)?;

    let app = build_router(Arc::clone(&app_state));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}

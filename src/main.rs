// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::style_registry::StyleRegistry;
use crate::application::view_service::ViewService;
use crate::infrastructure::config::{load_dashboard_config, load_styles_config};
use crate::infrastructure::event_surface::EventSurface;
use crate::infrastructure::http_data_source::HttpDataSource;
use crate::infrastructure::ndjson_stream::NDJSON_CONTENT_TYPE;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    close_view, get_view, health_check, list_fridges, mount_chart, open_view, set_extremes,
    unmount_chart, view_events,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    let styles_config = load_styles_config()?;

    // Create data source (infrastructure layer)
    let source = Arc::new(HttpDataSource::new(
        &config.data_api.base_url,
        Duration::from_secs(config.data_api.timeout_secs),
    )?);
    let styles = Arc::new(StyleRegistry::new(&styles_config));

    // Create services (application layer)
    let dashboard_service =
        DashboardService::new(source.clone(), styles.clone(), styles_config.fridges.clone());
    let command_buffer = config.view.command_buffer;
    let view_service = ViewService::new(
        source.clone(),
        styles.clone(),
        config.view.clone(),
        move |view_id: u64| EventSurface::for_view(view_id, command_buffer),
    );

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        view_service,
    });

    // Close views whose browser never attached
    let reaper = state.clone();
    let attach_timeout = config.view.attach_timeout();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(attach_timeout);
        loop {
            ticker.tick().await;
            reaper.view_service.close_unattached(attach_timeout);
        }
    });

    // Build router (presentation layer)
    // The chart command stream is flushed line by line, so it stays uncompressed
    let compression = CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new(NDJSON_CONTENT_TYPE)));

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/fridges", get(list_fridges))
        .route("/views", post(open_view))
        .route("/views/:id", get(get_view).delete(close_view))
        .route("/views/:id/events", get(view_events))
        .route("/views/:id/charts/:column", post(mount_chart).delete(unmount_chart))
        .route("/views/:id/charts/:column/extremes", post(set_extremes))
        .layer(compression)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.listen.parse()?;
    tracing::info!("Starting cryo-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

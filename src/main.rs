use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;

use services::sheet::schema::OutputSchema;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;
    let port = config.port;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    // Build our application with a route
    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::convert::routes(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Run it
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
#[derive(Clone)]
pub struct AppState {
    config: config::Config,
    schema: OutputSchema,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        Self {
            config,
            schema: OutputSchema::new(),
        }
    }
}

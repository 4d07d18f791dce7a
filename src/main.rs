use std::any::Any;
use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use parlor::{AppState, fanout::Hub, persist::Store, registry::Registry, ws};
use tokio::sync::Mutex;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "data";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = dotenv::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let data_dir = dotenv::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_owned());

    let registry = Registry::load(Store::new(&data_dir));
    tracing::info!(rooms = registry.room_names().len(), %data_dir, "registry loaded");

    let state = AppState {
        registry: Arc::new(Mutex::new(registry)),
        hub: Hub::new(),
    };

    let app = Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/ws", get(ws::chat_ws))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn banner() -> &'static str {
    "parlor chat server"
}

async fn health() -> &'static str {
    "OK"
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong").into_response()
}

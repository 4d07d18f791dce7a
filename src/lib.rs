pub mod events;
pub mod fanout;
pub mod persist;
pub mod registry;
pub mod ws;

use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::Mutex;

use crate::fanout::Hub;
use crate::registry::Registry;

/// Constructed once in `main` and handed to every connection handler.
/// The mutex serializes all registry mutation; no handler holds it across
/// an outbound send.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub registry: Arc<Mutex<Registry>>,
    pub hub: Hub,
}

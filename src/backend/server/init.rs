/**
 * Server Initialization
 *
 * # Initialization Process
 *
 * 1. Open the store (SQLite or memory)
 * 2. Build the notifier (SMTP or log-only)
 * 3. Create the hub with the chat configuration and shared secret
 * 4. Create and configure the router
 */

use axum::Router;

use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_notifier, load_store, ServerConfig};
use crate::backend::server::state::AppState;
use crate::realtime::SyncHub;

/// Create the hub and the router serving it
///
/// The hub is returned as well so the caller can close live channels on
/// shutdown.
pub async fn create_app(config: ServerConfig) -> (Router<()>, SyncHub) {
    tracing::info!("Initializing pair chat server");

    let store = load_store(config.database_url.as_deref()).await;
    let notifier = load_notifier(config.smtp.as_ref());

    let mut hub = SyncHub::new(config.chat, store, notifier);
    match config.chat_password {
        Some(secret) => hub = hub.with_shared_secret(secret),
        None => tracing::warn!("CHAT_PASSWORD not set. Logins will be refused."),
    }

    let app = create_router(AppState::new(hub.clone()));
    tracing::info!("Router configured");

    (app, hub)
}

/**
 * Router Configuration
 *
 * Assembles every `/api` route into one Axum router.
 *
 * # Routes
 *
 * - `POST /api/auth` - shared-secret login
 * - `GET /api/messages` - history, ascending
 * - `POST /api/messages` - send a message
 * - `POST /api/messages/read` - set the durable read flag
 * - `GET /api/user-status` - participant status
 * - `POST /api/user-status` - explicit status change
 * - `POST /api/typing` - typing indicator events
 * - `POST /api/read-receipts` - read receipt fan-out
 * - `GET /api/realtime` - live channel (SSE)
 *
 * Unknown routes fall through to a JSON 404.
 */

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route(
            "/api/auth",
            axum::routing::post({
                use crate::backend::auth::handlers::login;
                login
            }),
        )
        .route(
            "/api/messages",
            axum::routing::get({
                use crate::backend::chat::handlers::list_messages;
                list_messages
            })
            .post({
                use crate::backend::chat::handlers::send_message;
                send_message
            }),
        )
        .route(
            "/api/messages/read",
            axum::routing::post({
                use crate::backend::chat::handlers::mark_read;
                mark_read
            }),
        )
        .route(
            "/api/user-status",
            axum::routing::get({
                use crate::backend::chat::handlers::get_status;
                get_status
            })
            .post({
                use crate::backend::chat::handlers::update_status;
                update_status
            }),
        )
        .route(
            "/api/typing",
            axum::routing::post({
                use crate::backend::chat::handlers::handle_typing_event;
                handle_typing_event
            }),
        )
        .route(
            "/api/read-receipts",
            axum::routing::post({
                use crate::backend::chat::handlers::handle_read_receipt;
                handle_read_receipt
            }),
        )
        .route(
            "/api/realtime",
            axum::routing::get({
                use crate::backend::realtime::handle_realtime_subscription;
                handle_realtime_subscription
            }),
        );

    // Fallback handler for 404
    let router = router.fallback(|| async { BackendError::not_found("Not Found") });

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

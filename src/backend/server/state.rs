/**
 * Application State
 *
 * Handlers share one [`SyncHub`]. The `FromRef` implementation lets a
 * handler extract the hub directly with `State(hub): State<SyncHub>`.
 */

use axum::extract::FromRef;

use crate::realtime::SyncHub;

#[derive(Clone)]
pub struct AppState {
    pub hub: SyncHub,
}

impl AppState {
    pub fn new(hub: SyncHub) -> Self {
        Self { hub }
    }
}

impl FromRef<AppState> for SyncHub {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

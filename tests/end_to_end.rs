//! Two HTTP sessions against a served router

#![cfg(feature = "ssr")]

mod common;

use std::sync::Arc;

use common::{hub, wait_for_view, RecordingNotifier};
use pairchat::backend::routes::create_router;
use pairchat::backend::AppState;
use pairchat::client::{ConnectionSession, ConnectionState, HttpTransport};
use pairchat::realtime::SyncHub;
use pairchat::shared::{NewMessage, ParticipantId, PresenceStatus};

async fn serve(hub: SyncHub) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(AppState::new(hub));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn join(base_url: &str, hub: &SyncHub, participant: ParticipantId) -> ConnectionSession {
    let session = ConnectionSession::new(
        participant,
        hub.config().clone(),
        Arc::new(HttpTransport::new(base_url)),
    );
    session.connect().await.unwrap();
    session
}

#[tokio::test]
async fn test_message_round_trip_over_http() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (hub, _store) = hub(notifier.clone());
    let base_url = serve(hub.clone()).await;

    let alice_login = HttpTransport::new(&base_url)
        .authenticate(ParticipantId::A, "hunter2")
        .await
        .unwrap();
    assert!(alice_login.is_admin);

    let alice = join(&base_url, &hub, ParticipantId::A).await;
    let bob = join(&base_url, &hub, ParticipantId::B).await;
    let mut alice_rx = alice.subscribe();
    let mut bob_rx = bob.subscribe();
    wait_for_view(&mut bob_rx, |view| view.peer_presence == Some(PresenceStatus::Online)).await;

    bob.set_typing(true);
    wait_for_view(&mut alice_rx, |view| view.peer_typing).await;

    let sent = bob
        .send_message(NewMessage::text(ParticipantId::B, "over the wire"))
        .await
        .unwrap();
    let view = wait_for_view(&mut alice_rx, |view| view.messages().iter().any(|m| m.id == sent.id)).await;
    assert_eq!(view.messages()[0].content, "over the wire");

    // Alice is visible, so Bob sees the receipt.
    wait_for_view(&mut bob_rx, |view| view.messages().iter().any(|m| m.id == sent.id && m.read)).await;
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_server_close_is_followed_by_reconnect() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (hub, _store) = hub(notifier);
    let base_url = serve(hub.clone()).await;

    let alice = join(&base_url, &hub, ParticipantId::A).await;
    let mut alice_rx = alice.subscribe();

    assert_eq!(hub.disconnect(ParticipantId::A), 1);
    let sent = hub
        .send_message(NewMessage::text(ParticipantId::B, "while you were away"))
        .await
        .unwrap();

    // Delivered live or by the history reload after reconnecting.
    let view = wait_for_view(&mut alice_rx, |view| {
        view.connection == ConnectionState::Connected && view.messages().iter().any(|m| m.id == sent.id)
    })
    .await;
    assert_eq!(view.messages().len(), 1);
}

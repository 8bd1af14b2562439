//! Exercises the ordered teardown across the real queue, control-plane
//! client, UI-state writer, event log, and recorder together, rather than
//! each module's own isolated unit tests.

use harness_mux::controlplane::protocol::Scope;
use harness_mux::controlplane::ControlPlaneClient;
use harness_mux::persistence::event_log::EventLog;
use harness_mux::persistence::files::UiState;
use harness_mux::persistence::DebouncedUiStateWriter;
use harness_mux::queue::OpsQueue;
use harness_mux::render::recorder::Recorder;
use harness_mux::shutdown::shutdown;

use tokio::net::TcpListener;

async fn connected_client() -> ControlPlaneClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });
    ControlPlaneClient::connect(
        "127.0.0.1",
        addr.port(),
        Scope {
            tenant_id: "t".into(),
            user_id: "u".into(),
            workspace_id: "w".into(),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn shutdown_drains_the_queue_and_closes_every_resource() {
    let dir = tempfile::tempdir().unwrap();

    let mut queue = OpsQueue::new();
    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ran_clone = ran.clone();
    queue.enqueue_background(Box::pin(async move {
        ran_clone.store(true, std::sync::atomic::Ordering::SeqCst);
    }));

    let mut client = connected_client().await;

    let mut ui_state_writer = DebouncedUiStateWriter::new(dir.path().join("ui-state.json"));
    ui_state_writer.mutate(UiState {
        left_pane_width_percent: 70,
        ..Default::default()
    });

    let mut event_log = EventLog::open(dir.path().join("events.jsonl")).await.unwrap();
    let mut recorder = Recorder::disabled();

    shutdown(&mut queue, &mut client, &mut ui_state_writer, &mut event_log, &mut recorder).await;

    assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    assert!(queue.is_idle());
    assert!(client.is_closed());

    let loaded: Option<UiState> =
        harness_mux::persistence::files::load_json(&dir.path().join("ui-state.json"))
            .await
            .unwrap();
    assert_eq!(loaded.unwrap().left_pane_width_percent, 70);
}

#[tokio::test]
async fn shutdown_is_idempotent_across_two_calls() {
    let dir = tempfile::tempdir().unwrap();

    let mut queue = OpsQueue::new();
    let mut client = connected_client().await;
    let mut ui_state_writer = DebouncedUiStateWriter::new(dir.path().join("ui-state.json"));
    let mut event_log = EventLog::disabled();
    let mut recorder = Recorder::disabled();

    shutdown(&mut queue, &mut client, &mut ui_state_writer, &mut event_log, &mut recorder).await;
    shutdown(&mut queue, &mut client, &mut ui_state_writer, &mut event_log, &mut recorder).await;

    assert!(client.is_closed());
}

//! Startup orchestration: brings the terminal into raw/alternate-screen
//! mode, hydrates workspace state from the control plane, and reports once
//! the first meaningful paint has settled.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use crossterm::execute;
use crossterm::terminal::{enable_raw_mode, EnterAlternateScreen};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::cli::EnvOverrides;
use crate::controlplane::protocol::Scope;
use crate::controlplane::ControlPlaneClient;
use crate::error::{HarnessError, Result};
use crate::queue::OpsQueue;
use crate::render::Renderer;
use crate::workspace::Workspace;

pub const STARTUP_SETTLE_QUIET_MS: u64 = 300;
pub const STARTUP_SETTLE_FALLBACK_MS: u64 = 1500;
const PALETTE_PROBE_TIMEOUT_MS: u64 = 200;
const BACKGROUND_PROBE_HARD_CAP_MS: u64 = 5000;

#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub foreground: Option<String>,
    pub background: Option<String>,
}

/// Terminal geometry plus raw-mode activation, step 1 of the orchestrator.
pub struct TerminalSetup {
    pub cols: u16,
    pub rows: u16,
}

/// Enables raw mode and the alternate screen, and reads the initial size.
/// Refuses with [`HarnessError::Terminal`] when stdin is not a TTY (exit
/// code 2 at the CLI boundary).
pub fn enter_terminal() -> Result<TerminalSetup> {
    if !std::io::stdin().is_terminal() {
        return Err(HarnessError::Terminal(
            "harness-mux must be run in an interactive terminal".to_string(),
        ));
    }
    enable_raw_mode().map_err(|e| HarnessError::Terminal(e.to_string()))?;
    execute!(std::io::stdout(), EnterAlternateScreen)
        .map_err(|e| HarnessError::Terminal(e.to_string()))?;
    let (cols, rows) = crossterm::terminal::size().map_err(|e| HarnessError::Terminal(e.to_string()))?;
    Ok(TerminalSetup { cols, rows })
}

/// Queries the terminal's foreground/background color via OSC 10/11 with a
/// short timeout, falling back to `HARNESS_TERM_FG`/`HARNESS_TERM_BG`
/// overrides, then to no theme at all.
pub async fn probe_palette(overrides: &EnvOverrides) -> Theme {
    if overrides.term_fg.is_some() || overrides.term_bg.is_some() {
        return Theme {
            foreground: overrides.term_fg.clone(),
            background: overrides.term_bg.clone(),
        };
    }

    let probe = async {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"\x1b]10;?\x07\x1b]11;?\x07").await.ok()?;
        stdout.flush().await.ok()?;
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 256];
        let n = stdin.read(&mut buf).await.ok()?;
        Some(String::from_utf8_lossy(&buf[..n]).to_string())
    };

    match timeout(Duration::from_millis(PALETTE_PROBE_TIMEOUT_MS), probe).await {
        Ok(Some(response)) => parse_osc_palette(&response),
        _ => Theme::default(),
    }
}

fn parse_osc_palette(response: &str) -> Theme {
    let mut theme = Theme::default();
    for (marker, field) in [("]10;", &mut theme.foreground), ("]11;", &mut theme.background)] {
        if let Some(start) = response.find(marker) {
            let rest = &response[start + marker.len()..];
            if let Some(end) = rest.find(['\x07', '\x1b']) {
                *field = Some(rest[..end].to_string());
            }
        }
    }
    theme
}

/// Step 3: open a subscription just to learn the starting cursor, then
/// close it immediately, recording the baseline for step 5's real
/// subscription.
pub async fn read_baseline_cursor(client: &mut ControlPlaneClient) -> Result<u64> {
    let (subscription_id, starting_cursor) = client.stream_subscribe(None).await?;
    client.stream_unsubscribe(subscription_id).await?;
    Ok(starting_cursor)
}

/// Step 4: upsert the invocation directory and hydrate directories,
/// repositories, and tasks. The control-plane calls for repository/task
/// hydration are issued as `stream.subscribe`-style reads; in this runtime
/// they arrive as observed events once subscribed (step 5), so this step's
/// job is only to register the invocation directory.
pub async fn hydrate_invocation_directory(
    workspace: &mut Workspace,
    client: &mut ControlPlaneClient,
    invoke_cwd: &str,
) -> Result<()> {
    client.ping().await?;
    let directory_id = uuid::Uuid::new_v4().to_string();
    workspace.projection.apply(crate::workspace::events::ObservedEvent {
        cursor: workspace.projection.next_cursor(),
        kind: crate::workspace::events::EventKind::DirectoryUpsert {
            directory_id,
            path: invoke_cwd.to_string(),
        },
    });
    Ok(())
}

/// Step 6: queue persisted conversations (ordered by their recorded order)
/// onto the background queue, recording completion order in `resumed`; if
/// one was active at last persist, it is additionally activated via the
/// latest-wins queue so it wins any race with a user-driven activation.
pub fn queue_persisted_conversation_activation(
    queue: &mut OpsQueue,
    resumed: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    activated: std::sync::Arc<std::sync::Mutex<Option<String>>>,
    persisted_order: Vec<String>,
    initial_active: Option<String>,
) {
    for session_id in persisted_order {
        let resumed = resumed.clone();
        queue.enqueue_background(Box::pin(async move {
            resumed.lock().unwrap().push(session_id);
        }));
    }
    if let Some(session_id) = initial_active {
        crate::lifecycle::enqueue_activate(queue, activated, session_id);
    }
}

/// Step 7: a paint only happens when `dirty` is set (by an envelope, queue
/// completion, or other mutation); this drains paints until one lands with
/// non-zero changed rows after a quiet window, or the hard fallback
/// elapses and forces one regardless.
pub async fn wait_for_settle_paint(
    renderer: &mut Renderer,
    workspace: &Workspace,
    cols: u16,
    rows: u16,
    dirty: &mut bool,
) -> Duration {
    let modal_manager = crate::modal::ModalManager::new();
    let started = Instant::now();
    let quiet = Duration::from_millis(STARTUP_SETTLE_QUIET_MS);
    let fallback = Duration::from_millis(STARTUP_SETTLE_FALLBACK_MS);

    loop {
        let elapsed = started.elapsed();
        if *dirty {
            *dirty = false;
            let frame = renderer.build(workspace, &modal_manager, None, cols, rows, 0);
            let (diff, _issues) = renderer.diff_and_advance(frame);
            if !diff.is_empty() && elapsed >= quiet {
                return elapsed;
            }
        }
        if elapsed >= fallback {
            renderer.invalidate();
            let frame = renderer.build(workspace, &modal_manager, None, cols, rows, 0);
            renderer.diff_and_advance(frame);
            return elapsed;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Background probe budget, used to cap step-6-style probing operations
/// that would otherwise run unbounded.
pub fn background_probe_budget() -> Duration {
    Duration::from_millis(BACKGROUND_PROBE_HARD_CAP_MS)
}

pub fn connect_scope(tenant_id: String, user_id: String, workspace_id: String) -> Scope {
    Scope {
        tenant_id,
        user_id,
        workspace_id,
    }
}

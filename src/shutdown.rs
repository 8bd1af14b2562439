//! Ordered, idempotent teardown. Every step swallows its own errors except
//! the final terminal restore, which always runs — on a clean exit, on a
//! fatal error, and (via the guard) on an unwind.

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, LeaveAlternateScreen};

use crate::controlplane::ControlPlaneClient;
use crate::persistence::event_log::EventLog;
use crate::persistence::DebouncedUiStateWriter;
use crate::queue::OpsQueue;
use crate::render::recorder::Recorder;

/// Runs the ordered teardown sequence. Safe to call more than once; each
/// substep is cheap/idempotent on its own (queue drain on an empty queue,
/// closing an already-closed client, restoring an already-restored
/// terminal).
pub async fn shutdown(
    queue: &mut OpsQueue,
    client: &mut ControlPlaneClient,
    ui_state_writer: &mut DebouncedUiStateWriter,
    event_log: &mut EventLog,
    recorder: &mut Recorder,
) {
    let _ = ui_state_writer.flush().await;

    queue.wait_for_drain().await;

    client.close();

    let _ = event_log.flush().await;
    event_log.close().await;

    recorder.close().await;

    restore_terminal_state();
}

/// Restores raw mode and the primary screen. Guarded so repeated calls
/// (clean shutdown followed by a panic hook, say) are harmless.
pub fn restore_terminal_state() {
    let _ = disable_raw_mode();
    let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
}

/// Installed once at startup so an unwinding panic still restores the
/// terminal before the process exits — the "fatal" path in the error
/// taxonomy.
pub fn install_panic_restore_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal_state();
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_terminal_state_is_idempotent() {
        restore_terminal_state();
        restore_terminal_state();
    }
}

//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd` for the backend worker. A command that could not be queued is
/// handed back so the caller can unwind any state it set up for it.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> Result<(), BackendCommand> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(cmd)) => {
            *status = "UI command queue is full; please retry".to_string();
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
            Err(cmd)
        }
        Err(TrySendError::Disconnected(cmd)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            tracing::error!(command = cmd_name, "ui->backend command queue disconnected");
            Err(cmd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn full_queue_hands_the_command_back() {
        let (cmd_tx, _cmd_rx) = bounded::<BackendCommand>(1);
        let mut status = String::new();
        assert!(dispatch_backend_command(&cmd_tx, BackendCommand::CheckHealth, &mut status).is_ok());

        let rejected = dispatch_backend_command(&cmd_tx, BackendCommand::CheckHealth, &mut status)
            .expect_err("queue is full");
        assert_eq!(rejected.name(), "check_health");
        assert!(status.contains("full"));
    }

    #[test]
    fn disconnected_queue_reports_status() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(1);
        drop(cmd_rx);
        let mut status = String::new();
        assert!(dispatch_backend_command(&cmd_tx, BackendCommand::CheckHealth, &mut status).is_err());
        assert!(status.contains("disconnected"));
    }
}

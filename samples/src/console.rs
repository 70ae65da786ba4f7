use sbcore::handler::{MessageHandler, PumpOptions, PumpStats, ReceiveSource, run_message_pump};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Enter,
    Timeout,
    Interrupted,
}

/// Waits for ENTER on stdin, Ctrl-C, or `timeout`, whichever comes first.
pub async fn wait_for_enter_or_timeout(timeout: Duration) -> WaitOutcome {
    println!(
        "Press [Enter] to exit (or wait {} seconds)",
        timeout.as_secs()
    );

    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        read = stdin.read_line(&mut line) => match read {
            // Closed stdin: keep waiting for the timeout instead.
            Ok(0) | Err(_) => {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => WaitOutcome::Timeout,
                    _ = tokio::signal::ctrl_c() => WaitOutcome::Interrupted,
                }
            }
            Ok(_) => WaitOutcome::Enter,
        },
        _ = tokio::time::sleep(timeout) => WaitOutcome::Timeout,
        _ = tokio::signal::ctrl_c() => WaitOutcome::Interrupted,
    }
}

/// A pump running on its own task.
pub struct BackgroundPump {
    cancel: CancellationToken,
    handle: JoinHandle<PumpStats>,
}

impl BackgroundPump {
    pub fn spawn<S, H>(source: S, handler: H, options: PumpOptions) -> Self
    where
        S: ReceiveSource + 'static,
        H: MessageHandler + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle =
            tokio::spawn(async move { run_message_pump(&source, &handler, options, token).await });
        Self { cancel, handle }
    }

    /// Cancels the pump and waits for the in-flight message to be settled.
    pub async fn stop(self) -> anyhow::Result<PumpStats> {
        self.cancel.cancel();
        Ok(self.handle.await?)
    }

    /// Waits for a pump started with `stop_when_idle` to run dry.
    pub async fn join(self) -> anyhow::Result<PumpStats> {
        Ok(self.handle.await?)
    }
}

pub fn print_stats(label: &str, stats: &PumpStats) {
    println!(
        "{label}: received {}, completed {}, abandoned {}, dead-lettered {}, errors {}",
        stats.received, stats.completed, stats.abandoned, stats.dead_lettered, stats.errors
    );
}

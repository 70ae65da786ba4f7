//! Callback-style message processing on top of a pull receiver.
//!
//! [`run_message_pump`] repeatedly pulls one message from a [`ReceiveSource`],
//! hands it to a [`MessageHandler`] and settles it according to the returned
//! [`Disposition`]. It runs until cancelled, or until the source goes idle
//! when [`PumpOptions::stop_when_idle`] is set. Messages from a
//! receive-and-delete source are never settled or counted as settled.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::common::{SampleError, SampleResult};
use crate::consumer::{Consumer, ReceiveMode};
use crate::link::ReceiveLink;
use crate::message::ReceivedMessageView;

/// What the pump should do with a message after the handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Complete,
    Abandon,
    DeadLetter {
        reason: String,
        description: String,
    },
    /// The handler settled the message itself (or it needs no settlement).
    Keep,
}

impl Disposition {
    pub fn dead_letter(reason: impl Into<String>, description: impl Into<String>) -> Self {
        Self::DeadLetter {
            reason: reason.into(),
            description: description.into(),
        }
    }
}

/// Anything the pump can pull messages from and settle them on.
#[async_trait]
pub trait ReceiveSource: Send + Sync {
    type Message: Send + Sync;

    async fn receive_one(&self, max_wait: Duration) -> SampleResult<Option<Self::Message>>;
    async fn complete(&self, message: &Self::Message) -> SampleResult<()>;
    async fn abandon(&self, message: &Self::Message) -> SampleResult<()>;
    async fn dead_letter(
        &self,
        message: &Self::Message,
        reason: String,
        description: String,
    ) -> SampleResult<()>;
    fn view(&self, message: &Self::Message) -> ReceivedMessageView;

    /// Receive-and-delete sources hand out messages that are already settled.
    fn receive_mode(&self) -> ReceiveMode {
        ReceiveMode::PeekLock
    }
}

#[async_trait]
impl<L: ReceiveLink> ReceiveSource for Consumer<L> {
    type Message = L::Message;

    async fn receive_one(&self, max_wait: Duration) -> SampleResult<Option<Self::Message>> {
        Consumer::receive_one(self, max_wait).await
    }

    async fn complete(&self, message: &Self::Message) -> SampleResult<()> {
        Consumer::complete(self, message).await
    }

    async fn abandon(&self, message: &Self::Message) -> SampleResult<()> {
        Consumer::abandon(self, message).await
    }

    async fn dead_letter(
        &self,
        message: &Self::Message,
        reason: String,
        description: String,
    ) -> SampleResult<()> {
        Consumer::dead_letter(self, message, Some(reason), Some(description)).await
    }

    fn view(&self, message: &Self::Message) -> ReceivedMessageView {
        L::view(message)
    }

    fn receive_mode(&self) -> ReceiveMode {
        Consumer::receive_mode(self)
    }
}

/// Per-message callback.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition>;

    /// Called for receive, handler and settlement failures. The pump keeps
    /// running afterwards.
    async fn on_error(&self, error: &SampleError) {
        log::warn!("Message handler error: {error}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpOptions {
    /// Longest single receive wait.
    pub max_wait: Duration,
    /// Settle `Disposition::Complete` automatically. When false the handler's
    /// `Complete` is treated like `Keep`.
    pub auto_complete: bool,
    /// Stop after the first receive that returns nothing.
    pub stop_when_idle: bool,
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(5),
            auto_complete: true,
            stop_when_idle: false,
        }
    }
}

impl PumpOptions {
    pub fn until_idle(max_wait: Duration) -> Self {
        Self {
            max_wait,
            stop_when_idle: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub received: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub dead_lettered: usize,
    pub errors: usize,
}

/// Runs the receive/handle/settle loop.
pub async fn run_message_pump<S, H>(
    source: &S,
    handler: &H,
    options: PumpOptions,
    cancel: CancellationToken,
) -> PumpStats
where
    S: ReceiveSource + ?Sized,
    H: MessageHandler + ?Sized,
{
    let mut stats = PumpStats::default();

    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = source.receive_one(options.max_wait) => received,
        };

        let message = match received {
            Ok(Some(message)) => message,
            Ok(None) => {
                if options.stop_when_idle {
                    log::debug!("Message pump idle, stopping");
                    break;
                }
                continue;
            }
            Err(e) => {
                stats.errors += 1;
                handler.on_error(&e).await;
                if options.stop_when_idle {
                    break;
                }
                continue;
            }
        };

        stats.received += 1;
        let view = source.view(&message);

        let disposition = match handler.on_message(&view).await {
            Ok(disposition) => disposition,
            Err(e) => {
                stats.errors += 1;
                handler.on_error(&e).await;
                Disposition::Abandon
            }
        };

        if source.receive_mode() == ReceiveMode::ReceiveAndDelete {
            if let Disposition::DeadLetter { .. } = disposition {
                stats.errors += 1;
                let e = SampleError::settle(
                    view.message_id_or_unknown(),
                    "cannot dead-letter in receive-and-delete mode",
                );
                handler.on_error(&e).await;
            }
            continue;
        }

        let settled = match disposition {
            Disposition::Complete if options.auto_complete => source
                .complete(&message)
                .await
                .map(|()| stats.completed += 1),
            Disposition::Complete | Disposition::Keep => Ok(()),
            Disposition::Abandon => source
                .abandon(&message)
                .await
                .map(|()| stats.abandoned += 1),
            Disposition::DeadLetter {
                reason,
                description,
            } => source
                .dead_letter(&message, reason, description)
                .await
                .map(|()| stats.dead_lettered += 1),
        };

        if let Err(e) = settled {
            stats.errors += 1;
            handler.on_error(&e).await;
        }
    }

    log::debug!("Message pump finished: {stats:?}");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        queue: Mutex<VecDeque<ReceivedMessageView>>,
        settled: Mutex<Vec<(String, &'static str)>>,
        fail_complete: bool,
        mode: ReceiveMode,
    }

    impl FakeSource {
        fn with_subjects(subjects: &[&str]) -> Self {
            let queue = subjects
                .iter()
                .enumerate()
                .map(|(i, s)| ReceivedMessageView {
                    message_id: Some(i.to_string()),
                    subject: Some(s.to_string()),
                    ..Default::default()
                })
                .collect();
            Self {
                queue: Mutex::new(queue),
                ..Default::default()
            }
        }

        fn record(&self, message: &ReceivedMessageView, action: &'static str) {
            self.settled
                .lock()
                .unwrap()
                .push((message.message_id_or_unknown().to_string(), action));
        }
    }

    #[async_trait]
    impl ReceiveSource for FakeSource {
        type Message = ReceivedMessageView;

        async fn receive_one(&self, _max_wait: Duration) -> SampleResult<Option<Self::Message>> {
            Ok(self.queue.lock().unwrap().pop_front())
        }

        async fn complete(&self, message: &Self::Message) -> SampleResult<()> {
            if self.fail_complete {
                return Err(SampleError::settle(message.message_id_or_unknown(), "lock lost"));
            }
            self.record(message, "complete");
            Ok(())
        }

        async fn abandon(&self, message: &Self::Message) -> SampleResult<()> {
            self.record(message, "abandon");
            Ok(())
        }

        async fn dead_letter(
            &self,
            message: &Self::Message,
            _reason: String,
            _description: String,
        ) -> SampleResult<()> {
            self.record(message, "dead_letter");
            Ok(())
        }

        fn view(&self, message: &Self::Message) -> ReceivedMessageView {
            message.clone()
        }

        fn receive_mode(&self) -> ReceiveMode {
            self.mode
        }
    }

    struct ScientistsOnly;

    #[async_trait]
    impl MessageHandler for ScientistsOnly {
        async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
            match message.subject.as_deref() {
                Some("Scientist") => Ok(Disposition::Complete),
                Some("Broken") => Err(SampleError::Sample("cannot handle".to_string())),
                _ => Ok(Disposition::dead_letter("ProcessingError", "unknown label")),
            }
        }
    }

    #[tokio::test]
    async fn settles_per_disposition_and_stops_when_idle() {
        let source = FakeSource::with_subjects(&["Scientist", "Physicist", "Scientist", "Broken"]);
        let stats = run_message_pump(
            &source,
            &ScientistsOnly,
            PumpOptions::until_idle(Duration::from_millis(10)),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(
            stats,
            PumpStats {
                received: 4,
                completed: 2,
                abandoned: 1,
                dead_lettered: 1,
                errors: 1,
            }
        );
        let settled = source.settled.lock().unwrap().clone();
        assert_eq!(
            settled,
            vec![
                ("0".to_string(), "complete"),
                ("1".to_string(), "dead_letter"),
                ("2".to_string(), "complete"),
                ("3".to_string(), "abandon"),
            ]
        );
    }

    #[tokio::test]
    async fn receive_and_delete_messages_are_not_settled() {
        let source = FakeSource {
            mode: ReceiveMode::ReceiveAndDelete,
            ..FakeSource::with_subjects(&["Scientist", "Broken", "Physicist"])
        };
        let stats = run_message_pump(
            &source,
            &ScientistsOnly,
            PumpOptions::until_idle(Duration::from_millis(10)),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(
            stats,
            PumpStats {
                received: 3,
                completed: 0,
                abandoned: 0,
                dead_lettered: 0,
                errors: 2,
            }
        );
        assert!(source.settled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn without_auto_complete_messages_are_kept() {
        let source = FakeSource::with_subjects(&["Scientist"]);
        let options = PumpOptions {
            auto_complete: false,
            ..PumpOptions::until_idle(Duration::from_millis(10))
        };
        let stats = run_message_pump(&source, &ScientistsOnly, options, CancellationToken::new()).await;
        assert_eq!(stats.received, 1);
        assert_eq!(stats.completed, 0);
        assert!(source.settled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn settlement_failures_are_counted() {
        let source = FakeSource {
            fail_complete: true,
            ..FakeSource::with_subjects(&["Scientist", "Scientist"])
        };
        let stats = run_message_pump(
            &source,
            &ScientistsOnly,
            PumpOptions::until_idle(Duration::from_millis(10)),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(stats.received, 2);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.errors, 2);
    }

    #[tokio::test]
    async fn cancellation_stops_the_pump() {
        let source = FakeSource::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = run_message_pump(
            &source,
            &ScientistsOnly,
            PumpOptions::default(),
            cancel,
        )
        .await;
        assert_eq!(stats, PumpStats::default());
    }
}

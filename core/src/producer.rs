use azservicebus::{ServiceBusMessage, ServiceBusSender};
use azure_core::time::OffsetDateTime;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::common::{SampleError, SampleResult};
use crate::link::SendLink;
use crate::message::OutgoingMessage;

/// Sender links opened per producer. Sends are spread round-robin across
/// them, so this bounds how many sends are in flight at once.
pub const SEND_LINKS: usize = 4;

/// Sends messages to a single queue or topic.
///
/// Each link lives behind its own `Mutex<Option<_>>` so the producer can be
/// shared between tasks and disposed exactly once; every call after
/// [`Producer::dispose`] fails with `Sender already disposed`.
pub struct Producer<L = ServiceBusSender> {
    links: Arc<Vec<Mutex<Option<L>>>>,
    next: Arc<AtomicUsize>,
    entity: String,
}

impl<L> Clone for Producer<L> {
    fn clone(&self) -> Self {
        Self {
            links: Arc::clone(&self.links),
            next: Arc::clone(&self.next),
            entity: self.entity.clone(),
        }
    }
}

impl<L> fmt::Debug for Producer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("entity", &self.entity)
            .field("links", &self.links.len())
            .finish()
    }
}

impl<L> PartialEq for Producer<L> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.links, &other.links)
    }
}

impl<L: SendLink> Producer<L> {
    pub fn new(link: L, entity: impl Into<String>) -> Self {
        Self::with_links(vec![link], entity)
    }

    /// Producer over several links to the same entity. An empty list yields
    /// a producer that behaves as already disposed.
    pub fn with_links(links: Vec<L>, entity: impl Into<String>) -> Self {
        Self {
            links: Arc::new(links.into_iter().map(|l| Mutex::new(Some(l))).collect()),
            next: Arc::new(AtomicUsize::new(0)),
            entity: entity.into(),
        }
    }

    /// Queue or topic this producer sends to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    fn next_link(&self) -> SampleResult<&Mutex<Option<L>>> {
        if self.links.is_empty() {
            return Err(SampleError::Disposed("Sender"));
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.links.len();
        Ok(&self.links[index])
    }

    /// Sends a single message.
    pub async fn send(&self, message: OutgoingMessage) -> SampleResult<()> {
        let id = message.message_id.clone();
        let message = ServiceBusMessage::try_from(message)?;

        let mut guard = self.next_link()?.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Sender"))?;
        link.send(vec![message])
            .await
            .map_err(|e| SampleError::SendFailed(format!("{}: {e}", self.entity)))?;

        log::debug!(
            "Sent message {} to {}",
            id.as_deref().unwrap_or("<no id>"),
            self.entity
        );
        Ok(())
    }

    /// Submits every message concurrently and waits for all of them.
    ///
    /// All sends are awaited even when one fails; the first failure is
    /// returned.
    pub async fn send_all(&self, messages: Vec<OutgoingMessage>) -> SampleResult<()> {
        let total = messages.len();
        let results = join_all(messages.into_iter().map(|m| self.send(m))).await;

        let mut first_error = None;
        let mut failed = 0;
        for result in results {
            if let Err(e) = result {
                failed += 1;
                log::error!("Send to {} failed: {e}", self.entity);
                first_error.get_or_insert(e);
            }
        }

        log::info!(
            "Batch send to {}: {} successful, {} failed out of {}",
            self.entity,
            total - failed,
            failed,
            total
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Schedules a message for `enqueue_time` and returns its sequence number.
    pub async fn schedule(
        &self,
        message: OutgoingMessage,
        enqueue_time: OffsetDateTime,
    ) -> SampleResult<i64> {
        let message = ServiceBusMessage::try_from(message)?;

        let mut guard = self.next_link()?.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Sender"))?;
        let sequence_number = link
            .schedule(message, enqueue_time)
            .await
            .map_err(|e| SampleError::SendFailed(format!("schedule on {}: {e}", self.entity)))?;

        log::debug!(
            "Scheduled message #{sequence_number} on {} for {enqueue_time}",
            self.entity
        );
        Ok(sequence_number)
    }

    pub async fn cancel_scheduled(&self, sequence_number: i64) -> SampleResult<()> {
        let mut guard = self.next_link()?.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Sender"))?;
        link.cancel_scheduled(sequence_number).await.map_err(|e| {
            SampleError::SendFailed(format!(
                "cancel #{sequence_number} on {}: {e}",
                self.entity
            ))
        })
    }

    /// Closes every link. Calling it twice is a no-op.
    pub async fn dispose(&self) -> SampleResult<()> {
        let mut first_error = None;
        for slot in self.links.iter() {
            let Some(link) = slot.lock().await.take() else {
                continue;
            };
            if let Err(e) = link.close().await {
                first_error.get_or_insert(SampleError::ConnectionFailed(format!(
                    "dispose sender: {e}"
                )));
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkResult;
    use async_trait::async_trait;
    use claims::{assert_err, assert_ok};
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        sent: AtomicUsize,
        closed: AtomicUsize,
    }

    struct FakeLink {
        counters: Arc<Counters>,
        fail: bool,
    }

    #[async_trait]
    impl SendLink for FakeLink {
        async fn send(&mut self, messages: Vec<ServiceBusMessage>) -> LinkResult<()> {
            let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err("link detached".into());
            }
            self.counters.sent.fetch_add(messages.len(), Ordering::SeqCst);
            Ok(())
        }

        async fn schedule(
            &mut self,
            _message: ServiceBusMessage,
            _enqueue_time: OffsetDateTime,
        ) -> LinkResult<i64> {
            Ok(42)
        }

        async fn cancel_scheduled(&mut self, _sequence_number: i64) -> LinkResult<()> {
            Ok(())
        }

        async fn close(self) -> LinkResult<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn producer(links: usize, failing: &[usize]) -> (Producer<FakeLink>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let links = (0..links)
            .map(|i| FakeLink {
                counters: Arc::clone(&counters),
                fail: failing.contains(&i),
            })
            .collect();
        (Producer::with_links(links, "BasicQueue"), counters)
    }

    fn messages(count: usize) -> Vec<OutgoingMessage> {
        (0..count)
            .map(|i| OutgoingMessage::text(format!("m{i}")).with_message_id(i.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn send_all_overlaps_sends_across_links() {
        let (producer, counters) = producer(3, &[]);
        assert_ok!(producer.send_all(messages(6)).await);
        assert_eq!(counters.sent.load(Ordering::SeqCst), 6);
        assert_eq!(counters.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn send_all_awaits_everything_and_returns_first_error() {
        let (producer, counters) = producer(2, &[1]);
        let err = assert_err!(producer.send_all(messages(4)).await);
        assert!(matches!(err, SampleError::SendFailed(_)));
        assert_eq!(counters.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn operations_after_dispose_fail() {
        let (producer, counters) = producer(2, &[]);
        assert_ok!(producer.dispose().await);
        assert_ok!(producer.dispose().await);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 2);

        let err = assert_err!(producer.send(OutgoingMessage::text("late")).await);
        assert_eq!(err.to_string(), "Sender already disposed");
        let err = assert_err!(
            producer
                .schedule(OutgoingMessage::text("late"), OffsetDateTime::now_utc())
                .await
        );
        assert!(matches!(err, SampleError::Disposed("Sender")));
        assert_err!(producer.cancel_scheduled(42).await);
        assert_err!(producer.send_all(messages(2)).await);
    }

    #[tokio::test]
    async fn clones_share_links() {
        let (producer, _) = producer(1, &[]);
        let clone = producer.clone();
        assert_eq!(producer, clone);
        assert_ok!(clone.dispose().await);
        assert_err!(producer.send(OutgoingMessage::text("x")).await);
    }

    #[tokio::test]
    async fn schedule_returns_sequence_number() {
        let (producer, _) = producer(1, &[]);
        let seq = assert_ok!(
            producer
                .schedule(OutgoingMessage::text("later"), OffsetDateTime::now_utc())
                .await
        );
        assert_eq!(seq, 42);
    }
}

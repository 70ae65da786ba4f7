use azservicebus::ServiceBusReceiver;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::common::{SampleError, SampleResult};
use crate::entity::EntityPath;
use crate::link::ReceiveLink;
use crate::message::ReceivedMessageView;

/// How the broker hands out messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveMode {
    /// Messages are locked and must be settled explicitly.
    #[default]
    PeekLock,
    /// Messages are removed on delivery; settlement calls are no-ops.
    ReceiveAndDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumerOptions {
    pub receive_mode: ReceiveMode,
    pub prefetch_count: u32,
}

impl ConsumerOptions {
    pub fn peek_lock() -> Self {
        Self::default()
    }

    pub fn receive_and_delete() -> Self {
        Self {
            receive_mode: ReceiveMode::ReceiveAndDelete,
            ..Self::default()
        }
    }

    pub fn with_prefetch(mut self, prefetch_count: u32) -> Self {
        self.prefetch_count = prefetch_count;
        self
    }
}

/// Receives from a queue, a subscription or a dead-letter sub-queue.
///
/// Every call after [`Consumer::dispose`] fails with `Receiver already
/// disposed`.
pub struct Consumer<L = ServiceBusReceiver> {
    link: Arc<Mutex<Option<L>>>,
    entity: EntityPath,
    receive_mode: ReceiveMode,
}

impl<L> Clone for Consumer<L> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
            entity: self.entity.clone(),
            receive_mode: self.receive_mode,
        }
    }
}

impl<L> fmt::Debug for Consumer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("entity", &self.entity)
            .field("receive_mode", &self.receive_mode)
            .finish()
    }
}

impl<L> PartialEq for Consumer<L> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.link, &other.link)
    }
}

impl<L: ReceiveLink> Consumer<L> {
    pub fn new(link: L, entity: EntityPath, receive_mode: ReceiveMode) -> Self {
        Self {
            link: Arc::new(Mutex::new(Some(link))),
            entity,
            receive_mode,
        }
    }

    pub fn entity(&self) -> &EntityPath {
        &self.entity
    }

    pub fn receive_mode(&self) -> ReceiveMode {
        self.receive_mode
    }

    /// Receives up to `max_count` messages. A timeout yields an empty batch.
    pub async fn receive_batch(
        &self,
        max_count: u32,
        timeout: Duration,
    ) -> SampleResult<Vec<L::Message>> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Receiver"))?;

        let messages = link.receive(max_count, timeout).await.map_err(|e| {
            SampleError::ReceiveFailed(format!("{}: {e}", self.entity.display_name()))
        })?;
        if messages.is_empty() {
            log::debug!(
                "receive from {} timed out after {:?}, returning empty result",
                self.entity.display_name(),
                timeout
            );
        }
        Ok(messages)
    }

    /// Receives a single message, or `None` when nothing arrives in time.
    pub async fn receive_one(&self, timeout: Duration) -> SampleResult<Option<L::Message>> {
        Ok(self.receive_batch(1, timeout).await?.into_iter().next())
    }

    /// Browses without locking. Peeked messages cannot be settled.
    pub async fn peek(
        &self,
        max_count: u32,
        from_sequence_number: Option<i64>,
    ) -> SampleResult<Vec<ReceivedMessageView>> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Receiver"))?;
        link.peek(max_count, from_sequence_number)
            .await
            .map_err(|e| SampleError::ReceiveFailed(format!("peek: {e}")))
    }

    pub async fn complete(&self, message: &L::Message) -> SampleResult<()> {
        if self.receive_mode == ReceiveMode::ReceiveAndDelete {
            return Ok(());
        }
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Receiver"))?;
        link.complete(message)
            .await
            .map_err(|e| SampleError::settle(L::message_id(message), e))
    }

    pub async fn abandon(&self, message: &L::Message) -> SampleResult<()> {
        if self.receive_mode == ReceiveMode::ReceiveAndDelete {
            return Ok(());
        }
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Receiver"))?;
        link.abandon(message)
            .await
            .map_err(|e| SampleError::settle(L::message_id(message), e))
    }

    pub async fn dead_letter(
        &self,
        message: &L::Message,
        reason: Option<String>,
        error_description: Option<String>,
    ) -> SampleResult<()> {
        if self.receive_mode == ReceiveMode::ReceiveAndDelete {
            return Err(SampleError::settle(
                L::message_id(message),
                "cannot dead-letter in receive-and-delete mode",
            ));
        }
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(SampleError::Disposed("Receiver"))?;
        link.dead_letter(message, reason, error_description)
            .await
            .map_err(|e| SampleError::settle(L::message_id(message), e))
    }

    /// Closes the link. Calling it twice is a no-op.
    pub async fn dispose(&self) -> SampleResult<()> {
        let Some(link) = self.link.lock().await.take() else {
            return Ok(());
        };
        link.close()
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("dispose receiver: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkResult;
    use async_trait::async_trait;
    use claims::{assert_err, assert_none, assert_ok};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeLink {
        queue: VecDeque<ReceivedMessageView>,
        completed: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ReceiveLink for FakeLink {
        type Message = ReceivedMessageView;

        async fn receive(&mut self, max_count: u32, max_wait: Duration) -> LinkResult<Vec<Self::Message>> {
            if self.queue.is_empty() {
                tokio::time::sleep(max_wait).await;
                return Ok(Vec::new());
            }
            let take = (max_count as usize).min(self.queue.len());
            Ok(self.queue.drain(..take).collect())
        }

        async fn peek(
            &mut self,
            max_count: u32,
            _from_sequence_number: Option<i64>,
        ) -> LinkResult<Vec<ReceivedMessageView>> {
            Ok(self.queue.iter().take(max_count as usize).cloned().collect())
        }

        async fn complete(&mut self, _message: &Self::Message) -> LinkResult<()> {
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn abandon(&mut self, _message: &Self::Message) -> LinkResult<()> {
            Ok(())
        }

        async fn dead_letter(
            &mut self,
            _message: &Self::Message,
            _reason: Option<String>,
            _description: Option<String>,
        ) -> LinkResult<()> {
            Err("lock lost".into())
        }

        async fn close(self) -> LinkResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn message_id(message: &Self::Message) -> String {
            message.message_id_or_unknown().to_string()
        }

        fn view(message: &Self::Message) -> ReceivedMessageView {
            message.clone()
        }
    }

    fn with_ids(ids: &[&str]) -> FakeLink {
        FakeLink {
            queue: ids
                .iter()
                .map(|id| ReceivedMessageView {
                    message_id: Some(id.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn consumer(link: FakeLink, mode: ReceiveMode) -> Consumer<FakeLink> {
        Consumer::new(link, EntityPath::queue("BasicQueue"), mode)
    }

    #[test]
    fn option_builders() {
        assert_eq!(ConsumerOptions::peek_lock().receive_mode, ReceiveMode::PeekLock);
        let opts = ConsumerOptions::receive_and_delete().with_prefetch(50);
        assert_eq!(opts.receive_mode, ReceiveMode::ReceiveAndDelete);
        assert_eq!(opts.prefetch_count, 50);
    }

    #[tokio::test]
    async fn timeout_yields_an_empty_batch() {
        let consumer = consumer(FakeLink::default(), ReceiveMode::PeekLock);
        let batch = assert_ok!(consumer.receive_batch(10, Duration::from_millis(10)).await);
        assert!(batch.is_empty());
        assert_none!(assert_ok!(consumer.receive_one(Duration::from_millis(10)).await));
    }

    #[tokio::test]
    async fn batch_is_capped_at_max_count() {
        let consumer = consumer(with_ids(&["a", "b", "c"]), ReceiveMode::PeekLock);
        let batch = assert_ok!(consumer.receive_batch(2, Duration::from_millis(10)).await);
        assert_eq!(batch.len(), 2);
        let peeked = assert_ok!(consumer.peek(10, None).await);
        assert_eq!(peeked[0].message_id.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn settlement_is_skipped_in_receive_and_delete_mode() {
        let link = with_ids(&["a"]);
        let completed = Arc::clone(&link.completed);
        let consumer = consumer(link, ReceiveMode::ReceiveAndDelete);
        let message = ReceivedMessageView::default();

        assert_ok!(consumer.complete(&message).await);
        assert_ok!(consumer.abandon(&message).await);
        assert_err!(consumer.dead_letter(&message, None, None).await);
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn link_failures_carry_the_message_id() {
        let consumer = consumer(FakeLink::default(), ReceiveMode::PeekLock);
        let message = ReceivedMessageView {
            message_id: Some("7".to_string()),
            ..Default::default()
        };
        let err = assert_err!(
            consumer
                .dead_letter(&message, Some("r".to_string()), None)
                .await
        );
        assert!(err.to_string().contains('7'));
    }

    #[tokio::test]
    async fn operations_after_dispose_fail() {
        let link = with_ids(&["a"]);
        let closed = Arc::clone(&link.closed);
        let consumer = consumer(link, ReceiveMode::PeekLock);
        let other = consumer.clone();

        assert_ok!(consumer.dispose().await);
        assert_ok!(other.dispose().await);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        let err = assert_err!(other.receive_batch(1, Duration::from_millis(10)).await);
        assert_eq!(err.to_string(), "Receiver already disposed");
        let message = ReceivedMessageView::default();
        assert!(matches!(
            assert_err!(consumer.complete(&message).await),
            SampleError::Disposed("Receiver")
        ));
        assert_err!(consumer.abandon(&message).await);
        assert_err!(consumer.dead_letter(&message, None, None).await);
        assert_err!(consumer.peek(1, None).await);
    }
}

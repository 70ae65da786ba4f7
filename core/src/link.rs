//! The slice of the SDK sender and receiver API that [`Producer`] and
//! [`Consumer`] drive. The SDK types implement these traits; tests plug in
//! in-memory links.
//!
//! [`Producer`]: crate::producer::Producer
//! [`Consumer`]: crate::consumer::Consumer

use async_trait::async_trait;
use azservicebus::receiver::DeadLetterOptions;
use azservicebus::{ServiceBusMessage, ServiceBusReceivedMessage, ServiceBusReceiver, ServiceBusSender};
use azure_core::time::OffsetDateTime;
use std::time::Duration;

use crate::message::ReceivedMessageView;

pub type LinkError = Box<dyn std::error::Error + Send + Sync>;
pub type LinkResult<T> = Result<T, LinkError>;

#[async_trait]
pub trait SendLink: Send + 'static {
    async fn send(&mut self, messages: Vec<ServiceBusMessage>) -> LinkResult<()>;
    async fn schedule(
        &mut self,
        message: ServiceBusMessage,
        enqueue_time: OffsetDateTime,
    ) -> LinkResult<i64>;
    async fn cancel_scheduled(&mut self, sequence_number: i64) -> LinkResult<()>;
    async fn close(self) -> LinkResult<()>;
}

#[async_trait]
pub trait ReceiveLink: Send + 'static {
    type Message: Send + Sync;

    /// Waits at most `max_wait`; an empty batch means nothing arrived.
    async fn receive(&mut self, max_count: u32, max_wait: Duration) -> LinkResult<Vec<Self::Message>>;
    async fn peek(
        &mut self,
        max_count: u32,
        from_sequence_number: Option<i64>,
    ) -> LinkResult<Vec<ReceivedMessageView>>;
    async fn complete(&mut self, message: &Self::Message) -> LinkResult<()>;
    async fn abandon(&mut self, message: &Self::Message) -> LinkResult<()>;
    async fn dead_letter(
        &mut self,
        message: &Self::Message,
        reason: Option<String>,
        description: Option<String>,
    ) -> LinkResult<()>;
    async fn close(self) -> LinkResult<()>;

    fn message_id(message: &Self::Message) -> String;
    fn view(message: &Self::Message) -> ReceivedMessageView;
}

#[async_trait]
impl SendLink for ServiceBusSender {
    async fn send(&mut self, messages: Vec<ServiceBusMessage>) -> LinkResult<()> {
        Ok(self.send_messages(messages).await?)
    }

    async fn schedule(
        &mut self,
        message: ServiceBusMessage,
        enqueue_time: OffsetDateTime,
    ) -> LinkResult<i64> {
        Ok(self.schedule_message(message, enqueue_time).await?)
    }

    async fn cancel_scheduled(&mut self, sequence_number: i64) -> LinkResult<()> {
        Ok(self.cancel_scheduled_message(sequence_number).await?)
    }

    async fn close(self) -> LinkResult<()> {
        Ok(self.dispose().await?)
    }
}

#[async_trait]
impl ReceiveLink for ServiceBusReceiver {
    type Message = ServiceBusReceivedMessage;

    async fn receive(&mut self, max_count: u32, max_wait: Duration) -> LinkResult<Vec<Self::Message>> {
        Ok(self
            .receive_messages_with_max_wait_time(max_count, max_wait)
            .await?)
    }

    async fn peek(
        &mut self,
        max_count: u32,
        from_sequence_number: Option<i64>,
    ) -> LinkResult<Vec<ReceivedMessageView>> {
        let messages = self.peek_messages(max_count, from_sequence_number).await?;
        Ok(messages.iter().map(ReceivedMessageView::from).collect())
    }

    async fn complete(&mut self, message: &Self::Message) -> LinkResult<()> {
        Ok(self.complete_message(message).await?)
    }

    async fn abandon(&mut self, message: &Self::Message) -> LinkResult<()> {
        Ok(self.abandon_message(message, None).await?)
    }

    async fn dead_letter(
        &mut self,
        message: &Self::Message,
        reason: Option<String>,
        description: Option<String>,
    ) -> LinkResult<()> {
        let options = DeadLetterOptions {
            dead_letter_reason: reason,
            dead_letter_error_description: description,
            properties_to_modify: None,
        };
        Ok(self.dead_letter_message(message, options).await?)
    }

    async fn close(self) -> LinkResult<()> {
        Ok(self.dispose().await?)
    }

    fn message_id(message: &Self::Message) -> String {
        message
            .message_id()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn view(message: &Self::Message) -> ReceivedMessageView {
        ReceivedMessageView::from(message)
    }
}

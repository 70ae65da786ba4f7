use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::OutgoingMessage;
use sbcore::{SampleError, SampleResult};
use std::time::Duration;
use uuid::Uuid;

use crate::cli::SampleConfig;
use crate::settings::Settings;

pub const DUPDETECT_QUEUE: &str = "DupdetectQueue";

const MESSAGE_TTL: Duration = Duration::from_secs(60);
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends the same message id twice to a queue with duplicate detection
/// enabled and checks that only one copy comes back.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(DUPDETECT_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let producer = client.create_producer(&queue).await?;
    let message_id = Uuid::new_v4().to_string();
    println!("\tSending messages to {} ...", queue.display_name());
    producer
        .send(OutgoingMessage::default().with_message_id(&message_id).with_time_to_live(MESSAGE_TTL))
        .await?;
    println!("\t=> Sent a message with messageId {message_id}");
    producer
        .send(OutgoingMessage::default().with_message_id(&message_id).with_time_to_live(MESSAGE_TTL))
        .await?;
    println!("\t=> Sent a duplicate message with messageId {message_id}");
    producer.dispose().await?;

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    println!(
        "\n\tWaiting up to {} seconds for messages from {} ...",
        RECEIVE_TIMEOUT.as_secs(),
        queue.display_name()
    );
    let mut checker = DuplicateChecker::default();
    while let Some(message) = consumer.receive_one(RECEIVE_TIMEOUT).await? {
        let id = message.message_id().map(|id| id.to_string()).unwrap_or_default();
        println!("\t<= Received a message with messageId {id}");
        consumer.complete(&message).await?;
        checker.observe(&id)?;
    }
    println!("\tDone receiving messages from {}", queue.display_name());

    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

/// Fails when a message id repeats the one received just before it.
#[derive(Debug, Default)]
pub struct DuplicateChecker {
    last: Option<String>,
}

impl DuplicateChecker {
    pub fn observe(&mut self, message_id: &str) -> SampleResult<()> {
        if self.last.as_deref() == Some(message_id) {
            return Err(SampleError::Sample(
                "Received a duplicate message!".to_string(),
            ));
        }
        self.last = Some(message_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn repeated_id_is_rejected() {
        let mut checker = DuplicateChecker::default();
        assert_ok!(checker.observe("a"));
        assert_ok!(checker.observe("b"));
        let err = assert_err!(checker.observe("b"));
        assert!(err.to_string().contains("Received a duplicate message!"));
    }
}

use sbcore::amqp::AmqpConnection;
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::ReceivedMessageView;
use std::collections::BTreeSet;
use std::time::Duration;

use super::{TOTAL_SEND, send_indexed};
use crate::cli::{SampleConfig, SampleOption};
use crate::settings::Settings;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends over a plain AMQP link and receives the same messages with the
/// SDK, checking that ids and data bodies survive the trip.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let properties = config.connection_properties()?;
    let queue = config.require(SampleOption::Queue)?;

    let mut connection = AmqpConnection::connect(&properties).await?;
    let mut sender = connection.sender(queue).await?;
    send_indexed(&mut sender, TOTAL_SEND).await?;
    sender.close().await?;
    connection.close().await?;

    let mut client = SampleClient::connect(config.connection_string()?).await?;
    let consumer = client
        .create_consumer(&EntityPath::queue(queue), ConsumerOptions::peek_lock())
        .await?;

    let mut tracker = ArrivalTracker::new(TOTAL_SEND);
    while !tracker.is_complete() {
        let message = consumer
            .receive_one(RECEIVE_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Still missing ids {:?}", tracker.missing()))?;
        let view = ReceivedMessageView::from(&message);
        let fresh = tracker.record(&view);
        println!(
            "Received message id {} body '{}'{}",
            view.message_id_or_unknown(),
            view.body_text(),
            if fresh { "" } else { " (not expected)" }
        );
        consumer.complete(&message).await?;
    }
    println!("Received all {TOTAL_SEND} messages");

    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

/// Tracks which of the ids `0..count` have arrived.
#[derive(Debug)]
pub struct ArrivalTracker {
    expected: BTreeSet<String>,
}

impl ArrivalTracker {
    pub fn new(count: usize) -> Self {
        Self {
            expected: (0..count).map(|i| i.to_string()).collect(),
        }
    }

    /// Marks the message's id as seen. False for unknown or repeated ids.
    pub fn record(&mut self, message: &ReceivedMessageView) -> bool {
        message
            .message_id
            .as_ref()
            .is_some_and(|id| self.expected.remove(id))
    }

    pub fn is_complete(&self) -> bool {
        self.expected.is_empty()
    }

    pub fn missing(&self) -> Vec<&str> {
        self.expected.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id(id: &str) -> ReceivedMessageView {
        ReceivedMessageView {
            message_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn completes_once_every_id_arrived() {
        let mut tracker = ArrivalTracker::new(3);
        assert!(tracker.record(&with_id("2")));
        assert!(!tracker.record(&with_id("2")));
        assert!(!tracker.record(&with_id("9")));
        assert!(!tracker.record(&ReceivedMessageView::default()));
        assert_eq!(tracker.missing(), ["0", "1"]);
        assert!(tracker.record(&with_id("0")));
        assert!(tracker.record(&with_id("1")));
        assert!(tracker.is_complete());
    }
}

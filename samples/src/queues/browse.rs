use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::ReceivedMessageView;
use std::time::Duration;

use super::{BASIC_QUEUE, print_sent, scientist_messages};
use crate::cli::SampleConfig;
use crate::settings::Settings;

const PEEK_BATCH: u32 = 10;

/// Sends the scientists and browses the queue without settling anything.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(BASIC_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let producer = client.create_producer(&queue).await?;
    let messages = scientist_messages(Duration::from_secs(2 * 60))?;
    let sent = messages.clone();
    producer.send_all(messages).await?;
    print_sent(&sent);
    producer.dispose().await?;

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    let mut from = None;
    let mut browsed = 0;
    loop {
        let batch = consumer.peek(PEEK_BATCH, from).await?;
        if batch.is_empty() {
            break;
        }
        for message in &batch {
            println!("\t\tMessage peeked:\n{}", message.describe(3));
        }
        browsed += batch.len();
        from = next_sequence_number(&batch).or(from);
    }
    println!("Browsed {browsed} messages in {}", queue.display_name());

    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

/// Where the next peek starts: one past the highest sequence number seen.
pub fn next_sequence_number(batch: &[ReceivedMessageView]) -> Option<i64> {
    batch
        .iter()
        .filter_map(|m| m.sequence_number)
        .max()
        .map(|seq| seq + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_some_eq};

    fn peeked(seq: Option<i64>) -> ReceivedMessageView {
        ReceivedMessageView {
            sequence_number: seq,
            ..Default::default()
        }
    }

    #[test]
    fn continues_after_last_sequence_number() {
        let batch = [peeked(Some(4)), peeked(Some(6)), peeked(Some(5))];
        assert_some_eq!(next_sequence_number(&batch), 7);
        assert_none!(next_sequence_number(&[peeked(None)]));
    }
}

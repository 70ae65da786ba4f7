use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use sbcore::model::scientists;
use std::time::Duration;

use super::{SCIENTIST_LABEL, describe_scientist};
use crate::cli::SampleConfig;
use crate::settings::Settings;

pub const PARTITIONED_QUEUE: &str = "PartitionedQueue";

const ROUNDS: usize = 5;
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends several rounds of scientists keyed by the first letter of their
/// name, then drains the queue.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(PARTITIONED_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let producer = client.create_producer(&queue).await?;
    for round in 0..ROUNDS {
        let messages = partitioned_messages(round)?;
        for message in &messages {
            println!(
                "Message sending: Id = {}, PartitionKey = {}",
                message.message_id.as_deref().unwrap_or("-"),
                message.partition_key.as_deref().unwrap_or("-")
            );
        }
        producer.send_all(messages).await?;
    }
    producer.dispose().await?;

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    let mut received = 0;
    while let Some(message) = consumer.receive_one(RECEIVE_TIMEOUT).await? {
        println!("{}", describe_scientist(&ReceivedMessageView::from(&message)));
        consumer.complete(&message).await?;
        received += 1;
    }
    println!("Received {received} messages from {}", queue.display_name());

    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

/// One round of the scientist batch. Ids are unique across rounds.
pub fn partitioned_messages(round: usize) -> anyhow::Result<Vec<OutgoingMessage>> {
    let batch = scientists();
    let count = batch.len();
    batch
        .iter()
        .enumerate()
        .map(|(i, scientist)| {
            let key: String = scientist.name.chars().take(1).collect();
            Ok(OutgoingMessage::json(scientist)?
                .with_message_id((round * count + i).to_string())
                .with_subject(SCIENTIST_LABEL)
                .with_partition_key(key)
                .with_time_to_live(Duration::from_secs(2 * 60)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok;

    #[test]
    fn partition_key_is_first_letter_of_name() {
        let messages = assert_ok!(partitioned_messages(0));
        assert_eq!(messages[0].partition_key.as_deref(), Some("E"));
        assert_eq!(messages[9].partition_key.as_deref(), Some("K"));
    }

    #[test]
    fn ids_continue_across_rounds() {
        let messages = assert_ok!(partitioned_messages(2));
        assert_eq!(messages[0].message_id.as_deref(), Some("20"));
        assert_eq!(messages[9].message_id.as_deref(), Some("29"));
    }
}

use rand::Rng;
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::OutgoingMessage;
use sbcore::producer::Producer;
use std::time::{Duration, Instant};

use super::BASIC_QUEUE;
use crate::cli::SampleConfig;
use crate::settings::Settings;

const MESSAGE_COUNT: usize = 100;
const PAYLOAD_SIZE: usize = 100;
const MESSAGE_TTL: Duration = Duration::from_secs(5 * 60);
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Times receive-and-complete of the same workload with and without prefetch.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(BASIC_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;
    let producer = client.create_producer(&queue).await?;

    let mut timings = Vec::with_capacity(2);
    for prefetch_count in [0, 50] {
        let options = ConsumerOptions::peek_lock().with_prefetch(prefetch_count);
        let consumer = client.create_consumer(&queue, options).await?;

        send_messages(&producer, MESSAGE_COUNT).await?;
        println!("Receiving messages...");
        let started = Instant::now();
        let mut remaining = MESSAGE_COUNT;
        while remaining > 0 {
            let Some(message) = consumer.receive_one(RECEIVE_TIMEOUT).await? else {
                break;
            };
            consumer.complete(&message).await?;
            remaining -= 1;
        }
        let elapsed = started.elapsed();
        println!("Receive completed");
        println!(
            "Time to receive and complete all messages = {} milliseconds",
            elapsed.as_millis()
        );

        timings.push(elapsed);
        consumer.dispose().await?;
    }

    if let [without, with] = timings[..] {
        println!("\n{}", time_difference(without, with));
    }

    producer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

async fn send_messages(producer: &Producer, count: usize) -> anyhow::Result<()> {
    let mut payload = [0u8; PAYLOAD_SIZE];
    rand::thread_rng().fill(&mut payload[..]);

    println!("\nSending {count} messages to the queue");
    let messages = (0..count)
        .map(|_| OutgoingMessage::new(payload.to_vec()).with_time_to_live(MESSAGE_TTL))
        .collect();
    producer.send_all(messages).await?;
    println!("Send completed");
    Ok(())
}

/// Difference line printed after both runs. Negative when prefetching was
/// slower.
pub fn time_difference(without_prefetch: Duration, with_prefetch: Duration) -> String {
    let difference = without_prefetch.as_millis() as i128 - with_prefetch.as_millis() as i128;
    format!("Time difference = {difference} milliseconds")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_is_signed() {
        assert_eq!(
            time_difference(Duration::from_millis(1500), Duration::from_millis(400)),
            "Time difference = 1100 milliseconds"
        );
        assert_eq!(
            time_difference(Duration::from_millis(400), Duration::from_millis(500)),
            "Time difference = -100 milliseconds"
        );
    }
}

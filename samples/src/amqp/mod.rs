//! Samples that speak AMQP 1.0 directly instead of going through the SDK.

pub mod interop;
pub mod queue_quickstart;
pub mod topic_quickstart;

use sbcore::amqp::{AmqpReceiver, AmqpSender};
use sbcore::message::OutgoingMessage;
use std::time::Duration;

pub const TOTAL_SEND: usize = 10;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Message `i` carries the decimal index as its data body and as message id.
pub fn indexed_message(index: usize) -> OutgoingMessage {
    OutgoingMessage::new(index.to_string()).with_message_id(index.to_string())
}

pub async fn send_indexed(sender: &mut AmqpSender, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        sender.send(&indexed_message(i)).await?;
        log::info!("Sent message {} to {}", i + 1, sender.address());
        println!("Sent message {}.", i + 1);
    }
    Ok(())
}

/// Receives and accepts until `expected` messages arrived. Fails if the link
/// stays quiet for too long before then.
pub async fn receive_expected(receiver: &mut AmqpReceiver, expected: usize) -> anyhow::Result<usize> {
    let mut received = 0;
    while received < expected {
        let view = receiver.receive(RECEIVE_TIMEOUT).await?.ok_or_else(|| {
            anyhow::anyhow!(
                "Timed out on {} after {received} of {expected} messages",
                receiver.address()
            )
        })?;
        received += 1;
        println!(
            "Received message {received} with id {}: {}",
            view.message_id_or_unknown(),
            view.body_text()
        );
    }
    println!("Received all messages, exiting the sample.");
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_message_body_is_the_index() {
        let message = indexed_message(7);
        assert_eq!(message.body_text(), "7");
        assert_eq!(message.message_id.as_deref(), Some("7"));
    }
}

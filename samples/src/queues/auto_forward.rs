use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use std::time::Duration;

use crate::cli::SampleConfig;
use crate::settings::Settings;

pub const SOURCE_TOPIC: &str = "AutoForwardSourceTopic";
pub const TARGET_QUEUE: &str = "AutoForwardTargetQueue";

const MESSAGE_TTL: Duration = Duration::from_secs(90);
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends one message to a topic whose subscription forwards into a queue and
/// one directly to that queue, then expects both on the queue.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let topic = EntityPath::topic(SOURCE_TOPIC);
    let queue = EntityPath::queue(TARGET_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    println!("\nSending messages");
    let topic_sender = client.create_producer(&topic).await?;
    topic_sender.send(forwarded_message("M1")).await?;
    let queue_sender = client.create_producer(&queue).await?;
    queue_sender.send(forwarded_message("M2")).await?;

    println!("\nReceiving messages");
    let receiver = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    for _ in 0..2 {
        let message = receiver
            .receive_one(RECEIVE_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Expected message not received"))?;
        println!("{}", describe(&ReceivedMessageView::from(&message)));
        receiver.complete(&message).await?;
    }

    receiver.dispose().await?;
    queue_sender.dispose().await?;
    topic_sender.dispose().await?;
    client.dispose().await?;
    Ok(())
}

pub fn forwarded_message(label: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!("This is the body of message \"{label}\"."))
        .with_subject(label)
        .with_property("Priority", "1")
        .with_property("Importance", "High")
        .with_time_to_live(MESSAGE_TTL)
}

fn describe(message: &ReceivedMessageView) -> String {
    let mut text = format!(
        "Received message:\n\tLabel:\t{}\n\tBody:\t{}",
        message.subject.as_deref().unwrap_or_default(),
        message.body_text()
    );
    for (name, value) in &message.properties {
        text.push_str(&format!("\n\tProperty:\t{name} = {value}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbcore::message::PropertyValue;

    #[test]
    fn message_carries_label_and_properties() {
        let message = forwarded_message("M1");
        assert_eq!(message.body_text(), "This is the body of message \"M1\".");
        assert_eq!(message.subject.as_deref(), Some("M1"));
        assert_eq!(message.time_to_live, Some(Duration::from_secs(90)));
        assert_eq!(
            message.properties.get("Importance"),
            Some(&PropertyValue::String("High".to_string()))
        );
    }

    #[test]
    fn description_lists_properties() {
        let view = ReceivedMessageView {
            subject: Some("M2".to_string()),
            body: b"hello".to_vec(),
            properties: [("Priority".to_string(), PropertyValue::from("1"))].into(),
            ..Default::default()
        };
        let text = describe(&view);
        assert!(text.contains("\tLabel:\tM2"));
        assert!(text.contains("Property:\tPriority = 1"));
    }
}

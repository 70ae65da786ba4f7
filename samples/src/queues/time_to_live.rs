use async_trait::async_trait;
use sbcore::SampleResult;
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::handler::{Disposition, MessageHandler, PumpOptions};
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use sbcore::producer::Producer;
use std::time::Duration;

use super::dead_letter::alternating_messages;
use super::{BASIC_QUEUE, SCIENTIST_LABEL, describe_scientist};
use crate::cli::SampleConfig;
use crate::console::{BackgroundPump, print_stats, wait_for_enter_or_timeout};
use crate::settings::Settings;

const SHORT_TTL: Duration = Duration::from_secs(15);
const RESUBMIT_TTL: Duration = Duration::from_secs(2 * 60);

/// Lets messages expire into the dead-letter queue, then resubmits them.
pub async fn run(config: SampleConfig, settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(BASIC_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;
    let producer = client.create_producer(&queue).await?;

    let messages: Vec<_> = alternating_messages()?
        .into_iter()
        .map(|m| m.with_time_to_live(SHORT_TTL))
        .collect();
    for message in &messages {
        println!(
            "Message sending: Id = {}",
            message.message_id.as_deref().unwrap_or("-")
        );
    }
    producer.send_all(messages).await?;

    println!("Waiting {} seconds for the messages to expire", SHORT_TTL.as_secs());
    tokio::time::sleep(SHORT_TTL).await;

    let dead_letters = client
        .create_consumer(&queue.dead_letter(), ConsumerOptions::peek_lock())
        .await?;
    let resubmitter = BackgroundPump::spawn(
        dead_letters.clone(),
        Resubmitter {
            producer: producer.clone(),
        },
        PumpOptions::default(),
    );

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    let pump = BackgroundPump::spawn(consumer.clone(), ScientistsOnly, PumpOptions::default());

    wait_for_enter_or_timeout(settings.timing.wait(Duration::from_secs(10))).await;

    print_stats(&queue.dead_letter().display_name(), &resubmitter.stop().await?);
    print_stats(&queue.display_name(), &pump.stop().await?);

    dead_letters.dispose().await?;
    consumer.dispose().await?;
    producer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

/// Fresh copy of an expired message with a longer time-to-live.
pub fn resubmission(message: &ReceivedMessageView) -> OutgoingMessage {
    let mut copy = OutgoingMessage::new(message.body.clone()).with_time_to_live(RESUBMIT_TTL);
    copy.message_id = message.message_id.clone();
    copy.subject = message.subject.clone();
    copy.content_type = message.content_type.clone();
    copy
}

/// Completes JSON scientist messages and dead-letters everything else.
struct ScientistsOnly;

#[async_trait]
impl MessageHandler for ScientistsOnly {
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
        Ok(scientist_disposition(message))
    }
}

pub fn scientist_disposition(message: &ReceivedMessageView) -> Disposition {
    if message.subject.as_deref() == Some(SCIENTIST_LABEL) && message.is_json() {
        println!("{}", describe_scientist(message));
        Disposition::Complete
    } else {
        Disposition::dead_letter("NotAScientist", "Only Scientist messages are processed")
    }
}

struct Resubmitter {
    producer: Producer,
}

#[async_trait]
impl MessageHandler for Resubmitter {
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
        println!(
            "\n\t\tFixing: \n\t\t\tMessageId = {}, \n\t\t\tSequenceNumber = {}, \n\t\t\tLabel = {}",
            message.message_id_or_unknown(),
            message.sequence_number.unwrap_or_default(),
            message.subject.as_deref().unwrap_or_default()
        );
        self.producer.send(resubmission(message)).await?;
        Ok(Disposition::Complete)
    }
}

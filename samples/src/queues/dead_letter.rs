use async_trait::async_trait;
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::handler::{Disposition, MessageHandler, PumpOptions};
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use sbcore::producer::Producer;
use sbcore::{SampleError, SampleResult};
use std::time::Duration;

use super::{BASIC_QUEUE, SCIENTIST_LABEL, describe_scientist, scientist_messages};
use crate::cli::SampleConfig;
use crate::console::{BackgroundPump, print_stats, wait_for_enter_or_timeout};
use crate::settings::Settings;

pub const PHYSICIST_LABEL: &str = "Physicist";
pub const PROCESSING_ERROR: &str = "ProcessingError";
pub const PROCESSING_ERROR_DESCRIPTION: &str = "Don't know what to do with this message";

const RESUBMIT_TTL: Duration = Duration::from_secs(2 * 60);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Demonstrates both ways into the dead-letter queue: exceeding the maximum
/// delivery count and explicit dead-lettering, followed by a repair loop that
/// resubmits fixed messages.
pub async fn run(config: SampleConfig, settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(BASIC_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;
    let producer = client.create_producer(&queue).await?;

    exceed_max_delivery(&mut client, &producer, &queue).await?;

    let messages = alternating_messages()?;
    for message in &messages {
        println!(
            "Message sending: Id = {}",
            message.message_id.as_deref().unwrap_or("-")
        );
    }
    producer.send_all(messages).await?;

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    let dead_letters = client
        .create_consumer(&queue.dead_letter(), ConsumerOptions::peek_lock())
        .await?;

    let pump = BackgroundPump::spawn(
        consumer.clone(),
        ScientistsOnly,
        PumpOptions::default(),
    );
    let fixer = BackgroundPump::spawn(
        dead_letters.clone(),
        DeadLetterFixer {
            producer: producer.clone(),
        },
        PumpOptions::default(),
    );

    wait_for_enter_or_timeout(settings.timing.wait(Duration::from_secs(10))).await;

    print_stats(&queue.display_name(), &pump.stop().await?);
    print_stats(&queue.dead_letter().display_name(), &fixer.stop().await?);

    consumer.dispose().await?;
    dead_letters.dispose().await?;
    producer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

/// The scientist batch with labels alternating Scientist/Physicist.
pub fn alternating_messages() -> SampleResult<Vec<OutgoingMessage>> {
    Ok(scientist_messages(RESUBMIT_TTL)?
        .into_iter()
        .enumerate()
        .map(|(i, message)| {
            let label = if i % 2 == 0 {
                SCIENTIST_LABEL
            } else {
                PHYSICIST_LABEL
            };
            message.with_subject(label)
        })
        .collect())
}

async fn exceed_max_delivery(
    client: &mut SampleClient,
    producer: &Producer,
    queue: &EntityPath,
) -> anyhow::Result<()> {
    let first = scientist_messages(RESUBMIT_TTL)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no sample message"))?;
    producer.send(first).await?;

    let receiver = client
        .create_consumer(queue, ConsumerOptions::peek_lock())
        .await?;
    while let Some(message) = receiver.receive_one(DRAIN_TIMEOUT).await? {
        let view = ReceivedMessageView::from(&message);
        println!(
            "Picked up message; DeliveryCount {}",
            view.delivery_count.unwrap_or_default()
        );
        receiver.abandon(&message).await?;
    }
    receiver.dispose().await?;

    let dead_letters = client
        .create_consumer(&queue.dead_letter(), ConsumerOptions::peek_lock())
        .await?;
    while let Some(message) = dead_letters.receive_one(DRAIN_TIMEOUT).await? {
        let view = ReceivedMessageView::from(&message);
        println!("\nDeadletter message:");
        if let Some(reason) = &view.dead_letter_reason {
            println!("\tDeadLetterReason={reason}");
        }
        if let Some(description) = &view.dead_letter_error_description {
            println!("\tDeadLetterErrorDescription={description}");
        }
        for (name, value) in &view.properties {
            println!("\t{name}={value}");
        }
        dead_letters.complete(&message).await?;
    }
    dead_letters.dispose().await?;
    Ok(())
}

/// Completes scientist messages, dead-letters everything else.
pub fn classify(message: &ReceivedMessageView) -> Disposition {
    if message.subject.as_deref() == Some(SCIENTIST_LABEL) && message.is_json() {
        Disposition::Complete
    } else {
        Disposition::dead_letter(PROCESSING_ERROR, PROCESSING_ERROR_DESCRIPTION)
    }
}

/// Repaired copy of a dead-lettered physicist, relabelled as scientist.
pub fn fix_up(message: &ReceivedMessageView) -> Option<OutgoingMessage> {
    if message.subject.as_deref() != Some(PHYSICIST_LABEL) {
        return None;
    }
    let mut fixed = OutgoingMessage::new(message.body.clone())
        .with_subject(SCIENTIST_LABEL)
        .with_time_to_live(RESUBMIT_TTL);
    fixed.message_id = message.message_id.clone();
    fixed.content_type = message.content_type.clone();
    Some(fixed)
}

struct ScientistsOnly;

#[async_trait]
impl MessageHandler for ScientistsOnly {
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
        let disposition = classify(message);
        if disposition == Disposition::Complete {
            println!("{}", describe_scientist(message));
        }
        Ok(disposition)
    }

    async fn on_error(&self, error: &SampleError) {
        println!("Receive error: {error}");
    }
}

struct DeadLetterFixer {
    producer: Producer,
}

#[async_trait]
impl MessageHandler for DeadLetterFixer {
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
        if let Some(fixed) = fix_up(message) {
            println!(
                "\n\t\tFixing: \n\t\t\tMessageId = {}, \n\t\t\tSequenceNumber = {}, \n\t\t\tLabel = {}",
                message.message_id_or_unknown(),
                message.sequence_number.unwrap_or_default(),
                message.subject.as_deref().unwrap_or_default()
            );
            self.producer.send(fixed).await?;
        }
        Ok(Disposition::Complete)
    }

    async fn on_error(&self, error: &SampleError) {
        println!("Fix-up error: {error}");
    }
}

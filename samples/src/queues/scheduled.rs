use azure_core::time::OffsetDateTime;
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::handler::PumpOptions;
use std::time::Duration;

use super::{BASIC_QUEUE, ScientistPrinter, scientist_messages};
use crate::cli::SampleConfig;
use crate::console::{BackgroundPump, print_stats, wait_for_enter_or_timeout};
use crate::settings::Settings;

const SCHEDULE_DELAY: Duration = Duration::from_secs(30);

/// Schedules the scientist batch 30 seconds ahead. The pump only sees the
/// messages once they become visible.
pub async fn run(config: SampleConfig, settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(BASIC_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    let pump = BackgroundPump::spawn(consumer.clone(), ScientistPrinter, PumpOptions::default());

    let producer = client.create_producer(&queue).await?;
    let enqueue_at = scheduled_enqueue_time(OffsetDateTime::now_utc());
    for message in scientist_messages(Duration::from_secs(2 * 60))? {
        let id = message.message_id.clone().unwrap_or_default();
        println!("Message sending: Id = {id}");
        let sequence_number = producer.schedule(message, enqueue_at).await?;
        println!("\tMessage acknowledged: Id = {id}, SequenceNumber = {sequence_number}");
    }
    println!("Messages scheduled for {enqueue_at}");

    wait_for_enter_or_timeout(settings.timing.wait(Duration::from_secs(60))).await;

    print_stats(&queue.display_name(), &pump.stop().await?);
    producer.dispose().await?;
    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

pub fn scheduled_enqueue_time(now: OffsetDateTime) -> OffsetDateTime {
    now + SCHEDULE_DELAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedules_thirty_seconds_ahead() {
        let now = OffsetDateTime::now_utc();
        let at = scheduled_enqueue_time(now);
        assert_eq!((at - now).whole_seconds(), 30);
    }
}

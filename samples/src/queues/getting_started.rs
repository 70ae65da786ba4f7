use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::handler::PumpOptions;
use std::time::Duration;

use super::{BASIC_QUEUE, ScientistPrinter, print_sent, scientist_messages};
use crate::cli::SampleConfig;
use crate::console::{BackgroundPump, print_stats, wait_for_enter_or_timeout};
use crate::settings::Settings;

/// Sends the scientists to `BasicQueue` while a pump prints and completes
/// them.
pub async fn run(config: SampleConfig, settings: Settings) -> anyhow::Result<()> {
    let queue = EntityPath::queue(BASIC_QUEUE);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let consumer = client
        .create_consumer(&queue, ConsumerOptions::peek_lock())
        .await?;
    let pump = BackgroundPump::spawn(consumer.clone(), ScientistPrinter, PumpOptions::default());

    let producer = client.create_producer(&queue).await?;
    let messages = scientist_messages(Duration::from_secs(2 * 60))?;
    let sent = messages.clone();
    producer.send_all(messages).await?;
    print_sent(&sent);

    wait_for_enter_or_timeout(settings.timing.wait(Duration::from_secs(10))).await;

    let stats = pump.stop().await?;
    print_stats(&queue.display_name(), &stats);

    producer.dispose().await?;
    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

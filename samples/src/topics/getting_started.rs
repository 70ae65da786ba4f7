use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::handler::PumpOptions;
use std::time::Duration;

use crate::cli::SampleConfig;
use crate::console::{BackgroundPump, print_stats, wait_for_enter_or_timeout};
use crate::queues::{ScientistPrinter, print_sent, scientist_messages};
use crate::settings::Settings;

pub const BASIC_TOPIC: &str = "BasicTopic";
pub const SUBSCRIPTIONS: [&str; 3] = ["Subscription1", "Subscription2", "Subscription3"];

/// Publishes the scientists once; every subscription gets its own copy.
pub async fn run(config: SampleConfig, settings: Settings) -> anyhow::Result<()> {
    let topic = EntityPath::topic(BASIC_TOPIC);
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let mut consumers = Vec::with_capacity(SUBSCRIPTIONS.len());
    let mut pumps = Vec::with_capacity(SUBSCRIPTIONS.len());
    for subscription in SUBSCRIPTIONS {
        let entity = EntityPath::subscription(BASIC_TOPIC, subscription);
        let consumer = client
            .create_consumer(&entity, ConsumerOptions::peek_lock())
            .await?;
        pumps.push((
            entity,
            BackgroundPump::spawn(consumer.clone(), ScientistPrinter, PumpOptions::default()),
        ));
        consumers.push(consumer);
    }

    let producer = client.create_producer(&topic).await?;
    let messages = scientist_messages(Duration::from_secs(2 * 60))?;
    let sent = messages.clone();
    producer.send_all(messages).await?;
    print_sent(&sent);

    wait_for_enter_or_timeout(settings.timing.wait(Duration::from_secs(10))).await;

    for (entity, pump) in pumps {
        print_stats(&entity.display_name(), &pump.stop().await?);
    }
    for consumer in consumers {
        consumer.dispose().await?;
    }
    producer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

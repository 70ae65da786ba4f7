use sbcore::client::SampleClient;
use sbcore::consumer::{Consumer, ConsumerOptions};
use sbcore::entity::EntityPath;
use sbcore::message::ReceivedMessageView;
use std::time::Duration;

use super::{BASIC_QUEUE, describe_scientist, print_sent, scientist_messages};
use crate::cli::SampleConfig;
use crate::settings::Settings;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pulls messages one at a time instead of using a pump.
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

    let received = tokio::select! {
        count = receive_until_idle(&consumer) => count?,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
            0
        }
    };
    println!("Received {received} messages from {}", queue.display_name());

    consumer.dispose().await?;
    client.dispose().await?;
    Ok(())
}

async fn receive_until_idle(consumer: &Consumer) -> anyhow::Result<usize> {
    let mut count = 0;
    while let Some(message) = consumer.receive_one(RECEIVE_TIMEOUT).await? {
        println!("{}", describe_scientist(&ReceivedMessageView::from(&message)));
        consumer.complete(&message).await?;
        count += 1;
    }
    Ok(count)
}

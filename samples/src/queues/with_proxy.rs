use sbcore::amqp::AmqpConnection;
use std::time::Duration;

use super::{BASIC_QUEUE, describe_scientist, scientist_messages};
use crate::cli::SampleConfig;
use crate::settings::Settings;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// The getting-started flow over an AMQP connection tunnelled through an
/// HTTP proxy.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let properties = config.connection_properties()?;
    let proxy = config.proxy()?;
    println!("Connecting through proxy {proxy}");

    let mut connection = AmqpConnection::connect_via_proxy(&properties, &proxy).await?;

    let mut sender = connection.sender(BASIC_QUEUE).await?;
    for message in scientist_messages(Duration::from_secs(2 * 60))? {
        println!(
            "\nMessage sending: Id = {}",
            message.message_id.as_deref().unwrap_or("-")
        );
        sender.send(&message).await?;
        println!(
            "\tMessage acknowledged: Id = {}",
            message.message_id.as_deref().unwrap_or("-")
        );
    }
    sender.close().await?;

    let mut receiver = connection.receiver(BASIC_QUEUE).await?;
    let mut received = 0;
    while let Some(view) = receiver.receive(RECEIVE_TIMEOUT).await? {
        println!("{}", describe_scientist(&view));
        received += 1;
    }
    println!("Received {received} messages through {proxy}");
    receiver.close().await?;

    connection.close().await?;
    Ok(())
}

use sbcore::amqp::AmqpConnection;
use sbcore::entity::EntityPath;

use super::{TOTAL_SEND, receive_expected, send_indexed};
use crate::cli::{SampleConfig, SampleOption};
use crate::settings::Settings;

/// Publishes to the topic and reads back through one subscription link.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let properties = config.connection_properties()?;
    let topic = config.require(SampleOption::Topic)?;
    let subscription = EntityPath::subscription(topic, config.require(SampleOption::Subscription)?);

    let mut connection = AmqpConnection::connect(&properties).await?;
    let mut sender = connection.sender(topic).await?;
    send_indexed(&mut sender, TOTAL_SEND).await?;
    sender.close().await?;

    let mut receiver = connection.receiver(&subscription.address()).await?;
    receive_expected(&mut receiver, TOTAL_SEND).await?;
    receiver.close().await?;

    connection.close().await?;
    Ok(())
}

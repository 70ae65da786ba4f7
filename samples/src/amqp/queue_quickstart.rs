use sbcore::amqp::AmqpConnection;

use super::{TOTAL_SEND, receive_expected, send_indexed};
use crate::cli::{SampleConfig, SampleOption};
use crate::settings::Settings;

pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let properties = config.connection_properties()?;
    let queue = config.require(SampleOption::Queue)?;

    let mut connection = AmqpConnection::connect(&properties).await?;
    let mut sender = connection.sender(queue).await?;
    send_indexed(&mut sender, TOTAL_SEND).await?;
    sender.close().await?;

    let mut receiver = connection.receiver(queue).await?;
    receive_expected(&mut receiver, TOTAL_SEND).await?;
    receiver.close().await?;

    connection.close().await?;
    Ok(())
}

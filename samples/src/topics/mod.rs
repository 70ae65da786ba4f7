//! Topic and subscription samples.

pub mod filters;
pub mod getting_started;
pub mod managing_rules;
pub mod tutorial_filters;

use async_trait::async_trait;
use sbcore::SampleResult;
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::handler::{Disposition, MessageHandler, PumpOptions, PumpStats, run_message_pump};
use sbcore::message::ReceivedMessageView;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const FILTER_SAMPLE_TOPIC: &str = "TopicFilterSampleTopic";

/// Prints each message with `render` and completes it.
pub struct PrintingHandler<F> {
    render: F,
}

impl<F> PrintingHandler<F>
where
    F: Fn(&ReceivedMessageView) -> String + Send + Sync,
{
    pub fn new(render: F) -> Self {
        Self { render }
    }
}

#[async_trait]
impl<F> MessageHandler for PrintingHandler<F>
where
    F: Fn(&ReceivedMessageView) -> String + Send + Sync,
{
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
        println!("{}", (self.render)(message));
        Ok(Disposition::Complete)
    }
}

/// Receives from one subscription until it stays empty for `idle`.
pub async fn drain_subscription<F>(
    client: &mut SampleClient,
    topic: &str,
    subscription: &str,
    options: ConsumerOptions,
    idle: Duration,
    render: F,
) -> anyhow::Result<PumpStats>
where
    F: Fn(&ReceivedMessageView) -> String + Send + Sync,
{
    let entity = EntityPath::subscription(topic, subscription);
    let consumer = client.create_consumer(&entity, options).await?;
    println!("\nReceiving messages from subscription {subscription}.");

    let stats = run_message_pump(
        &consumer,
        &PrintingHandler::new(render),
        PumpOptions::until_idle(idle),
        CancellationToken::new(),
    )
    .await;
    println!(
        "Received {} messages from subscription {subscription}.",
        stats.received
    );

    consumer.dispose().await?;
    Ok(stats)
}

/// `Name=value, ` pairs for every application property.
pub fn format_properties(message: &ReceivedMessageView) -> String {
    message
        .properties
        .iter()
        .map(|(name, value)| format!("{name}={value}, "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbcore::message::PropertyValue;

    #[test]
    fn properties_are_listed_in_name_order() {
        let view = ReceivedMessageView {
            properties: [
                ("Priority".to_string(), PropertyValue::from("low")),
                ("Color".to_string(), PropertyValue::from("red")),
            ]
            .into(),
            ..Default::default()
        };
        assert_eq!(format_properties(&view), "Color=red, Priority=low, ");
    }
}

use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::ReceivedMessageView;
use sbcore::model::{Order, sample_orders};
use std::time::Duration;

use super::{FILTER_SAMPLE_TOPIC, drain_subscription, format_properties};
use crate::cli::SampleConfig;
use crate::settings::Settings;

/// Subscriptions pre-created with their filters:
/// `AllOrders` (true), `ColorBlueSize10Orders` (`Color = 'blue' AND Quantity = 10`),
/// `ColorRed` (`Color = 'red'` with an action), `HighPriorityOrders`
/// (correlation id `high`).
pub const SUBSCRIPTIONS: [&str; 4] = [
    "AllOrders",
    "ColorBlueSize10Orders",
    "ColorRed",
    "HighPriorityOrders",
];

const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let producer = client
        .create_producer(&EntityPath::topic(FILTER_SAMPLE_TOPIC))
        .await?;
    println!("\nSending orders to topic.");
    let orders = sample_orders();
    let messages = orders
        .iter()
        .map(Order::to_message)
        .collect::<Result<Vec<_>, _>>()?;
    for order in &orders {
        println!("{}", describe_order(order));
    }
    producer.send_all(messages).await?;
    println!("All messages sent.");
    producer.dispose().await?;

    for subscription in SUBSCRIPTIONS {
        drain_subscription(
            &mut client,
            FILTER_SAMPLE_TOPIC,
            subscription,
            ConsumerOptions::receive_and_delete(),
            IDLE_TIMEOUT,
            render_order,
        )
        .await?;
    }

    client.dispose().await?;
    Ok(())
}

pub fn describe_order(order: &Order) -> String {
    format!(
        "Sent order with Color={}, Quantity={}, Priority={}",
        order.color, order.quantity, order.priority
    )
}

fn render_order(message: &ReceivedMessageView) -> String {
    format!(
        "{}CorrelationId={}",
        format_properties(message),
        message.correlation_id.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbcore::message::PropertyValue;

    #[test]
    fn received_order_line() {
        let view = ReceivedMessageView {
            correlation_id: Some("high".to_string()),
            properties: [("Color".to_string(), PropertyValue::from("red"))].into(),
            ..Default::default()
        };
        assert_eq!(render_order(&view), "Color=red, CorrelationId=high");
    }

    #[test]
    fn sent_order_line() {
        assert_eq!(
            describe_order(&Order::new("blue", 10, "low")),
            "Sent order with Color=blue, Quantity=10, Priority=low"
        );
    }
}

use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use sbcore::model::{Item, store_names};
use std::time::Duration;

use super::drain_subscription;
use crate::cli::{SampleConfig, SampleOption};
use crate::settings::Settings;

pub const SUBSCRIPTIONS: [&str; 3] = ["S1", "S2", "S3"];
pub const STORE_COUNT: usize = 10;

const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends one random item per store and shows which subscriptions the store
/// filters route them to.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let topic = config.require(SampleOption::Topic)?.to_string();
    let mut client = SampleClient::connect(config.connection_string()?).await?;

    let producer = client.create_producer(&EntityPath::topic(&topic)).await?;
    println!("\nSending orders to topic.");
    let messages = store_orders()?;
    producer.send_all(messages).await?;
    println!("\nAll messages sent.");
    producer.dispose().await?;

    println!("\nStart Receiving Messages.");
    let mut counts = Vec::with_capacity(SUBSCRIPTIONS.len());
    for subscription in SUBSCRIPTIONS {
        let stats = drain_subscription(
            &mut client,
            &topic,
            subscription,
            ConsumerOptions::peek_lock(),
            IDLE_TIMEOUT,
            render_item,
        )
        .await?;
        counts.push((subscription, stats.received));
    }
    for (subscription, received) in counts {
        println!("{subscription}: {received} messages");
    }

    client.dispose().await?;
    Ok(())
}

fn store_orders() -> anyhow::Result<Vec<OutgoingMessage>> {
    let mut rng = rand::thread_rng();
    store_names(STORE_COUNT)
        .iter()
        .map(|store| {
            let item = Item::random(&mut rng);
            println!(
                "Sent order to Store {store}. Price={:.6}, Color={}, Category={}",
                item.price, item.color, item.category
            );
            Ok(item.to_message(store)?)
        })
        .collect()
}

fn render_item(message: &ReceivedMessageView) -> String {
    let mut lines = Vec::new();
    if let Some(store) = message.property("StoreId") {
        lines.push(format!("StoreId={store}"));
    }
    if let Some(label) = &message.subject {
        lines.push(format!("Label={label}"));
    }
    match message.body_json::<Item>() {
        Ok(item) => lines.push(format!(
            "Item data. Price={:.6}, Color={}, Category={}",
            item.price, item.color, item.category
        )),
        Err(e) => lines.push(format!("Unreadable item: {e}")),
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok;

    #[test]
    fn one_order_per_store() {
        let messages = assert_ok!(store_orders());
        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0].to.as_deref(), Some("Store1"));
        assert_eq!(messages[9].to.as_deref(), Some("Store10"));
    }

    #[test]
    fn item_is_rendered_from_json_body() {
        let item = Item {
            color: "Blue".to_string(),
            price: 3.2,
            category: "Meat".to_string(),
        };
        let outgoing = assert_ok!(item.to_message("Store2"));
        let view = ReceivedMessageView {
            properties: outgoing.properties.clone(),
            body: outgoing.body.clone(),
            ..Default::default()
        };
        let text = render_item(&view);
        assert!(text.starts_with("StoreId=Store2"));
        assert!(text.contains("Price=3.200000, Color=Blue, Category=Meat"));
    }
}

//! Payload records carried as JSON message bodies.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::message::OutgoingMessage;
use crate::common::SampleResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scientist {
    pub name: String,
    pub first_name: String,
}

impl Scientist {
    pub fn new(first_name: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            first_name: first_name.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.name)
    }
}

/// The ten scientists every queue sample sends.
pub fn scientists() -> Vec<Scientist> {
    [
        ("Albert", "Einstein"),
        ("Werner", "Heisenberg"),
        ("Marie", "Curie"),
        ("Steven", "Hawking"),
        ("Isaac", "Newton"),
        ("Niels", "Bohr"),
        ("Michael", "Faraday"),
        ("Galileo", "Galilei"),
        ("Johannes", "Kepler"),
        ("Nikolaus", "Kopernikus"),
    ]
    .into_iter()
    .map(|(first, last)| Scientist::new(first, last))
    .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub color: String,
    pub quantity: i32,
    pub priority: String,
}

impl Order {
    pub fn new(color: &str, quantity: i32, priority: &str) -> Self {
        Self {
            color: color.to_string(),
            quantity,
            priority: priority.to_string(),
        }
    }

    /// JSON message with correlation id = priority, subject = color, and the
    /// three fields mirrored as string properties for SQL filters.
    pub fn to_message(&self) -> SampleResult<OutgoingMessage> {
        Ok(OutgoingMessage::json(self)?
            .with_correlation_id(self.priority.clone())
            .with_subject(self.color.clone())
            .with_property("Color", self.color.clone())
            .with_property("Quantity", self.quantity.to_string())
            .with_property("Priority", self.priority.clone()))
    }
}

/// Orders sent by the topic filter sample. The first is an empty order that
/// only the catch-all subscription receives.
pub fn sample_orders() -> Vec<Order> {
    vec![
        Order::default(),
        Order::new("blue", 5, "low"),
        Order::new("red", 10, "high"),
        Order::new("yellow", 5, "low"),
        Order::new("blue", 10, "low"),
        Order::new("blue", 5, "high"),
        Order::new("blue", 10, "low"),
        Order::new("red", 5, "low"),
        Order::new("red", 10, "low"),
        Order::new("red", 5, "low"),
        Order::new("yellow", 10, "high"),
        Order::new("yellow", 5, "low"),
        Order::new("yellow", 10, "low"),
    ]
}

pub const ITEM_COLORS: [&str; 5] = ["Red", "Green", "Blue", "Orange", "Yellow"];
pub const ITEM_PRICES: [f64; 5] = [1.4, 2.3, 3.2, 4.1, 5.1];
pub const ITEM_CATEGORIES: [&str; 5] = ["Vegetables", "Beverage", "Meat", "Bread", "Other"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub color: String,
    pub price: f64,
    pub category: String,
}

impl Item {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            color: ITEM_COLORS.choose(rng).copied().unwrap_or("Red").to_string(),
            price: ITEM_PRICES.choose(rng).copied().unwrap_or(1.4),
            category: ITEM_CATEGORIES
                .choose(rng)
                .copied()
                .unwrap_or("Other")
                .to_string(),
        }
    }

    /// JSON message addressed to a store, with the fields mirrored as string
    /// properties.
    pub fn to_message(&self, store: &str) -> SampleResult<OutgoingMessage> {
        Ok(OutgoingMessage::json(self)?
            .with_to(store)
            .with_property("StoreId", store)
            .with_property("Price", self.price.to_string())
            .with_property("Color", self.color.clone())
            .with_property("Category", self.category.clone()))
    }
}

pub fn store_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Store{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PropertyValue;
    use claims::assert_ok;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn scientist_json_uses_camel_case() {
        let json = serde_json::to_string(&Scientist::new("Marie", "Curie")).unwrap();
        assert_eq!(json, r#"{"name":"Curie","firstName":"Marie"}"#);
        assert_eq!(scientists().len(), 10);
        assert_eq!(scientists()[0].full_name(), "Albert Einstein");
    }

    #[test]
    fn first_order_is_default() {
        let orders = sample_orders();
        assert_eq!(orders.len(), 13);
        assert_eq!(orders[0], Order::default());
    }

    #[test]
    fn order_message_fields() {
        let msg = assert_ok!(Order::new("red", 10, "high").to_message());
        assert_eq!(msg.correlation_id.as_deref(), Some("high"));
        assert_eq!(msg.subject.as_deref(), Some("red"));
        assert_eq!(
            msg.properties.get("Quantity"),
            Some(&PropertyValue::String("10".to_string()))
        );
    }

    #[test]
    fn random_items_use_known_values() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let item = Item::random(&mut rng);
            assert!(ITEM_COLORS.contains(&item.color.as_str()));
            assert!(ITEM_PRICES.contains(&item.price));
            assert!(ITEM_CATEGORIES.contains(&item.category.as_str()));
        }
    }

    #[test]
    fn item_message_is_addressed_to_store() {
        let item = Item {
            color: "Blue".to_string(),
            price: 3.2,
            category: "Meat".to_string(),
        };
        let msg = assert_ok!(item.to_message("Store3"));
        assert_eq!(msg.to.as_deref(), Some("Store3"));
        assert_eq!(
            msg.properties.get("Price"),
            Some(&PropertyValue::String("3.2".to_string()))
        );
        assert_eq!(store_names(3), vec!["Store1", "Store2", "Store3"]);
    }
}

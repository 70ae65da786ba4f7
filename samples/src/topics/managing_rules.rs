use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::management::{
    CorrelationFilter, Filter, ManagementClient, RuleDescription, SubscriptionProperties,
};
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use std::time::Duration;

use super::drain_subscription;
use crate::cli::{SampleConfig, SampleOption};
use crate::management::management_client;
use crate::settings::Settings;

pub const ALL_MESSAGES: &str = "allMessages";
pub const SQL_FILTER_ONLY: &str = "sqlFilterOnly";
pub const SQL_FILTER_WITH_ACTION: &str = "sqlFilterWithAction";
pub const CORRELATION_FILTER: &str = "correlationFilter";

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscription name and the single rule it should end up with.
pub fn subscription_rules() -> Vec<(&'static str, RuleDescription)> {
    vec![
        (ALL_MESSAGES, RuleDescription::new("MatchAll", Filter::True)),
        (
            SQL_FILTER_ONLY,
            RuleDescription::new("RedSqlRule", Filter::Sql("Color = 'Red'".to_string())),
        ),
        (
            SQL_FILTER_WITH_ACTION,
            RuleDescription::new("BlueSqlRule", Filter::Sql("Color = 'Blue'".to_string()))
                .with_action("SET Color = 'BlueProcessed'"),
        ),
        (
            CORRELATION_FILTER,
            RuleDescription::new(
                "ImportantCorrelationRule",
                Filter::Correlation(CorrelationFilter {
                    correlation_id: Some("important".to_string()),
                    label: Some("Red".to_string()),
                    ..Default::default()
                }),
            ),
        ),
    ]
}

/// Red/Blue/Green, each without, with `important` and with `notimportant`
/// correlation id.
pub fn rule_test_messages() -> Vec<OutgoingMessage> {
    let mut messages = Vec::with_capacity(9);
    for correlation_id in [None, Some("important"), Some("notimportant")] {
        for color in ["Red", "Blue", "Green"] {
            let mut message = OutgoingMessage::default()
                .with_subject(color)
                .with_property("Color", color);
            if let Some(id) = correlation_id {
                message = message.with_correlation_id(id);
            }
            messages.push(message);
        }
    }
    messages
}

/// Creates four subscriptions with different rules, sends a small matrix of
/// messages and shows which subscription got which.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let topic = config.require(SampleOption::Topic)?.to_string();
    let management = management_client(&config)?;
    let rules = subscription_rules();

    for (subscription, rule) in &rules {
        configure_subscription(&management, &topic, subscription, rule).await?;
    }
    for rule in management.list_rules(&topic, CORRELATION_FILTER).await? {
        println!(
            "GetRules:: SubscriptionName: {CORRELATION_FILTER}, CorrelationFilter Name: {}, Rule: {}",
            rule.name, rule.filter
        );
    }

    let mut client = SampleClient::connect(config.connection_string()?).await?;
    let producer = client.create_producer(&EntityPath::topic(&topic)).await?;
    println!("Sending Messages to Topic");
    for message in rule_test_messages() {
        println!(
            "Sent Message:: Label: {}, CorrelationId: {}",
            message.subject.as_deref().unwrap_or_default(),
            message.correlation_id.as_deref().unwrap_or_default()
        );
        producer.send(message).await?;
    }
    producer.dispose().await?;

    for (subscription, _) in &rules {
        drain_subscription(
            &mut client,
            &topic,
            subscription,
            ConsumerOptions::receive_and_delete(),
            IDLE_TIMEOUT,
            render_color,
        )
        .await?;
    }
    client.dispose().await?;

    for (subscription, _) in &rules {
        management.delete_subscription(&topic, subscription).await?;
    }
    println!("Completed Receiving all messages...");
    Ok(())
}

async fn configure_subscription(
    management: &ManagementClient,
    topic: &str,
    subscription: &str,
    rule: &RuleDescription,
) -> anyhow::Result<()> {
    management
        .create_subscription(topic, subscription, &SubscriptionProperties::default())
        .await?;
    println!(
        "SubscriptionName: {subscription}, Removing Default Rule and Adding {}",
        rule.filter
    );
    for existing in management.list_rules(topic, subscription).await? {
        management
            .delete_rule(topic, subscription, &existing.name)
            .await?;
    }
    management.create_rule(topic, subscription, rule).await?;
    Ok(())
}

fn render_color(message: &ReceivedMessageView) -> String {
    format!(
        "Color Property = {}, CorrelationId = {}",
        message
            .property("Color")
            .map(ToString::to_string)
            .unwrap_or_default(),
        message.correlation_id.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_messages_cover_every_combination() {
        let messages = rule_test_messages();
        assert_eq!(messages.len(), 9);
        let red_important = messages
            .iter()
            .filter(|m| {
                m.subject.as_deref() == Some("Red")
                    && m.correlation_id.as_deref() == Some("important")
            })
            .count();
        assert_eq!(red_important, 1);
        assert_eq!(messages.iter().filter(|m| m.correlation_id.is_none()).count(), 3);
    }

    #[test]
    fn each_subscription_gets_its_rule() {
        let rules = subscription_rules();
        let names: Vec<_> = rules.iter().map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(
            names,
            ["MatchAll", "RedSqlRule", "BlueSqlRule", "ImportantCorrelationRule"]
        );
        assert_eq!(rules[2].1.action.as_deref(), Some("SET Color = 'BlueProcessed'"));
    }
}

use sbcore::auth::{ConnectionStringProperties, SasTokenGenerator};
use sbcore::client::SampleClient;
use sbcore::consumer::ConsumerOptions;
use sbcore::entity::EntityPath;
use sbcore::management::{AccessRight, ManagementClient, SubscriptionProperties, TopicProperties};
use sbcore::message::OutgoingMessage;
use std::time::Duration;
use uuid::Uuid;

use super::management_client;
use crate::cli::SampleConfig;
use crate::settings::Settings;

const SUBSCRIPTIONS: [&str; 2] = ["sub1", "sub2"];
const TOKEN_TTL: Duration = Duration::from_secs(600);
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shows what a Send-only rule and a Listen-scoped SAS token are allowed to
/// do on a freshly created topic.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let properties = config.connection_properties()?;
    let management = management_client(&config)?;
    let topic = random_topic_name();

    println!(
        "Creating a new Topic with name - {topic} with 2 subscriptions - {} and {}",
        SUBSCRIPTIONS[0], SUBSCRIPTIONS[1]
    );
    management
        .create_topic(&topic, &TopicProperties::default())
        .await?;
    let created = management.get_topic(&topic).await?;
    println!(
        "Topic {} created with {} subscription(s) so far",
        created.name.as_deref().unwrap_or(&topic),
        created.properties.subscription_count.unwrap_or(0)
    );
    for subscription in SUBSCRIPTIONS {
        management
            .create_subscription(&topic, subscription, &SubscriptionProperties::default())
            .await?;
    }

    let outcome = exercise_rules(&management, &properties, &topic).await;

    management.delete_topic(&topic).await?;
    outcome
}

async fn exercise_rules(
    management: &ManagementClient,
    properties: &ConnectionStringProperties,
    topic: &str,
) -> anyhow::Result<()> {
    println!("\nCreating a send-only rule for topic");
    let send_rule = rule_name(AccessRight::Send);
    management
        .create_topic_authorization_rule(topic, &send_rule, &[AccessRight::Send])
        .await?;
    let keys = management.list_topic_keys(topic, &send_rule).await?;
    let send_only = ConnectionStringProperties::parse(&keys.primary_connection_string)?
        .without_entity_path()
        .to_connection_string();

    println!("Trying to send and receive using the send-only rule");
    send_and_receive(&send_only, topic, SUBSCRIPTIONS[0]).await;

    println!("\nCreating a receive-only authentication token for {}", SUBSCRIPTIONS[0]);
    let listen_rule = rule_name(AccessRight::Listen);
    management
        .create_topic_authorization_rule(topic, &listen_rule, &[AccessRight::Listen])
        .await?;
    let keys = management.list_topic_keys(topic, &listen_rule).await?;
    let audience = token_audience(properties.endpoint(), topic, SUBSCRIPTIONS[0]);
    let token = SasTokenGenerator::generate(&audience, &keys.key_name, &keys.primary_key, TOKEN_TTL)?;
    let listen_only = ConnectionStringProperties::with_shared_access_signature(
        properties.endpoint(),
        None,
        token,
    )
    .to_connection_string();

    for subscription in SUBSCRIPTIONS {
        println!("\nTrying to send and receive using the receive-only token for {subscription}");
        send_and_receive(&listen_only, topic, subscription).await;
    }
    Ok(())
}

/// Attempts one send to the topic and one receive from the subscription,
/// reporting each outcome. Authorization failures are expected here.
async fn send_and_receive(connection_string: &str, topic: &str, subscription: &str) {
    let mut client = match SampleClient::connect(connection_string).await {
        Ok(client) => client,
        Err(e) => {
            println!("Could not connect: {e}");
            return;
        }
    };

    let sent = async {
        let producer = client.create_producer(&EntityPath::topic(topic)).await?;
        let result = producer.send(OutgoingMessage::text("msg")).await;
        producer.dispose().await?;
        result
    }
    .await;
    match sent {
        Ok(()) => println!("Sent message successfully"),
        Err(e) => {
            log::debug!("send failed: {e}");
            println!("Could not send message due to authorization failure");
        }
    }

    let received = async {
        let consumer = client
            .create_consumer(
                &EntityPath::subscription(topic, subscription),
                ConsumerOptions::peek_lock(),
            )
            .await?;
        let result = consumer.receive_one(RECEIVE_TIMEOUT).await;
        consumer.dispose().await?;
        result
    }
    .await;
    match received {
        Ok(Some(_)) => println!("Received message successfully"),
        Ok(None) => println!("Receive succeeded, no message was waiting"),
        Err(e) => {
            log::debug!("receive failed: {e}");
            println!("Could not receive message due to authorization failure");
        }
    }

    if let Err(e) = client.dispose().await {
        log::warn!("dispose failed: {e}");
    }
}

pub fn random_topic_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("topic-{}", &id[..8])
}

pub fn rule_name(right: AccessRight) -> String {
    format!("ruleWith{right:?}")
}

/// `<endpoint>/<topic>/subscriptions/<subscription>`, the resource a
/// subscription-scoped token is signed for.
pub fn token_audience(endpoint: &str, topic: &str, subscription: &str) -> String {
    format!(
        "{}/{topic}/subscriptions/{subscription}",
        endpoint.trim_end_matches('/')
    )
}

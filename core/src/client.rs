use azservicebus::core::BasicRetryPolicy;
use azservicebus::{
    ServiceBusClient, ServiceBusClientOptions, ServiceBusReceiveMode, ServiceBusReceiverOptions,
    ServiceBusSenderOptions,
};

use crate::auth::ConnectionStringProperties;
use crate::common::{SampleError, SampleResult};
use crate::consumer::{Consumer, ConsumerOptions, ReceiveMode};
use crate::entity::EntityPath;
use crate::producer::{Producer, SEND_LINKS};

/// A connected Service Bus client that hands out producers and consumers.
pub struct SampleClient {
    client: ServiceBusClient<BasicRetryPolicy>,
    properties: ConnectionStringProperties,
}

impl SampleClient {
    /// Opens the AMQP connection described by `connection_string`.
    pub async fn connect(connection_string: &str) -> SampleResult<Self> {
        let properties = ConnectionStringProperties::parse(connection_string)?;
        log::info!(
            "Connecting to {}",
            properties.fully_qualified_namespace()
        );

        let client = ServiceBusClient::new_from_connection_string(
            connection_string,
            ServiceBusClientOptions::default(),
        )
        .await
        .map_err(|e| {
            SampleError::ConnectionFailed(format!("Failed to create ServiceBus client: {e}"))
        })?;

        Ok(Self { client, properties })
    }

    pub fn properties(&self) -> &ConnectionStringProperties {
        &self.properties
    }

    /// Sender for a queue or topic, backed by [`SEND_LINKS`] links.
    pub async fn create_producer(&mut self, entity: &EntityPath) -> SampleResult<Producer> {
        let name = match entity {
            EntityPath::Queue(name) | EntityPath::Topic(name) => name.clone(),
            other => {
                return Err(SampleError::Configuration(format!(
                    "Cannot send to {}",
                    other.display_name()
                )));
            }
        };

        let mut senders = Vec::with_capacity(SEND_LINKS);
        for _ in 0..SEND_LINKS {
            match self
                .client
                .create_sender(name.clone(), ServiceBusSenderOptions::default())
                .await
            {
                Ok(sender) => senders.push(sender),
                Err(e) => {
                    for sender in senders {
                        if let Err(close_err) = sender.dispose().await {
                            log::warn!("Failed to close sender for {name}: {close_err}");
                        }
                    }
                    return Err(SampleError::ConnectionFailed(format!("Sender error: {e}")));
                }
            }
        }
        log::debug!("Created {SEND_LINKS} sender links for {name}");
        Ok(Producer::with_links(senders, name))
    }

    /// Receiver for a queue, a subscription or a dead-letter sub-queue.
    pub async fn create_consumer(
        &mut self,
        entity: &EntityPath,
        options: ConsumerOptions,
    ) -> SampleResult<Consumer> {
        let receiver_options = ServiceBusReceiverOptions {
            receive_mode: match options.receive_mode {
                ReceiveMode::PeekLock => ServiceBusReceiveMode::PeekLock,
                ReceiveMode::ReceiveAndDelete => ServiceBusReceiveMode::ReceiveAndDelete,
            },
            prefetch_count: options.prefetch_count,
            ..Default::default()
        };

        let receiver = match entity {
            EntityPath::Queue(name) => {
                self.client
                    .create_receiver_for_queue(name.clone(), receiver_options)
                    .await
            }
            EntityPath::Subscription {
                topic,
                subscription,
            } => {
                self.client
                    .create_receiver_for_subscription(
                        topic.clone(),
                        subscription.clone(),
                        receiver_options,
                    )
                    .await
            }
            EntityPath::DeadLetter(_) => {
                self.client
                    .create_receiver_for_queue(entity.address(), receiver_options)
                    .await
            }
            EntityPath::Topic(name) => {
                return Err(SampleError::Configuration(format!(
                    "Cannot receive from topic {name} directly, use a subscription"
                )));
            }
        }
        .map_err(|e| SampleError::ConnectionFailed(format!("Receiver error: {e}")))?;

        log::debug!(
            "Created {:?} receiver for {} (prefetch {})",
            options.receive_mode,
            entity.display_name(),
            options.prefetch_count
        );
        Ok(Consumer::new(receiver, entity.clone(), options.receive_mode))
    }

    /// Closes the connection. Producers and consumers should be disposed first.
    pub async fn dispose(self) -> SampleResult<()> {
        self.client
            .dispose()
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("dispose client: {e}")))
    }
}

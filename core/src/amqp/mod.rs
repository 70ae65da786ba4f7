//! Plain AMQP 1.0 links to Service Bus, without the SDK.
//!
//! Service Bus accepts SASL PLAIN with the shared access key name and key as
//! username and password, over TLS on port 5671 ("alternative" TLS
//! establishment: TLS first, no AMQP TLS upgrade header).

pub mod proxy;

use fe2o3_amqp::connection::ConnectionHandle;
use fe2o3_amqp::sasl_profile::SaslProfile;
use fe2o3_amqp::session::SessionHandle;
use fe2o3_amqp::types::messaging::{Body, Message};
use fe2o3_amqp::types::primitives::Value;
use fe2o3_amqp::{Connection, Receiver, Sender, Session};
use std::time::Duration;

use crate::auth::ConnectionStringProperties;
use crate::common::{SampleError, SampleResult};
use crate::message::{OutgoingMessage, ReceivedMessageView};

pub use proxy::ProxyEndpoint;

pub const AMQPS_PORT: u16 = 5671;

/// One connection with one session, enough for the quickstarts.
pub struct AmqpConnection {
    connection: ConnectionHandle<()>,
    session: SessionHandle<()>,
    container_id: String,
}

impl AmqpConnection {
    /// Connects straight to `amqps://<namespace>:5671`.
    pub async fn connect(properties: &ConnectionStringProperties) -> SampleResult<Self> {
        let (key_name, key) = properties.key_credentials()?;
        let hostname = properties.fully_qualified_namespace();
        let container_id = format!("sbsamples-{}", uuid::Uuid::new_v4());
        let url = format!("amqps://{hostname}:{AMQPS_PORT}");

        log::info!("Opening AMQP connection to {url}");
        let connection = Connection::builder()
            .container_id(container_id.clone())
            .alt_tls_establishment(true)
            .hostname(hostname)
            .sasl_profile(SaslProfile::Plain {
                username: key_name.to_string(),
                password: key.to_string(),
            })
            .open(url.as_str())
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("AMQP open failed: {e}")))?;

        Self::begin(connection, container_id).await
    }

    /// Connects through an HTTP proxy using a CONNECT tunnel.
    pub async fn connect_via_proxy(
        properties: &ConnectionStringProperties,
        proxy: &ProxyEndpoint,
    ) -> SampleResult<Self> {
        let (key_name, key) = properties.key_credentials()?;
        let hostname = properties.fully_qualified_namespace();
        let container_id = format!("sbsamples-{}", uuid::Uuid::new_v4());

        let tls_stream = proxy::open_tls_tunnel(proxy, hostname, AMQPS_PORT).await?;

        log::info!("Opening AMQP connection to {hostname} through {proxy}");
        let connection = Connection::builder()
            .container_id(container_id.clone())
            .hostname(hostname)
            .sasl_profile(SaslProfile::Plain {
                username: key_name.to_string(),
                password: key.to_string(),
            })
            .open_with_stream(tls_stream)
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("AMQP open failed: {e}")))?;

        Self::begin(connection, container_id).await
    }

    async fn begin(mut connection: ConnectionHandle<()>, container_id: String) -> SampleResult<Self> {
        let session = Session::begin(&mut connection)
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("AMQP session failed: {e}")))?;
        Ok(Self {
            connection,
            session,
            container_id,
        })
    }

    /// Attaches a sender link to `address` (queue or topic name).
    pub async fn sender(&mut self, address: &str) -> SampleResult<AmqpSender> {
        let name = format!("{}-sender-{address}", self.container_id);
        let sender = Sender::attach(&mut self.session, name, address.to_string())
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("Sender attach failed: {e}")))?;
        log::debug!("Attached sender to {address}");
        Ok(AmqpSender {
            sender,
            address: address.to_string(),
        })
    }

    /// Attaches a receiver link to `address`. Subscriptions use
    /// `<topic>/Subscriptions/<subscription>`.
    pub async fn receiver(&mut self, address: &str) -> SampleResult<AmqpReceiver> {
        let name = format!("{}-receiver-{address}", self.container_id);
        let receiver = Receiver::attach(&mut self.session, name, address.to_string())
            .await
            .map_err(|e| SampleError::ConnectionFailed(format!("Receiver attach failed: {e}")))?;
        log::debug!("Attached receiver to {address}");
        Ok(AmqpReceiver {
            receiver,
            address: address.to_string(),
        })
    }

    pub async fn close(mut self) -> SampleResult<()> {
        self.session
            .end()
            .await
            .map_err(|e| SampleError::Amqp(format!("Session end failed: {e}")))?;
        self.connection
            .close()
            .await
            .map_err(|e| SampleError::Amqp(format!("Connection close failed: {e}")))?;
        log::debug!("AMQP connection {} closed", self.container_id);
        Ok(())
    }
}

pub struct AmqpSender {
    sender: Sender,
    address: String,
}

impl AmqpSender {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sends one message and waits for the broker to accept it.
    pub async fn send(&mut self, message: &OutgoingMessage) -> SampleResult<()> {
        let outcome = self
            .sender
            .send(message.to_amqp_message())
            .await
            .map_err(|e| SampleError::SendFailed(format!("AMQP send failed: {e}")))?;
        outcome
            .accepted_or_else(|outcome| outcome)
            .map_err(|outcome| SampleError::SendFailed(format!("Message not accepted: {outcome:?}")))?;
        log::debug!(
            "Sent message {} to {}",
            message.message_id.as_deref().unwrap_or("-"),
            self.address
        );
        Ok(())
    }

    pub async fn close(self) -> SampleResult<()> {
        self.sender
            .close()
            .await
            .map_err(|e| SampleError::Amqp(format!("Sender close failed: {e}")))
    }
}

pub struct AmqpReceiver {
    receiver: Receiver,
    address: String,
}

impl AmqpReceiver {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Waits up to `max_wait` for one message and accepts it. `None` on
    /// timeout.
    pub async fn receive(&mut self, max_wait: Duration) -> SampleResult<Option<ReceivedMessageView>> {
        let delivery = match tokio::time::timeout(max_wait, self.receiver.recv::<Body<Value>>()).await {
            Ok(delivery) => delivery
                .map_err(|e| SampleError::ReceiveFailed(format!("AMQP receive failed: {e}")))?,
            Err(_) => {
                log::debug!("No message from {} within {max_wait:?}", self.address);
                return Ok(None);
            }
        };

        let message: &Message<Body<Value>> = delivery.message();
        let view = ReceivedMessageView::from(message);
        self.receiver.accept(&delivery).await.map_err(|e| {
            SampleError::settle(view.message_id_or_unknown(), format!("accept failed: {e}"))
        })?;
        Ok(Some(view))
    }

    pub async fn close(self) -> SampleResult<()> {
        self.receiver
            .close()
            .await
            .map_err(|e| SampleError::Amqp(format!("Receiver close failed: {e}")))
    }
}

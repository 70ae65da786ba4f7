use azservicebus::prelude::ServiceBusPeekedMessage;
use azservicebus::{ServiceBusMessage, ServiceBusReceivedMessage};
use azure_core::time::OffsetDateTime;
use fe2o3_amqp::types::messaging::{
    ApplicationProperties, Body, Data, Header, Message, MessageId, Properties,
};
use fe2o3_amqp::types::primitives::{Binary, SimpleValue, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::common::{SampleError, SampleResult};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Application property value, sent with its AMQP type. The filter samples
/// send every property as a string, `Quantity` and `Price` included, and the
/// broker evaluates rules such as `Quantity = 10` against those strings.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Double(f64),
    Bool(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Long(i64::from(v))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<PropertyValue> for SimpleValue {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::String(v) => SimpleValue::String(v),
            PropertyValue::Long(v) => SimpleValue::Long(v),
            PropertyValue::Double(v) => SimpleValue::from(v),
            PropertyValue::Bool(v) => SimpleValue::Bool(v),
        }
    }
}

impl PropertyValue {
    fn from_simple(value: &SimpleValue) -> Self {
        match value {
            SimpleValue::String(v) => Self::String(v.clone()),
            SimpleValue::Bool(v) => Self::Bool(*v),
            SimpleValue::Byte(v) => Self::Long(i64::from(*v)),
            SimpleValue::Short(v) => Self::Long(i64::from(*v)),
            SimpleValue::Int(v) => Self::Long(i64::from(*v)),
            SimpleValue::Long(v) => Self::Long(*v),
            SimpleValue::Ubyte(v) => Self::Long(i64::from(*v)),
            SimpleValue::Ushort(v) => Self::Long(i64::from(*v)),
            SimpleValue::Uint(v) => Self::Long(i64::from(*v)),
            SimpleValue::Double(v) => Self::Double(v.into_inner()),
            SimpleValue::Float(v) => Self::Double(f64::from(v.into_inner())),
            other => Self::String(format!("{other:?}")),
        }
    }
}

/// Plain-data description of a message to send.
///
/// Built up with the `with_*` methods and converted into an SDK message (or a
/// raw AMQP message) right before sending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub body: Vec<u8>,
    pub message_id: Option<String>,
    pub content_type: Option<String>,
    pub subject: Option<String>,
    pub correlation_id: Option<String>,
    pub to: Option<String>,
    pub partition_key: Option<String>,
    pub time_to_live: Option<Duration>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl OutgoingMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn text(text: impl AsRef<str>) -> Self {
        Self::new(text.as_ref().as_bytes().to_vec())
    }

    /// JSON body with the `application/json` content type.
    pub fn json<T: Serialize>(value: &T) -> SampleResult<Self> {
        Ok(Self::new(serde_json::to_vec(value)?).with_content_type(JSON_CONTENT_TYPE))
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the subject, which Service Bus also exposes as the label.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn application_properties(&self) -> Option<ApplicationProperties> {
        if self.properties.is_empty() {
            return None;
        }
        let mut builder = ApplicationProperties::builder();
        for (name, value) in &self.properties {
            builder = builder.insert(name.clone(), SimpleValue::from(value.clone()));
        }
        Some(builder.build())
    }

    /// Converts into a raw AMQP message with a single data section.
    pub fn to_amqp_message(&self) -> Message<Data> {
        let mut properties = Properties::builder();
        if let Some(id) = &self.message_id {
            properties = properties.message_id(id.clone());
        }
        if let Some(content_type) = &self.content_type {
            properties = properties.content_type(content_type.as_str());
        }
        if let Some(subject) = &self.subject {
            properties = properties.subject(subject.clone());
        }
        if let Some(correlation_id) = &self.correlation_id {
            properties = properties.correlation_id(correlation_id.clone());
        }
        if let Some(to) = &self.to {
            properties = properties.to(to.clone());
        }

        let ttl_millis = self
            .time_to_live
            .map(|ttl| u32::try_from(ttl.as_millis()).unwrap_or(u32::MAX));

        let builder = Message::builder()
            .header(Header::builder().durable(true).ttl(ttl_millis).build())
            .properties(properties.build());
        let builder = match self.application_properties() {
            Some(props) => builder.application_properties(props),
            None => builder,
        };
        builder.data(Binary::from(self.body.clone())).build()
    }
}

impl TryFrom<OutgoingMessage> for ServiceBusMessage {
    type Error = SampleError;

    fn try_from(outgoing: OutgoingMessage) -> Result<Self, Self::Error> {
        let application_properties = outgoing.application_properties();
        let mut message = ServiceBusMessage::new(outgoing.body);

        if let Some(id) = outgoing.message_id {
            message
                .set_message_id(id)
                .map_err(|e| SampleError::InvalidMessage(format!("message id: {e}")))?;
        }
        if let Some(key) = outgoing.partition_key {
            message
                .set_partition_key(key)
                .map_err(|e| SampleError::InvalidMessage(format!("partition key: {e}")))?;
        }
        if let Some(content_type) = outgoing.content_type {
            message.set_content_type(content_type);
        }
        if let Some(subject) = outgoing.subject {
            message.set_subject(subject);
        }
        if let Some(correlation_id) = outgoing.correlation_id {
            message.set_correlation_id(correlation_id);
        }
        if let Some(to) = outgoing.to {
            message.set_to(to);
        }
        if let Some(ttl) = outgoing.time_to_live {
            message.set_time_to_live(ttl);
        }
        if let Some(props) = application_properties {
            *message.application_properties_mut() = Some(props);
        }

        Ok(message)
    }
}

/// Snapshot of a received or peeked message, detached from the SDK type so it
/// can be printed, inspected and resubmitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivedMessageView {
    pub sequence_number: Option<i64>,
    pub message_id: Option<String>,
    pub delivery_count: Option<u32>,
    pub enqueued_time: Option<OffsetDateTime>,
    pub content_type: Option<String>,
    pub subject: Option<String>,
    pub correlation_id: Option<String>,
    pub to: Option<String>,
    pub dead_letter_reason: Option<String>,
    pub dead_letter_error_description: Option<String>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub body: Vec<u8>,
}

fn collect_properties(props: Option<&ApplicationProperties>) -> BTreeMap<String, PropertyValue> {
    props
        .map(|props| {
            props
                .0
                .iter()
                .map(|(k, v)| (k.clone(), PropertyValue::from_simple(v)))
                .collect()
        })
        .unwrap_or_default()
}

fn message_id_text(id: &MessageId) -> String {
    match id {
        MessageId::String(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

macro_rules! impl_view_from_sdk_message {
    ($ty:ty) => {
        impl From<&$ty> for ReceivedMessageView {
            fn from(msg: &$ty) -> Self {
                Self {
                    sequence_number: Some(msg.sequence_number()),
                    message_id: msg.message_id().map(|s| s.to_string()),
                    delivery_count: msg.delivery_count().map(|c| c as u32),
                    enqueued_time: Some(msg.enqueued_time()),
                    content_type: msg.content_type().map(|s| s.to_string()),
                    subject: msg.subject().map(|s| s.to_string()),
                    correlation_id: msg.correlation_id().map(|s| s.to_string()),
                    to: msg.to().map(|s| s.to_string()),
                    dead_letter_reason: msg.dead_letter_reason().map(|s| s.to_string()),
                    dead_letter_error_description: msg
                        .dead_letter_error_description()
                        .map(|s| s.to_string()),
                    properties: collect_properties(msg.application_properties()),
                    body: msg.body().map(|b| b.to_vec()).unwrap_or_default(),
                }
            }
        }
    };
}

impl_view_from_sdk_message!(ServiceBusReceivedMessage);
impl_view_from_sdk_message!(ServiceBusPeekedMessage);

fn amqp_body_bytes(body: &Body<Value>) -> Vec<u8> {
    match body {
        Body::Data(sections) => sections.iter().flat_map(|d| d.0.iter().copied()).collect(),
        Body::Value(value) => match &value.0 {
            Value::Binary(bytes) => bytes.to_vec(),
            Value::String(text) => text.clone().into_bytes(),
            other => format!("{other:?}").into_bytes(),
        },
        Body::Sequence(sequence) => format!("{sequence:?}").into_bytes(),
        Body::Empty => Vec::new(),
    }
}

impl From<&Message<Body<Value>>> for ReceivedMessageView {
    fn from(msg: &Message<Body<Value>>) -> Self {
        let properties = msg.properties.as_ref();
        Self {
            message_id: properties
                .and_then(|p| p.message_id.as_ref())
                .map(message_id_text),
            delivery_count: msg.header.as_ref().map(|h| h.delivery_count + 1),
            content_type: properties
                .and_then(|p| p.content_type.as_ref())
                .map(|s| s.0.clone()),
            subject: properties.and_then(|p| p.subject.clone()),
            correlation_id: properties
                .and_then(|p| p.correlation_id.as_ref())
                .map(message_id_text),
            to: properties.and_then(|p| p.to.clone()),
            properties: collect_properties(msg.application_properties.as_ref()),
            body: amqp_body_bytes(&msg.body),
            ..Default::default()
        }
    }
}

impl ReceivedMessageView {
    pub fn message_id_or_unknown(&self) -> &str {
        self.message_id.as_deref().unwrap_or("unknown")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> SampleResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.eq_ignore_ascii_case(JSON_CONTENT_TYPE))
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Builds a fresh message carrying the same body, content type,
    /// correlation id and properties. Broker-assigned state is not copied.
    pub fn to_outgoing(&self) -> OutgoingMessage {
        OutgoingMessage {
            body: self.body.clone(),
            message_id: self.message_id.clone(),
            content_type: self.content_type.clone(),
            subject: self.subject.clone(),
            correlation_id: self.correlation_id.clone(),
            to: self.to.clone(),
            partition_key: None,
            time_to_live: None,
            properties: self.properties.clone(),
        }
    }

    /// Multi-line console description, indented by `indent` tabs.
    pub fn describe(&self, indent: usize) -> String {
        let pad = "\t".repeat(indent);
        let mut lines = vec![format!("{pad}MessageId = {}", self.message_id_or_unknown())];

        if let Some(seq) = self.sequence_number {
            lines.push(format!("{pad}SequenceNumber = {seq}"));
        }
        if let Some(count) = self.delivery_count {
            lines.push(format!("{pad}DeliveryCount = {count}"));
        }
        if let Some(enqueued) = self.enqueued_time {
            lines.push(format!("{pad}EnqueuedTimeUtc = {enqueued}"));
        }
        if let Some(subject) = &self.subject {
            lines.push(format!("{pad}Label = {subject}"));
        }
        if let Some(correlation_id) = &self.correlation_id {
            lines.push(format!("{pad}CorrelationId = {correlation_id}"));
        }
        if let Some(content_type) = &self.content_type {
            lines.push(format!("{pad}ContentType = \"{content_type}\""));
        }
        if let Some(reason) = &self.dead_letter_reason {
            lines.push(format!("{pad}DeadLetterReason = {reason}"));
        }
        if let Some(description) = &self.dead_letter_error_description {
            lines.push(format!("{pad}DeadLetterErrorDescription = {description}"));
        }
        for (name, value) in &self.properties {
            lines.push(format!("{pad}{name} = {value}"));
        }
        lines.push(format!("{pad}Content: {}", self.body_text()));
        lines.join("\n")
    }
}

use std::fmt;

const DEAD_LETTER_SUFFIX: &str = "/$deadletterqueue";

/// A receivable or sendable Service Bus entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityPath {
    Queue(String),
    Topic(String),
    Subscription { topic: String, subscription: String },
    /// Dead-letter sub-queue of a queue or subscription.
    DeadLetter(Box<EntityPath>),
}

impl EntityPath {
    pub fn queue(name: impl Into<String>) -> Self {
        Self::Queue(name.into())
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self::Topic(name.into())
    }

    pub fn subscription(topic: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self::Subscription {
            topic: topic.into(),
            subscription: subscription.into(),
        }
    }

    /// Dead-letter sub-queue of this entity. Already dead-letter paths and
    /// topics (which have no sub-queue) are returned unchanged.
    pub fn dead_letter(&self) -> Self {
        match self {
            Self::Queue(_) | Self::Subscription { .. } => Self::DeadLetter(Box::new(self.clone())),
            Self::Topic(_) | Self::DeadLetter(_) => self.clone(),
        }
    }

    pub fn is_dead_letter(&self) -> bool {
        matches!(self, Self::DeadLetter(_))
    }

    /// Address used when attaching a link, e.g. `orders/Subscriptions/red`.
    pub fn address(&self) -> String {
        match self {
            Self::Queue(name) | Self::Topic(name) => name.clone(),
            Self::Subscription {
                topic,
                subscription,
            } => format!("{topic}/Subscriptions/{subscription}"),
            Self::DeadLetter(parent) => format!("{}{DEAD_LETTER_SUFFIX}", parent.address()),
        }
    }

    /// Short human-readable name for console output.
    pub fn display_name(&self) -> String {
        match self {
            Self::Queue(name) | Self::Topic(name) => name.clone(),
            Self::Subscription {
                topic,
                subscription,
            } => format!("{topic}/{subscription}"),
            Self::DeadLetter(parent) => format!("{} (DLQ)", parent.display_name()),
        }
    }

    /// Parses an address back into a path. Subscription segments are matched
    /// case-insensitively.
    pub fn from_address(address: &str) -> Option<Self> {
        let address = address.trim_matches('/');
        if address.is_empty() {
            return None;
        }

        if let Some(parent) = address.strip_suffix(DEAD_LETTER_SUFFIX) {
            let parent = Self::from_address(parent)?;
            return match parent {
                Self::Queue(_) | Self::Subscription { .. } => Some(parent.dead_letter()),
                _ => None,
            };
        }

        let parts: Vec<&str> = address.split('/').collect();
        match parts.as_slice() {
            [name] => Some(Self::Queue((*name).to_string())),
            [topic, marker, sub] if marker.eq_ignore_ascii_case("subscriptions") => {
                Some(Self::subscription(*topic, *sub))
            }
            _ => None,
        }
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

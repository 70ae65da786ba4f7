//! Entity administration through Azure Resource Manager.

pub mod client;
pub mod duration;
pub mod errors;
pub mod types;

pub use client::{ManagementClient, ManagementConfig};
pub use errors::ManagementApiError;
pub use types::{
    AccessKeys, AccessRight, AuthorizationRuleProperties, CorrelationFilter, CountDetails,
    FALSE_FILTER_EXPRESSION, Filter, QueueProperties, Resource, RuleDescription,
    SubscriptionProperties, TRUE_FILTER_EXPRESSION, TopicProperties,
};

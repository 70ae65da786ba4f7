use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use super::duration;

/// Envelope of every ARM resource: `{ "id", "name", "properties": {..} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource<P> {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub properties: P,
}

impl<P> Resource<P> {
    pub fn new(properties: P) -> Self {
        Self {
            id: None,
            name: None,
            properties,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountDetails {
    #[serde(default)]
    pub active_message_count: i64,
    #[serde(default)]
    pub dead_letter_message_count: i64,
    #[serde(default)]
    pub scheduled_message_count: i64,
    #[serde(default)]
    pub transfer_message_count: i64,
    #[serde(default)]
    pub transfer_dead_letter_message_count: i64,
}

/// Queue settings plus the read-only runtime fields ARM returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueProperties {
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub lock_duration: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_in_megabytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_duplicate_detection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_session: Option<bool>,
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub default_message_time_to_live: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_lettering_on_message_expiration: Option<bool>,
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub duplicate_detection_history_time_window: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delivery_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_partitioning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_batched_operations: Option<bool>,
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub auto_delete_on_idle: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_dead_lettered_messages_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing)]
    pub message_count: Option<i64>,
    #[serde(default, skip_serializing)]
    pub size_in_bytes: Option<i64>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub accessed_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub count_details: Option<CountDetails>,
}

fn show<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn show_duration(value: &Option<Duration>) -> String {
    value
        .map(duration::format)
        .unwrap_or_else(|| "-".to_string())
}

impl QueueProperties {
    /// Settings section as printed by the entity management sample.
    pub fn describe_settings(&self) -> Vec<String> {
        vec![
            format!("LockDuration: {}", show_duration(&self.lock_duration)),
            format!("MaxSizeInMegabytes: {}", show(&self.max_size_in_megabytes)),
            format!(
                "RequiresDuplicateDetection: {}",
                show(&self.requires_duplicate_detection)
            ),
            format!("RequiresSession: {}", show(&self.requires_session)),
            format!(
                "DefaultMessageTimeToLive: {}",
                show_duration(&self.default_message_time_to_live)
            ),
            format!(
                "DeadLetteringOnMessageExpiration: {}",
                show(&self.dead_lettering_on_message_expiration)
            ),
            format!("MaxDeliveryCount: {}", show(&self.max_delivery_count)),
            format!("EnablePartitioning: {}", show(&self.enable_partitioning)),
        ]
    }

    /// Runtime section: counts, size and timestamps.
    pub fn describe_runtime(&self) -> Vec<String> {
        let counts = self.count_details.unwrap_or_default();
        vec![
            format!("MessageCount: {}", show(&self.message_count)),
            format!("ActiveMessageCount: {}", counts.active_message_count),
            format!("DeadLetterMessageCount: {}", counts.dead_letter_message_count),
            format!("ScheduledMessageCount: {}", counts.scheduled_message_count),
            format!("SizeInBytes: {}", show(&self.size_in_bytes)),
            format!("CreatedAt: {}", show(&self.created_at)),
            format!("UpdatedAt: {}", show(&self.updated_at)),
            format!("AccessedAt: {}", show(&self.accessed_at)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProperties {
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub default_message_time_to_live: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_in_megabytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_duplicate_detection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_partitioning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_ordering: Option<bool>,
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub auto_delete_on_idle: Option<Duration>,

    #[serde(default, skip_serializing)]
    pub size_in_bytes: Option<i64>,
    #[serde(default, skip_serializing)]
    pub subscription_count: Option<i64>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub count_details: Option<CountDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionProperties {
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub lock_duration: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_session: Option<bool>,
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub default_message_time_to_live: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_lettering_on_message_expiration: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delivery_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<String>,

    #[serde(default, skip_serializing)]
    pub message_count: Option<i64>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub count_details: Option<CountDetails>,
}

/// Correlation filter: every set field must match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Matches the message subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Subscription rule filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every message (`1=1`).
    True,
    /// Matches nothing (`1=0`).
    False,
    Sql(String),
    Correlation(CorrelationFilter),
}

pub const TRUE_FILTER_EXPRESSION: &str = "1=1";
pub const FALSE_FILTER_EXPRESSION: &str = "1=0";

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("TrueFilter"),
            Self::False => f.write_str("FalseFilter"),
            Self::Sql(expr) => write!(f, "SqlFilter: {expr}"),
            Self::Correlation(c) => {
                write!(f, "CorrelationFilter:")?;
                if let Some(id) = &c.correlation_id {
                    write!(f, " CorrelationId = '{id}'")?;
                }
                if let Some(label) = &c.label {
                    write!(f, " Label = '{label}'")?;
                }
                for (k, v) in &c.properties {
                    write!(f, " {k} = '{v}'")?;
                }
                Ok(())
            }
        }
    }
}

/// A named subscription rule: a filter plus an optional SQL action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDescription {
    pub name: String,
    pub filter: Filter,
    pub action: Option<String>,
}

impl RuleDescription {
    pub const DEFAULT_RULE_NAME: &'static str = "$Default";

    pub fn new(name: impl Into<String>, filter: Filter) -> Self {
        Self {
            name: name.into(),
            filter,
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SqlExpression {
    pub sql_expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RuleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_filter: Option<SqlExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_filter: Option<CorrelationFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SqlExpression>,
}

impl From<&RuleDescription> for RuleProperties {
    fn from(rule: &RuleDescription) -> Self {
        let sql = |expr: &str| {
            Some(SqlExpression {
                sql_expression: expr.to_string(),
            })
        };
        let (filter_type, sql_filter, correlation_filter) = match &rule.filter {
            Filter::True => ("SqlFilter", sql(TRUE_FILTER_EXPRESSION), None),
            Filter::False => ("SqlFilter", sql(FALSE_FILTER_EXPRESSION), None),
            Filter::Sql(expr) => ("SqlFilter", sql(expr), None),
            Filter::Correlation(c) => ("CorrelationFilter", None, Some(c.clone())),
        };
        Self {
            filter_type: Some(filter_type.to_string()),
            sql_filter,
            correlation_filter,
            action: rule.action.as_deref().and_then(sql),
        }
    }
}

impl RuleProperties {
    pub(crate) fn into_rule(self, name: String) -> RuleDescription {
        let filter = match (self.filter_type.as_deref(), self.correlation_filter, self.sql_filter) {
            (Some("CorrelationFilter"), Some(c), _) => Filter::Correlation(c),
            (_, _, Some(sql)) => match sql.sql_expression.replace(' ', "").as_str() {
                TRUE_FILTER_EXPRESSION => Filter::True,
                FALSE_FILTER_EXPRESSION => Filter::False,
                _ => Filter::Sql(sql.sql_expression),
            },
            (_, Some(c), None) => Filter::Correlation(c),
            (_, None, None) => Filter::True,
        };
        RuleDescription {
            name,
            filter,
            action: self.action.map(|a| a.sql_expression),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRight {
    Send,
    Listen,
    Manage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRuleProperties {
    pub rights: Vec<AccessRight>,
}

/// Result of `listKeys` on an authorization rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeys {
    #[serde(default)]
    pub key_name: String,
    #[serde(default)]
    pub primary_key: String,
    #[serde(default)]
    pub secondary_key: String,
    #[serde(default)]
    pub primary_connection_string: String,
    #[serde(default)]
    pub secondary_connection_string: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn queue_properties_serialize_settings_only() {
        let props = QueueProperties {
            lock_duration: Some(Duration::from_secs(45)),
            max_delivery_count: Some(8),
            message_count: Some(3),
            ..Default::default()
        };
        let value = serde_json::to_value(Resource::new(props)).unwrap();
        assert_eq!(
            value,
            json!({"properties": {"lockDuration": "PT45S", "maxDeliveryCount": 8}})
        );
    }

    #[test]
    fn queue_resource_deserializes_runtime_fields() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.ServiceBus/namespaces/ns/queues/q",
            "name": "q",
            "properties": {
                "lockDuration": "PT1M",
                "maxSizeInMegabytes": 2048,
                "defaultMessageTimeToLive": "P10675199DT2H48M5.4775807S",
                "messageCount": 5,
                "sizeInBytes": 1024,
                "createdAt": "2024-01-01T00:00:00Z",
                "countDetails": {"activeMessageCount": 4, "deadLetterMessageCount": 1}
            }
        });
        let resource: Resource<QueueProperties> = serde_json::from_value(body).unwrap();
        assert_eq!(resource.name.as_deref(), Some("q"));
        assert_eq!(resource.properties.lock_duration, Some(Duration::from_secs(60)));
        assert_eq!(resource.properties.count_details.unwrap().active_message_count, 4);
        assert!(
            resource
                .properties
                .describe_runtime()
                .contains(&"DeadLetterMessageCount: 1".to_string())
        );
    }

    #[test]
    fn sql_rule_with_action_wire_shape() {
        let rule = RuleDescription::new("BlueSqlRule", Filter::Sql("Color = 'Blue'".into()))
            .with_action("SET Color = 'BlueProcessed'");
        let value = serde_json::to_value(Resource::new(RuleProperties::from(&rule))).unwrap();
        assert_eq!(
            value,
            json!({"properties": {
                "filterType": "SqlFilter",
                "sqlFilter": {"sqlExpression": "Color = 'Blue'"},
                "action": {"sqlExpression": "SET Color = 'BlueProcessed'"}
            }})
        );
    }

    #[test]
    fn correlation_rule_wire_shape() {
        let rule = RuleDescription::new(
            "ImportantCorrelationRule",
            Filter::Correlation(CorrelationFilter {
                correlation_id: Some("important".into()),
                label: Some("Red".into()),
                ..Default::default()
            }),
        );
        let value = serde_json::to_value(RuleProperties::from(&rule)).unwrap();
        assert_eq!(
            value,
            json!({
                "filterType": "CorrelationFilter",
                "correlationFilter": {"correlationId": "important", "label": "Red"}
            })
        );
    }

    #[test]
    fn wire_rules_map_back_to_filters() {
        let true_rule = RuleProperties::from(&RuleDescription::new("MatchAll", Filter::True));
        assert_eq!(true_rule.into_rule("MatchAll".into()).filter, Filter::True);

        let parsed: RuleProperties = serde_json::from_value(json!({
            "filterType": "SqlFilter",
            "sqlFilter": {"sqlExpression": "1 = 1", "compatibilityLevel": 20}
        }))
        .unwrap();
        assert_eq!(parsed.into_rule("$Default".into()).filter, Filter::True);

        let sql = RuleProperties::from(&RuleDescription::new("Red", Filter::Sql("Color = 'Red'".into())));
        assert_eq!(
            sql.into_rule("Red".into()).filter,
            Filter::Sql("Color = 'Red'".into())
        );
    }

    #[test]
    fn filter_display() {
        assert_eq!(Filter::True.to_string(), "TrueFilter");
        let c = Filter::Correlation(CorrelationFilter {
            correlation_id: Some("important".into()),
            label: Some("Red".into()),
            ..Default::default()
        });
        assert_eq!(
            c.to_string(),
            "CorrelationFilter: CorrelationId = 'important' Label = 'Red'"
        );
    }

    #[test]
    fn access_keys_deserialize() {
        let keys: AccessKeys = serde_json::from_value(json!({
            "keyName": "ruleWithSend",
            "primaryKey": "pk=",
            "secondaryKey": "sk=",
            "primaryConnectionString": "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=ruleWithSend;SharedAccessKey=pk=;EntityPath=t",
            "secondaryConnectionString": ""
        }))
        .unwrap();
        assert_eq!(keys.key_name, "ruleWithSend");
        assert_eq!(keys.primary_key, "pk=");
    }

    #[test]
    fn rights_serialize_as_strings() {
        let props = AuthorizationRuleProperties {
            rights: vec![AccessRight::Send],
        };
        assert_eq!(serde_json::to_value(props).unwrap(), json!({"rights": ["Send"]}));
    }
}

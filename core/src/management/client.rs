use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::errors::ManagementApiError;
use super::types::{
    AccessKeys, AccessRight, AuthorizationRuleProperties, QueueProperties, Resource, ResourceList,
    RuleDescription, RuleProperties, SubscriptionProperties, TopicProperties,
};
use crate::auth::{AzureAdTokenProvider, ClientCredentials};

const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
const API_VERSION: &str = "2021-11-01";
const MAX_RETRIES: u32 = 3;

/// Where a namespace lives in Azure Resource Manager, plus the service
/// principal used to manage it.
#[derive(Debug, Clone)]
pub struct ManagementConfig {
    pub credentials: ClientCredentials,
    pub subscription_id: String,
    pub resource_group: String,
    pub namespace: String,
}

impl ManagementConfig {
    pub const TENANT_ID_VAR: &'static str = "AZURE_TENANT_ID";
    pub const CLIENT_ID_VAR: &'static str = "AZURE_CLIENT_ID";
    pub const CLIENT_SECRET_VAR: &'static str = "AZURE_CLIENT_SECRET";
    pub const SUBSCRIPTION_ID_VAR: &'static str = "AZURE_SUBSCRIPTION_ID";
    pub const RESOURCE_GROUP_VAR: &'static str = "AZURE_RESOURCE_GROUP";
}

/// Azure Resource Manager client for Service Bus entities.
///
/// Covers the management operations the samples need: queue, topic and
/// subscription lifecycle, subscription rules and topic authorization rules.
/// Requests are authenticated with a client-credentials bearer token and
/// transient failures are retried with exponential backoff.
pub struct ManagementClient {
    config: ManagementConfig,
    endpoint: String,
    http_client: reqwest::Client,
    tokens: AzureAdTokenProvider,
}

impl ManagementClient {
    pub fn new(config: ManagementConfig) -> Self {
        let tokens = AzureAdTokenProvider::new(config.credentials.clone());
        Self {
            config,
            endpoint: MANAGEMENT_ENDPOINT.to_string(),
            http_client: reqwest::Client::new(),
            tokens,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Requests tokens from `host` instead of the public Azure AD authority.
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.tokens =
            AzureAdTokenProvider::new(self.config.credentials.clone()).with_authority_host(host);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    fn namespace_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ServiceBus/namespaces/{}",
            self.endpoint.trim_end_matches('/'),
            self.config.subscription_id,
            self.config.resource_group,
            self.config.namespace
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?api-version={API_VERSION}", self.namespace_url(), path)
    }

    pub fn queue_url(&self, queue: &str) -> String {
        self.url(&format!("/queues/{}", urlencoding::encode(queue)))
    }

    pub fn topic_url(&self, topic: &str) -> String {
        self.url(&format!("/topics/{}", urlencoding::encode(topic)))
    }

    pub fn subscription_url(&self, topic: &str, subscription: &str) -> String {
        self.url(&format!(
            "/topics/{}/subscriptions/{}",
            urlencoding::encode(topic),
            urlencoding::encode(subscription)
        ))
    }

    pub fn rules_url(&self, topic: &str, subscription: &str) -> String {
        self.url(&format!(
            "/topics/{}/subscriptions/{}/rules",
            urlencoding::encode(topic),
            urlencoding::encode(subscription)
        ))
    }

    pub fn rule_url(&self, topic: &str, subscription: &str, rule: &str) -> String {
        self.url(&format!(
            "/topics/{}/subscriptions/{}/rules/{}",
            urlencoding::encode(topic),
            urlencoding::encode(subscription),
            urlencoding::encode(rule)
        ))
    }

    pub fn topic_authorization_rule_url(&self, topic: &str, rule: &str) -> String {
        self.url(&format!(
            "/topics/{}/authorizationRules/{}",
            urlencoding::encode(topic),
            urlencoding::encode(rule)
        ))
    }

    pub fn topic_list_keys_url(&self, topic: &str, rule: &str) -> String {
        self.url(&format!(
            "/topics/{}/authorizationRules/{}/listKeys",
            urlencoding::encode(topic),
            urlencoding::encode(rule)
        ))
    }

    // Queues

    pub async fn create_queue(
        &self,
        name: &str,
        properties: &QueueProperties,
    ) -> Result<Resource<QueueProperties>, ManagementApiError> {
        log::info!("Creating queue {name}");
        self.put(&self.queue_url(name), &Resource::new(properties), name)
            .await
    }

    pub async fn get_queue(&self, name: &str) -> Result<Resource<QueueProperties>, ManagementApiError> {
        self.get(&self.queue_url(name), name).await
    }

    /// Applies `update` to the current settings and writes them back.
    pub async fn update_queue<F>(
        &self,
        name: &str,
        update: F,
    ) -> Result<Resource<QueueProperties>, ManagementApiError>
    where
        F: FnOnce(&mut QueueProperties),
    {
        let mut current = self.get_queue(name).await?.properties;
        update(&mut current);
        log::info!("Updating queue {name}");
        self.put(&self.queue_url(name), &Resource::new(&current), name)
            .await
    }

    pub async fn delete_queue(&self, name: &str) -> Result<(), ManagementApiError> {
        log::info!("Deleting queue {name}");
        self.delete(&self.queue_url(name), name).await
    }

    pub async fn queue_exists(&self, name: &str) -> Result<bool, ManagementApiError> {
        match self.get_queue(name).await {
            Ok(_) => Ok(true),
            Err(ManagementApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // Topics and subscriptions

    pub async fn create_topic(
        &self,
        name: &str,
        properties: &TopicProperties,
    ) -> Result<Resource<TopicProperties>, ManagementApiError> {
        log::info!("Creating topic {name}");
        self.put(&self.topic_url(name), &Resource::new(properties), name)
            .await
    }

    pub async fn get_topic(&self, name: &str) -> Result<Resource<TopicProperties>, ManagementApiError> {
        self.get(&self.topic_url(name), name).await
    }

    pub async fn delete_topic(&self, name: &str) -> Result<(), ManagementApiError> {
        log::info!("Deleting topic {name}");
        self.delete(&self.topic_url(name), name).await
    }

    pub async fn create_subscription(
        &self,
        topic: &str,
        name: &str,
        properties: &SubscriptionProperties,
    ) -> Result<Resource<SubscriptionProperties>, ManagementApiError> {
        log::info!("Creating subscription {topic}/{name}");
        self.put(
            &self.subscription_url(topic, name),
            &Resource::new(properties),
            name,
        )
        .await
    }

    pub async fn delete_subscription(&self, topic: &str, name: &str) -> Result<(), ManagementApiError> {
        log::info!("Deleting subscription {topic}/{name}");
        self.delete(&self.subscription_url(topic, name), name).await
    }

    // Rules

    pub async fn create_rule(
        &self,
        topic: &str,
        subscription: &str,
        rule: &RuleDescription,
    ) -> Result<RuleDescription, ManagementApiError> {
        log::info!("Adding rule {} to {topic}/{subscription}", rule.name);
        let response: Resource<RuleProperties> = self
            .put(
                &self.rule_url(topic, subscription, &rule.name),
                &Resource::new(RuleProperties::from(rule)),
                &rule.name,
            )
            .await?;
        Ok(response.properties.into_rule(rule.name.clone()))
    }

    pub async fn list_rules(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<Vec<RuleDescription>, ManagementApiError> {
        let resources: Vec<Resource<RuleProperties>> = self
            .list(&self.rules_url(topic, subscription), subscription)
            .await?;
        Ok(resources
            .into_iter()
            .map(|r| {
                let name = r.name.clone().unwrap_or_default();
                r.properties.into_rule(name)
            })
            .collect())
    }

    pub async fn delete_rule(
        &self,
        topic: &str,
        subscription: &str,
        rule: &str,
    ) -> Result<(), ManagementApiError> {
        log::info!("Removing rule {rule} from {topic}/{subscription}");
        self.delete(&self.rule_url(topic, subscription, rule), rule)
            .await
    }

    // Authorization rules

    pub async fn create_topic_authorization_rule(
        &self,
        topic: &str,
        rule: &str,
        rights: &[AccessRight],
    ) -> Result<Resource<AuthorizationRuleProperties>, ManagementApiError> {
        log::info!("Creating authorization rule {rule} on {topic} with {rights:?}");
        let body = Resource::new(AuthorizationRuleProperties {
            rights: rights.to_vec(),
        });
        self.put(&self.topic_authorization_rule_url(topic, rule), &body, rule)
            .await
    }

    pub async fn list_topic_keys(&self, topic: &str, rule: &str) -> Result<AccessKeys, ManagementApiError> {
        self.send_with_retry(
            Method::POST,
            &self.topic_list_keys_url(topic, rule),
            Some(&serde_json::json!({})),
            rule,
        )
        .await?
        .ok_or_else(|| ManagementApiError::JsonParsingFailed("empty listKeys response".to_string()))
    }

    // Plumbing

    async fn get<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<T, ManagementApiError> {
        self.send_with_retry::<T, ()>(Method::GET, url, None, resource)
            .await?
            .ok_or_else(|| ManagementApiError::JsonParsingFailed(format!("empty response for {resource}")))
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        resource: &str,
    ) -> Result<T, ManagementApiError> {
        self.send_with_retry(Method::PUT, url, Some(body), resource)
            .await?
            .ok_or_else(|| ManagementApiError::JsonParsingFailed(format!("empty response for {resource}")))
    }

    async fn delete(&self, url: &str, resource: &str) -> Result<(), ManagementApiError> {
        self.send_with_retry::<serde_json::Value, ()>(Method::DELETE, url, None, resource)
            .await
            .map(|_| ())
    }

    async fn list<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<Vec<T>, ManagementApiError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        while let Some(page_url) = next.take() {
            let page: ResourceList<T> = self.get(&page_url, resource).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    async fn send_with_retry<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        resource: &str,
    ) -> Result<Option<T>, ManagementApiError> {
        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), url, body, resource).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = backoff_delay(attempt);
                    attempt += 1;
                    log::debug!("Attempt {attempt} failed, retrying in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    log::debug!("Management request to {url} failed: {err}");
                    return Err(err);
                }
            }
        }
    }

    async fn send_once<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        resource: &str,
    ) -> Result<Option<T>, ManagementApiError> {
        let token = self
            .tokens
            .get_token()
            .await
            .map_err(|e| ManagementApiError::AuthenticationFailed(e.to_string()))?;

        log::debug!("{method} {url}");
        let mut request = self
            .http_client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ManagementApiError::RequestFailed(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ManagementApiError::RequestFailed(format!("Failed to read response: {e}"))
        })?;

        if status.as_u16() == 404 {
            return Err(ManagementApiError::NotFound(resource.to_string()));
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ManagementApiError::AuthenticationFailed(format!(
                "status {status}: {text}"
            )));
        }
        if !status.is_success() {
            return Err(ManagementApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ManagementApiError::JsonParsingFailed(format!("Failed to parse JSON: {e}")))
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2_u64.pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ManagementConfig {
        ManagementConfig {
            credentials: ClientCredentials {
                tenant_id: "t".into(),
                client_id: "c".into(),
                client_secret: "s".into(),
            },
            subscription_id: "sub-1".into(),
            resource_group: "rg".into(),
            namespace: "contoso".into(),
        }
    }

    #[test]
    fn builds_entity_urls() {
        let client = ManagementClient::new(config());
        let base = "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.ServiceBus/namespaces/contoso";
        assert_eq!(
            client.queue_url("BasicQueue"),
            format!("{base}/queues/BasicQueue?api-version=2021-11-01")
        );
        assert_eq!(
            client.rule_url("orders", "ColorRed", "$Default"),
            format!("{base}/topics/orders/subscriptions/ColorRed/rules/%24Default?api-version=2021-11-01")
        );
        assert_eq!(
            client.topic_list_keys_url("t", "ruleWithSend"),
            format!("{base}/topics/t/authorizationRules/ruleWithSend/listKeys?api-version=2021-11-01")
        );
    }

    #[test]
    fn custom_endpoint_is_used() {
        let client = ManagementClient::new(config()).with_endpoint("http://localhost:8080/");
        assert!(client.topic_url("t").starts_with("http://localhost:8080/subscriptions/sub-1/"));
    }

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
    }
}

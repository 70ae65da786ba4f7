use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::common::{SampleError, SampleResult};

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
/// Tokens are refreshed this long before they actually expire.
const EXPIRY_BUFFER: Duration = Duration::from_secs(300);

/// Service principal credentials for the client-credentials flow.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Acquires and caches a bearer token for the Azure Resource Manager scope.
pub struct AzureAdTokenProvider {
    credentials: ClientCredentials,
    authority_host: String,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AzureAdTokenProvider {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self {
            credentials,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            http_client: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.credentials.tenant_id
        )
    }

    /// Form-encoded body of the client-credentials request.
    pub fn token_request_body(&self) -> String {
        [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
    }

    /// Returns a cached token or fetches a new one.
    pub async fn get_token(&self) -> SampleResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(entry.token.clone());
            }
            log::debug!("Cached management token expired, refreshing");
        }

        let response = self.request_token().await?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_BUFFER);
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    async fn request_token(&self) -> SampleResult<TokenResponse> {
        let url = self.token_url();
        log::debug!("Requesting client-credentials token from {url}");

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(self.token_request_body())
            .send()
            .await
            .map_err(|e| SampleError::Authentication(format!("Failed to request token: {e}")))?;

        if response.status().is_success() {
            response.json::<TokenResponse>().await.map_err(|e| {
                SampleError::Authentication(format!("Failed to parse token response: {e}"))
            })
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(SampleError::Authentication(describe_error(status.as_u16(), &text)))
        }
    }
}

fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => format!(
            "{} ({}): {}",
            err.error,
            status,
            err.error_description.unwrap_or_default()
        ),
        Err(_) => format!("Token request failed with status {status}: {body}"),
    }
}

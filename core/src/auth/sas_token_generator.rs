use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::common::{SampleError, SampleResult};

type HmacSha256 = Hmac<Sha256>;

/// Signs Shared Access Signature tokens for an arbitrary resource URI.
///
/// The token grants whatever rights the named authorization rule carries, scoped
/// to the resource URI prefix (a namespace, a topic, a single subscription).
///
/// # Examples
///
/// ```no_run
/// use sbcore::auth::SasTokenGenerator;
/// use std::time::Duration;
///
/// let token = SasTokenGenerator::generate(
///     "sb://contoso.servicebus.windows.net/topic/subscriptions/sub1",
///     "listen-rule",
///     "base64key=",
///     Duration::from_secs(600),
/// )?;
/// # Ok::<(), sbcore::SampleError>(())
/// ```
pub struct SasTokenGenerator;

impl SasTokenGenerator {
    /// Signs a token that expires `ttl` from now.
    pub fn generate(
        resource_uri: &str,
        key_name: &str,
        key: &str,
        ttl: Duration,
    ) -> SampleResult<String> {
        let ttl_secs = i64::try_from(ttl.as_secs()).map_err(|_| {
            SampleError::Configuration(format!("SAS token lifetime {ttl:?} is too large"))
        })?;
        let expiry = Utc::now().timestamp() + ttl_secs;
        Self::generate_with_expiry(resource_uri, key_name, key, expiry)
    }

    /// Signs a token with an explicit Unix expiry timestamp.
    ///
    /// The string to sign is the URL-encoded resource URI and the expiry
    /// separated by a newline. The HMAC key is the UTF-8 key text as issued by
    /// the service, not its base64-decoded bytes.
    pub fn generate_with_expiry(
        resource_uri: &str,
        key_name: &str,
        key: &str,
        expiry: i64,
    ) -> SampleResult<String> {
        if key_name.is_empty() || key.is_empty() {
            return Err(SampleError::Authentication(
                "SAS key name and key must not be empty".to_string(),
            ));
        }

        let encoded_uri = urlencoding::encode(resource_uri);
        let string_to_sign = format!("{encoded_uri}\n{expiry}");

        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| {
            SampleError::Authentication(format!("Failed to create HMAC: {e}"))
        })?;
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            encoded_uri,
            urlencoding::encode(&signature),
            expiry,
            key_name
        ))
    }
}

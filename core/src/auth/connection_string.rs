use crate::common::{SampleError, SampleResult};

/// Parsed form of a Service Bus connection string.
///
/// Accepts both key-based strings
/// (`Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=..;SharedAccessKey=..`)
/// and pre-signed ones (`Endpoint=..;SharedAccessSignature=SharedAccessSignature sr=..`).
/// An optional `EntityPath` scopes the string to a single queue or topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStringProperties {
    endpoint: String,
    shared_access_key_name: Option<String>,
    shared_access_key: Option<String>,
    shared_access_signature: Option<String>,
    entity_path: Option<String>,
}

impl ConnectionStringProperties {
    /// Parses a connection string.
    ///
    /// Key names are matched case-insensitively and values may contain `=`
    /// (base64 keys usually end with one). Blank segments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::Configuration`] when the string is empty, has no
    /// `Endpoint`, or carries neither a key pair nor a signature.
    pub fn parse(value: &str) -> SampleResult<Self> {
        if value.trim().is_empty() {
            return Err(SampleError::Configuration(
                "Connection string cannot be empty".to_string(),
            ));
        }

        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;
        let mut signature = None;
        let mut entity_path = None;

        for part in value.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let Some((name, val)) = part.split_once('=') else {
                return Err(SampleError::Configuration(format!(
                    "Malformed connection string segment: '{part}'"
                )));
            };
            let val = val.trim().to_string();

            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(val),
                "sharedaccesskeyname" => key_name = Some(val),
                "sharedaccesskey" => key = Some(val),
                "sharedaccesssignature" => signature = Some(val),
                "entitypath" => entity_path = Some(val),
                other => log::debug!("Ignoring unknown connection string key '{other}'"),
            }
        }

        let endpoint = endpoint.ok_or_else(|| {
            SampleError::Configuration("Missing Endpoint in connection string".to_string())
        })?;
        if !endpoint.contains("://") {
            return Err(SampleError::Configuration(format!(
                "Endpoint '{endpoint}' is not a URI"
            )));
        }

        match (&key_name, &key, &signature) {
            (Some(_), Some(_), _) | (_, _, Some(_)) => {}
            (None, _, None) => {
                return Err(SampleError::Configuration(
                    "Missing SharedAccessKeyName in connection string".to_string(),
                ));
            }
            (Some(_), None, None) => {
                return Err(SampleError::Configuration(
                    "Missing SharedAccessKey in connection string".to_string(),
                ));
            }
        }

        Ok(Self {
            endpoint,
            shared_access_key_name: key_name,
            shared_access_key: key,
            shared_access_signature: signature,
            entity_path: entity_path.filter(|p| !p.is_empty()),
        })
    }

    /// Builds properties for a pre-signed SAS token.
    pub fn with_shared_access_signature(
        endpoint: impl Into<String>,
        entity_path: Option<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            shared_access_key_name: None,
            shared_access_key: None,
            shared_access_signature: Some(token.into()),
            entity_path,
        }
    }

    /// Namespace-scoped copy, for clients that address several entities.
    pub fn without_entity_path(&self) -> Self {
        Self {
            entity_path: None,
            ..self.clone()
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Host part of the endpoint, e.g. `contoso.servicebus.windows.net`.
    pub fn fully_qualified_namespace(&self) -> &str {
        let without_scheme = self
            .endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint);
        without_scheme
            .split(['/', ':'])
            .next()
            .unwrap_or(without_scheme)
    }

    /// First DNS label of the endpoint host, e.g. `contoso`.
    pub fn namespace_name(&self) -> &str {
        let host = self.fully_qualified_namespace();
        host.split('.').next().unwrap_or(host)
    }

    pub fn shared_access_key_name(&self) -> Option<&str> {
        self.shared_access_key_name.as_deref()
    }

    pub fn shared_access_key(&self) -> Option<&str> {
        self.shared_access_key.as_deref()
    }

    pub fn shared_access_signature(&self) -> Option<&str> {
        self.shared_access_signature.as_deref()
    }

    pub fn entity_path(&self) -> Option<&str> {
        self.entity_path.as_deref()
    }

    /// Key name and key, required for raw AMQP SASL PLAIN and for signing.
    pub fn key_credentials(&self) -> SampleResult<(&str, &str)> {
        match (self.shared_access_key_name(), self.shared_access_key()) {
            (Some(name), Some(key)) => Ok((name, key)),
            _ => Err(SampleError::Configuration(
                "Connection string does not contain SharedAccessKeyName/SharedAccessKey"
                    .to_string(),
            )),
        }
    }

    /// Canonical string form, with the endpoint normalized to a trailing `/`.
    pub fn to_connection_string(&self) -> String {
        let mut endpoint = self.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        let mut out = format!("Endpoint={endpoint}");
        if let Some(name) = &self.shared_access_key_name {
            out.push_str(&format!(";SharedAccessKeyName={name}"));
        }
        if let Some(key) = &self.shared_access_key {
            out.push_str(&format!(";SharedAccessKey={key}"));
        }
        if let Some(signature) = &self.shared_access_signature {
            out.push_str(&format!(";SharedAccessSignature={signature}"));
        }
        if let Some(path) = &self.entity_path {
            out.push_str(&format!(";EntityPath={path}"));
        }
        out
    }
}

impl std::str::FromStr for ConnectionStringProperties {
    type Err = SampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

//! Credentials: connection strings, SAS signing, and Azure AD tokens for the
//! management plane.

pub mod azure_ad;
pub mod connection_string;
pub mod sas_token_generator;

pub use azure_ad::{AzureAdTokenProvider, ClientCredentials};
pub use connection_string::ConnectionStringProperties;
pub use sas_token_generator::SasTokenGenerator;

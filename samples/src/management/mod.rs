//! Entity management samples.

pub mod managing_entity;
pub mod sas_authorization;

use sbcore::management::ManagementClient;

use crate::cli::SampleConfig;

/// ARM client for the namespace named in the sample's connection string.
pub fn management_client(config: &SampleConfig) -> anyhow::Result<ManagementClient> {
    Ok(ManagementClient::new(config.management_config()?))
}

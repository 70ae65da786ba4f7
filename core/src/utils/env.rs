//! Environment variable access with validation.
//!
//! Every sample resolves part of its configuration from the process
//! environment. Lookups go through [`EnvLookup`] so the CLI layer and the tests
//! can substitute a fixed map for the real environment.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvVarError {
    #[error(
        "Environment variable '{name}' not found. Please set this variable in your .env file or environment."
    )]
    NotFound { name: String },

    #[error(
        "Environment variable '{name}' contains invalid UTF-8 characters. Please check the value."
    )]
    InvalidUtf8 { name: String },

    #[error("Environment variable '{name}' is empty. Please provide a valid value.")]
    Empty { name: String },
}

/// Source of environment values.
pub trait EnvLookup {
    /// Raw lookup. `Err(InvalidUtf8)` is reported for non-unicode values.
    fn raw(&self, name: &str) -> Result<Option<String>, EnvVarError>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn raw(&self, name: &str) -> Result<Option<String>, EnvVarError> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }
}

impl EnvLookup for HashMap<String, String> {
    fn raw(&self, name: &str) -> Result<Option<String>, EnvVarError> {
        Ok(self.get(name).cloned())
    }
}

impl<T: EnvLookup + ?Sized> EnvLookup for &T {
    fn raw(&self, name: &str) -> Result<Option<String>, EnvVarError> {
        (**self).raw(name)
    }
}

pub struct EnvUtils;

impl EnvUtils {
    /// Returns the trimmed value, failing when it is missing or blank.
    pub fn get_validated_var_in(env: &impl EnvLookup, name: &str) -> Result<String, EnvVarError> {
        match env.raw(name)? {
            Some(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            None => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// The trimmed value, or `None` when it is missing or blank.
    pub fn get_optional_var_in(env: &impl EnvLookup, name: &str) -> Option<String> {
        Self::get_validated_var_in(env, name).ok()
    }
}

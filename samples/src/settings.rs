use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const SETTINGS_FILE: &str = "sbsamples.toml";
const ENV_PREFIX: &str = "SBSAMPLES";

/// Settings shared by every sample binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub timing: TimingSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingSettings {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("warn")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TimingSettings {
    /// Replaces the ENTER-or-timeout wait of every sample.
    wait_seconds: Option<u64>,
}

impl TimingSettings {
    pub fn wait(&self, default: Duration) -> Duration {
        self.wait_seconds
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

impl Settings {
    /// `sbsamples.toml` in the working directory (optional), then
    /// `SBSAMPLES__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(SETTINGS_FILE), None)
    }

    /// Same as [`Settings::load`] with an explicit file and, for tests, an
    /// explicit environment instead of the process one.
    pub fn load_from(
        file: &Path,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_ok};
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let settings = assert_ok!(Settings::load_from(&dir.path().join("missing.toml"), env(&[])));
        assert_eq!(settings.logging.level(), "warn");
        assert_none!(settings.logging.file());
        assert_eq!(
            settings.timing.wait(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn file_values_are_read_and_env_overrides_them() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[logging]\nlevel = \"info\"\nfile = \"samples.log\"\n\n[timing]\nwait_seconds = 2"
        )
        .unwrap();

        let settings = assert_ok!(Settings::load_from(file.path(), env(&[])));
        assert_eq!(settings.logging.level(), "info");
        assert_eq!(settings.logging.file(), Some("samples.log"));
        assert_eq!(
            settings.timing.wait(Duration::from_secs(10)),
            Duration::from_secs(2)
        );

        let settings = assert_ok!(Settings::load_from(
            file.path(),
            env(&[("SBSAMPLES__LOGGING__LEVEL", "debug")])
        ));
        assert_eq!(settings.logging.level(), "debug");
    }
}

//! Command-line and environment configuration shared by all sample binaries.
//!
//! Every sample declares the options it understands. A value comes from the
//! matching environment variable (`SB_SAMPLES_*`, or `AZURE_*` for the
//! management credentials) when that is set and not blank, otherwise from the
//! flag, otherwise from the option's default.

use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Command};
use config::ConfigError;
use sbcore::amqp::ProxyEndpoint;
use sbcore::auth::ConnectionStringProperties;
use sbcore::management::ManagementConfig;
use sbcore::utils::{EnvLookup, EnvUtils, ProcessEnv};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::future::Future;
use std::process::ExitCode;

use crate::logger;
use crate::settings::Settings;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_MISSING_CONFIG: i32 = 2;
pub const EXIT_PARSE_ERROR: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleOption {
    ConnectionString,
    Queue,
    Topic,
    Subscription,
    ProxyHost,
    ProxyPort,
    TenantId,
    ClientId,
    ClientSecret,
    AzureSubscriptionId,
    ResourceGroup,
}

/// Service principal and resource location needed by the management samples.
pub const MANAGEMENT_OPTIONS: [SampleOption; 5] = [
    SampleOption::TenantId,
    SampleOption::ClientId,
    SampleOption::ClientSecret,
    SampleOption::AzureSubscriptionId,
    SampleOption::ResourceGroup,
];

impl SampleOption {
    fn id(self) -> &'static str {
        match self {
            Self::ConnectionString => "connection-string",
            Self::Queue => "queue",
            Self::Topic => "topic",
            Self::Subscription => "subscription",
            Self::ProxyHost => "proxy-hostname",
            Self::ProxyPort => "proxy-port",
            Self::TenantId => "tenant-id",
            Self::ClientId => "client-id",
            Self::ClientSecret => "client-secret",
            Self::AzureSubscriptionId => "azure-subscription-id",
            Self::ResourceGroup => "resource-group",
        }
    }

    fn short(self) -> Option<char> {
        match self {
            Self::ConnectionString => Some('c'),
            Self::Queue => Some('q'),
            Self::Topic => Some('t'),
            Self::Subscription => Some('s'),
            Self::ProxyHost => Some('n'),
            Self::ProxyPort => Some('p'),
            _ => None,
        }
    }

    /// How the option is spelled on the command line.
    pub fn flag(self) -> String {
        match self.short() {
            Some(short) => format!("-{short}"),
            None => format!("--{}", self.id()),
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            Self::ConnectionString => "SB_SAMPLES_CONNECTIONSTRING",
            Self::Queue => "SB_SAMPLES_QUEUENAME",
            Self::Topic => "SB_SAMPLES_TOPICNAME",
            Self::Subscription => "SB_SAMPLES_SUBSCRIPTIONNAME",
            Self::ProxyHost => "SB_SAMPLES_PROXY_HOSTNAME",
            Self::ProxyPort => "SB_SAMPLES_PROXY_PORT",
            Self::TenantId => ManagementConfig::TENANT_ID_VAR,
            Self::ClientId => ManagementConfig::CLIENT_ID_VAR,
            Self::ClientSecret => ManagementConfig::CLIENT_SECRET_VAR,
            Self::AzureSubscriptionId => ManagementConfig::SUBSCRIPTION_ID_VAR,
            Self::ResourceGroup => ManagementConfig::RESOURCE_GROUP_VAR,
        }
    }

    fn help(self) -> &'static str {
        match self {
            Self::ConnectionString => "Service Bus connection string",
            Self::Queue => "Queue name",
            Self::Topic => "Topic name",
            Self::Subscription => "Subscription name",
            Self::ProxyHost => "HTTP proxy host name",
            Self::ProxyPort => "HTTP proxy port",
            Self::TenantId => "Azure AD tenant of the service principal",
            Self::ClientId => "Service principal client id",
            Self::ClientSecret => "Service principal client secret",
            Self::AzureSubscriptionId => "Azure subscription holding the namespace",
            Self::ResourceGroup => "Resource group holding the namespace",
        }
    }

    pub const fn required(self) -> OptionSpec {
        OptionSpec {
            option: self,
            default: None,
        }
    }

    pub const fn with_default(self, default: &'static str) -> OptionSpec {
        OptionSpec {
            option: self,
            default: Some(default),
        }
    }
}

/// One option a sample accepts. Options without a default are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub option: SampleOption,
    pub default: Option<&'static str>,
}

/// `specs` followed by the required management credentials.
pub fn with_management_options(specs: &[OptionSpec]) -> Vec<OptionSpec> {
    specs
        .iter()
        .copied()
        .chain(MANAGEMENT_OPTIONS.iter().map(|option| option.required()))
        .collect()
}

/// Resolved configuration handed to a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleConfig {
    values: BTreeMap<SampleOption, String>,
}

impl SampleConfig {
    pub fn value(&self, option: SampleOption) -> Option<&str> {
        self.values.get(&option).map(String::as_str)
    }

    pub fn require(&self, option: SampleOption) -> anyhow::Result<&str> {
        self.value(option).ok_or_else(|| {
            anyhow::anyhow!(
                "Option {} ({}) was not configured",
                option.flag(),
                option.env_var()
            )
        })
    }

    pub fn connection_string(&self) -> anyhow::Result<&str> {
        self.require(SampleOption::ConnectionString)
    }

    pub fn connection_properties(&self) -> anyhow::Result<ConnectionStringProperties> {
        Ok(ConnectionStringProperties::parse(self.connection_string()?)?)
    }

    pub fn proxy(&self) -> anyhow::Result<ProxyEndpoint> {
        let host = self.require(SampleOption::ProxyHost)?;
        let port = parse_port(self.require(SampleOption::ProxyPort)?)
            .map_err(|value| anyhow::anyhow!("Invalid proxy port '{value}'"))?;
        Ok(ProxyEndpoint::new(host, port))
    }

    /// Management plane location and credentials. The namespace is taken
    /// from the connection string.
    pub fn management_config(&self) -> anyhow::Result<ManagementConfig> {
        let properties = self.connection_properties()?;
        Ok(ManagementConfig {
            credentials: sbcore::auth::ClientCredentials {
                tenant_id: self.require(SampleOption::TenantId)?.to_string(),
                client_id: self.require(SampleOption::ClientId)?.to_string(),
                client_secret: self.require(SampleOption::ClientSecret)?.to_string(),
            },
            subscription_id: self.require(SampleOption::AzureSubscriptionId)?.to_string(),
            resource_group: self.require(SampleOption::ResourceGroup)?.to_string(),
            namespace: properties.namespace_name().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    Missing(SampleOption),
    InvalidPort(String),
}

fn parse_port(value: &str) -> Result<u16, String> {
    value.trim().parse::<u16>().map_err(|_| value.to_string())
}

pub fn command(name: &'static str, about: &'static str, specs: &[OptionSpec]) -> Command {
    let mut command = Command::new(name).about(about).disable_version_flag(true);
    for spec in specs {
        let option = spec.option;
        let mut help = format!("{} [env: {}]", option.help(), option.env_var());
        if let Some(default) = spec.default {
            help.push_str(&format!(" [default: {default}]"));
        }
        let mut arg = Arg::new(option.id())
            .long(option.id())
            .value_name("VALUE")
            .help(help);
        if let Some(short) = option.short() {
            arg = arg.short(short);
        }
        command = command.arg(arg);
    }
    command
}

/// Resolves every declared option from environment, flags and defaults.
pub fn resolve(
    matches: &ArgMatches,
    specs: &[OptionSpec],
    env: &impl EnvLookup,
) -> Result<SampleConfig, CliError> {
    let mut values = BTreeMap::new();
    for spec in specs {
        let option = spec.option;
        let value = EnvUtils::get_optional_var_in(env, option.env_var())
            .or_else(|| matches.get_one::<String>(option.id()).cloned())
            .or_else(|| spec.default.map(str::to_string))
            .ok_or(CliError::Missing(option))?;

        if option == SampleOption::ProxyPort {
            parse_port(&value).map_err(CliError::InvalidPort)?;
        }
        values.insert(option, value);
    }
    Ok(SampleConfig { values })
}

/// Parses `args`, resolves the configuration and runs `body`. Returns the
/// process exit code.
pub fn run_app<I, T, F>(
    command: Command,
    args: I,
    specs: &[OptionSpec],
    env: &impl EnvLookup,
    body: F,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: FnOnce(SampleConfig) -> i32,
{
    let mut command = command;
    let matches = match command.try_get_matches_from_mut(args) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
                _ => EXIT_PARSE_ERROR,
            };
        }
    };

    match resolve(&matches, specs, env) {
        Ok(config) => body(config),
        Err(CliError::Missing(option)) => {
            eprintln!(
                "Missing required option {} (or environment variable {})\n",
                option.flag(),
                option.env_var()
            );
            eprintln!("{}", command.render_usage());
            EXIT_MISSING_CONFIG
        }
        Err(CliError::InvalidPort(value)) => {
            eprintln!("Invalid proxy port '{value}': expected a number between 0 and 65535");
            EXIT_PARSE_ERROR
        }
    }
}

/// Entry point used by every sample binary: loads `.env`, parses the
/// arguments, then loads settings, installs the logger and runs `sample` on a
/// multi-threaded runtime.
pub fn launch<F, Fut>(
    name: &'static str,
    about: &'static str,
    specs: &[OptionSpec],
    sample: F,
) -> ExitCode
where
    F: FnOnce(SampleConfig, Settings) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    dotenv::dotenv().ok();
    let code = launch_from(
        command(name, about, specs),
        std::env::args_os(),
        specs,
        &ProcessEnv,
        Settings::load,
        sample,
    );
    exit_code(code)
}

/// [`launch`] with explicit arguments, environment and settings source.
/// Settings are only loaded once the arguments have parsed, so `--help` works
/// even with a broken settings file.
pub fn launch_from<I, T, L, F, Fut>(
    command: Command,
    args: I,
    specs: &[OptionSpec],
    env: &impl EnvLookup,
    load_settings: L,
    sample: F,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    L: FnOnce() -> Result<Settings, ConfigError>,
    F: FnOnce(SampleConfig, Settings) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    run_app(command, args, specs, env, |config| {
        let settings = match load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Failed to load settings: {e}");
                return EXIT_MISSING_CONFIG;
            }
        };
        if let Err(e) = logger::setup_logger(&settings.logging) {
            eprintln!("Warning: logger not initialized: {e}");
        }
        run_sample(config, settings, sample)
    })
}

fn run_sample<F, Fut>(config: SampleConfig, settings: Settings, sample: F) -> i32
where
    F: FnOnce(SampleConfig, Settings) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return EXIT_FAILURE;
        }
    };

    match runtime.block_on(sample(config, settings)) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            log::error!("Sample failed: {e:#}");
            eprintln!("{e:#}");
            EXIT_FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

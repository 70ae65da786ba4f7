use sbsamples::cli::{
    self, EXIT_FAILURE, EXIT_MISSING_CONFIG, EXIT_PARSE_ERROR, EXIT_SUCCESS, OptionSpec,
    SampleOption,
};
use config::ConfigError;
use sbsamples::settings::Settings;
use std::cell::Cell;
use std::collections::HashMap;

const CONNECTION_STRING: &str =
    "Endpoint=sb://contoso.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=c2VjcmV0";

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn run(specs: &[OptionSpec], args: &[&str], env: &HashMap<String, String>, code: i32) -> i32 {
    let argv = std::iter::once("sample").chain(args.iter().copied());
    cli::run_app(cli::command("sample", "test sample", specs), argv, specs, env, |_| code)
}

mod exit_codes {
    use super::*;

    #[test]
    fn body_result_is_returned() {
        let specs = [SampleOption::ConnectionString.required()];
        assert_eq!(
            run(&specs, &["-c", CONNECTION_STRING], &env(&[]), EXIT_SUCCESS),
            EXIT_SUCCESS
        );
        assert_eq!(
            run(&specs, &["-c", CONNECTION_STRING], &env(&[]), EXIT_FAILURE),
            EXIT_FAILURE
        );
    }

    #[test]
    fn missing_connection_string() {
        let specs = [SampleOption::ConnectionString.required()];
        assert_eq!(run(&specs, &[], &env(&[]), EXIT_SUCCESS), EXIT_MISSING_CONFIG);
    }

    #[test]
    fn blank_environment_value_counts_as_missing() {
        let specs = [SampleOption::ConnectionString.required()];
        let env = env(&[("SB_SAMPLES_CONNECTIONSTRING", "   ")]);
        assert_eq!(run(&specs, &[], &env, EXIT_SUCCESS), EXIT_MISSING_CONFIG);
    }

    #[test]
    fn unknown_flag_is_a_parse_error() {
        let specs = [SampleOption::ConnectionString.required()];
        assert_eq!(
            run(&specs, &["-c", CONNECTION_STRING, "-x", "1"], &env(&[]), EXIT_SUCCESS),
            EXIT_PARSE_ERROR
        );
    }

    #[test]
    fn non_numeric_proxy_port_is_a_parse_error() {
        let specs = [
            SampleOption::ConnectionString.required(),
            SampleOption::ProxyHost.required(),
            SampleOption::ProxyPort.required(),
        ];
        let args = ["-c", CONNECTION_STRING, "-n", "proxy.local", "-p", "eighty"];
        assert_eq!(run(&specs, &args, &env(&[]), EXIT_SUCCESS), EXIT_PARSE_ERROR);
    }

    #[test]
    fn help_exits_successfully() {
        let specs = [SampleOption::ConnectionString.required()];
        assert_eq!(run(&specs, &["--help"], &env(&[]), EXIT_FAILURE), EXIT_SUCCESS);
    }

    #[test]
    fn missing_management_credentials() {
        let specs = cli::with_management_options(&[SampleOption::ConnectionString.required()]);
        assert_eq!(
            run(&specs, &["-c", CONNECTION_STRING], &env(&[]), EXIT_SUCCESS),
            EXIT_MISSING_CONFIG
        );

        let partial = env(&[
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "secret"),
            ("AZURE_SUBSCRIPTION_ID", "sub"),
        ]);
        assert_eq!(
            run(&specs, &["-c", CONNECTION_STRING], &partial, EXIT_SUCCESS),
            EXIT_MISSING_CONFIG
        );
    }

    fn launch(args: &[&str], loads: &Cell<u32>) -> i32 {
        let specs = [SampleOption::ConnectionString.required()];
        cli::launch_from(
            cli::command("sample", "test sample", &specs),
            std::iter::once("sample").chain(args.iter().copied()),
            &specs,
            &env(&[]),
            || -> Result<Settings, ConfigError> {
                loads.set(loads.get() + 1);
                Err(ConfigError::Message("invalid type: string, expected a map".into()))
            },
            |_, _| async { Ok(()) },
        )
    }

    #[test]
    fn help_does_not_load_settings() {
        let loads = Cell::new(0);
        assert_eq!(launch(&["--help"], &loads), EXIT_SUCCESS);
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn broken_settings_after_parsing() {
        let loads = Cell::new(0);
        assert_eq!(launch(&["-c", CONNECTION_STRING], &loads), EXIT_MISSING_CONFIG);
        assert_eq!(loads.get(), 1);
        assert_eq!(launch(&["-x"], &loads), EXIT_PARSE_ERROR);
        assert_eq!(loads.get(), 1);
    }
}

mod resolution {
    use super::*;

    #[test]
    fn environment_overrides_flag() {
        let specs = [
            SampleOption::ConnectionString.required(),
            SampleOption::Queue.required(),
        ];
        let env = env(&[
            ("SB_SAMPLES_CONNECTIONSTRING", CONNECTION_STRING),
            ("SB_SAMPLES_QUEUENAME", "FromEnv"),
        ]);
        let code = cli::run_app(
            cli::command("sample", "test sample", &specs),
            ["sample", "-q", "FromFlag"],
            &specs,
            &env,
            |config| {
                assert_eq!(config.value(SampleOption::Queue), Some("FromEnv"));
                assert_eq!(config.connection_string().ok(), Some(CONNECTION_STRING));
                EXIT_SUCCESS
            },
        );
        assert_eq!(code, EXIT_SUCCESS);
    }

    #[test]
    fn default_fills_unset_topic() {
        let specs = [
            SampleOption::ConnectionString.required(),
            SampleOption::Topic.with_default("TopicFilterSampleTopic"),
        ];
        let code = cli::run_app(
            cli::command("sample", "test sample", &specs),
            ["sample", "-c", CONNECTION_STRING],
            &specs,
            &env(&[]),
            |config| {
                assert_eq!(
                    config.value(SampleOption::Topic),
                    Some("TopicFilterSampleTopic")
                );
                EXIT_SUCCESS
            },
        );
        assert_eq!(code, EXIT_SUCCESS);
    }

    #[test]
    fn management_config_from_flags_and_environment() {
        let specs = cli::with_management_options(&[SampleOption::ConnectionString.required()]);
        let env = env(&[
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "secret"),
            ("AZURE_SUBSCRIPTION_ID", "sub"),
        ]);
        let code = cli::run_app(
            cli::command("sample", "test sample", &specs),
            ["sample", "-c", CONNECTION_STRING, "--resource-group", "rg"],
            &specs,
            &env,
            |config| {
                let management = config.management_config().ok();
                let management = management.as_ref();
                assert_eq!(management.map(|m| m.namespace.as_str()), Some("contoso"));
                assert_eq!(management.map(|m| m.resource_group.as_str()), Some("rg"));
                assert_eq!(
                    management.map(|m| m.credentials.tenant_id.as_str()),
                    Some("tenant")
                );
                EXIT_SUCCESS
            },
        );
        assert_eq!(code, EXIT_SUCCESS);
    }

    #[test]
    fn proxy_endpoint_is_parsed() {
        let specs = [
            SampleOption::ConnectionString.required(),
            SampleOption::ProxyHost.required(),
            SampleOption::ProxyPort.required(),
        ];
        let code = cli::run_app(
            cli::command("sample", "test sample", &specs),
            ["sample", "-c", CONNECTION_STRING, "-n", "proxy.local", "-p", "3128"],
            &specs,
            &env(&[]),
            |config| match config.proxy() {
                Ok(proxy) if proxy.to_string() == "proxy.local:3128" => EXIT_SUCCESS,
                _ => EXIT_FAILURE,
            },
        );
        assert_eq!(code, EXIT_SUCCESS);
    }
}

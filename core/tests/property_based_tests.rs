use proptest::prelude::*;
use sbcore::auth::{ConnectionStringProperties, SasTokenGenerator};
use sbcore::entity::EntityPath;
use sbcore::management::duration;
use std::time::Duration;

fn namespace_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{4,20}[a-z0-9]"
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9+/]{20,44}={0,2}"
}

mod connection_string_properties {
    use super::*;

    proptest! {
        #[test]
        fn parse_round_trips_through_canonical_form(
            namespace in namespace_strategy(),
            key_name in "[A-Za-z][A-Za-z0-9]{0,30}",
            key in key_strategy(),
        ) {
            let raw = format!(
                "Endpoint=sb://{namespace}.servicebus.windows.net/;SharedAccessKeyName={key_name};SharedAccessKey={key}"
            );
            let parsed = ConnectionStringProperties::parse(&raw).unwrap();

            let fqdn = format!("{namespace}.servicebus.windows.net");
            prop_assert_eq!(parsed.fully_qualified_namespace(), fqdn.as_str());
            prop_assert_eq!(parsed.namespace_name(), namespace.as_str());
            prop_assert_eq!(parsed.shared_access_key(), Some(key.as_str()));

            let reparsed = ConnectionStringProperties::parse(&parsed.to_connection_string()).unwrap();
            prop_assert_eq!(reparsed, parsed);
        }

        #[test]
        fn key_names_are_case_insensitive(
            namespace in namespace_strategy(),
            key in key_strategy(),
            upper in any::<bool>(),
        ) {
            let (endpoint, name, value) = if upper {
                ("ENDPOINT", "SHAREDACCESSKEYNAME", "SHAREDACCESSKEY")
            } else {
                ("endpoint", "sharedaccesskeyname", "sharedaccesskey")
            };
            let raw = format!(
                "{endpoint}=sb://{namespace}.servicebus.windows.net/;{name}=Root;{value}={key}"
            );
            let parsed = ConnectionStringProperties::parse(&raw).unwrap();
            prop_assert_eq!(parsed.shared_access_key_name(), Some("Root"));
            prop_assert_eq!(parsed.shared_access_key(), Some(key.as_str()));
        }

        #[test]
        fn strings_without_credentials_are_rejected(namespace in namespace_strategy()) {
            let raw = format!("Endpoint=sb://{namespace}.servicebus.windows.net/");
            prop_assert!(ConnectionStringProperties::parse(&raw).is_err());
        }
    }
}

mod sas_tokens {
    use super::*;

    proptest! {
        #[test]
        fn token_has_expected_fields(
            namespace in namespace_strategy(),
            topic in "[a-z][a-z0-9]{1,12}",
            key in key_strategy(),
            expiry in 1_600_000_000i64..2_000_000_000,
        ) {
            let uri = format!("https://{namespace}.servicebus.windows.net/{topic}");
            let token = SasTokenGenerator::generate_with_expiry(&uri, "ruleWithSend", &key, expiry).unwrap();

            let fields = token.strip_prefix("SharedAccessSignature ").unwrap();
            let keys: Vec<&str> = fields
                .split('&')
                .map(|kv| kv.split_once('=').unwrap().0)
                .collect();
            prop_assert_eq!(keys, vec!["sr", "sig", "se", "skn"]);

            let se = format!("se={expiry}");
            let sr = format!("sr={}", urlencoding::encode(&uri));
            prop_assert!(fields.contains(&se));
            prop_assert!(fields.contains(&sr));
            prop_assert!(fields.ends_with("&skn=ruleWithSend"));
        }

        #[test]
        fn signing_is_deterministic(key in key_strategy(), expiry in 0i64..4_000_000_000) {
            let a = SasTokenGenerator::generate_with_expiry("sb://ns/q", "n", &key, expiry).unwrap();
            let b = SasTokenGenerator::generate_with_expiry("sb://ns/q", "n", &key, expiry).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}

mod iso_durations {
    use super::*;

    proptest! {
        #[test]
        fn formatted_durations_parse_back(secs in 0u64..(400 * 86_400), millis in 0u32..1000) {
            let original = Duration::new(secs, millis * 1_000_000);
            let text = duration::format(original);
            prop_assert!(text.starts_with('P'));
            prop_assert_eq!(duration::parse(&text).unwrap(), original);
        }

        #[test]
        fn garbage_does_not_panic(text in ".{0,24}") {
            let _ = duration::parse(&text);
        }
    }
}

mod entity_addresses {
    use super::*;

    proptest! {
        #[test]
        fn addresses_parse_back(
            topic in "[A-Za-z][A-Za-z0-9.-]{0,20}",
            subscription in "[A-Za-z][A-Za-z0-9.-]{0,20}",
            dead_letter in any::<bool>(),
        ) {
            let mut path = EntityPath::subscription(topic, subscription);
            if dead_letter {
                path = path.dead_letter();
            }
            prop_assert_eq!(EntityPath::from_address(&path.address()), Some(path));
        }
    }
}

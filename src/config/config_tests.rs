//! Unit tests for configuration resolution.

use super::*;
use proptest::prelude::*;
use rstest::{fixture, rstest};
use serde_json::json;
use std::time::Duration;

#[fixture]
fn base() -> Config {
    resolve(None, &ConfigOverrides::new().with_token("base-token")).expect("resolve base")
}

#[rstest]
fn defaults_fill_unset_fields() {
    let config = resolve(None, &ConfigOverrides::new().with_token("t")).expect("resolve");
    assert_eq!(config.token, "t");
    assert_eq!(config.name, DEFAULT_NAME);
    assert_eq!(config.host, DEFAULT_HOST);
    assert_eq!(config.path, DEFAULT_PATH);
    assert_eq!(config.protocol, Protocol::Https);
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.level, DEFAULT_LEVEL);
    assert!(config.auto_flush);
    assert_eq!(config.max_retries, 0);
    assert_eq!(config.batch_interval, None);
    assert_eq!(config.max_batch_count, None);
    assert_eq!(config.max_batch_size, None);
    assert_eq!(
        config.url(),
        "https://localhost:8088/services/collector/event/1.0"
    );
}

#[rstest]
fn missing_token_is_rejected() {
    assert_eq!(
        resolve(None, &ConfigOverrides::new().with_host("h")),
        Err(ConfigError::MissingToken)
    );
}

#[rstest]
fn empty_token_is_rejected() {
    assert_eq!(
        resolve(None, &ConfigOverrides::new().with_token("")),
        Err(ConfigError::MissingToken)
    );
}

#[rstest]
fn base_token_is_inherited(base: Config) {
    let config = resolve(Some(&base), &ConfigOverrides::new().with_level("warn")).expect("resolve");
    assert_eq!(config.token, "base-token");
    assert_eq!(config.level, "warn");
}

#[rstest]
fn override_wins_over_base(base: Config) {
    let overrides = ConfigOverrides::new()
        .with_token("other")
        .with_host("collector")
        .with_auto_flush(false);
    let config = resolve(Some(&base), &overrides).expect("resolve");
    assert_eq!(config.token, "other");
    assert_eq!(config.host, "collector");
    assert!(!config.auto_flush);
}

#[rstest]
fn base_is_left_untouched(base: Config) {
    let snapshot = base.clone();
    let _ = resolve(Some(&base), &ConfigOverrides::new().with_host("elsewhere"));
    assert_eq!(base, snapshot);
}

#[rstest]
fn url_supplies_connection_fields() {
    let overrides = ConfigOverrides::new()
        .with_token("t")
        .with_url("http://splunk.local:9088/services/collector/raw");
    let config = resolve(None, &overrides).expect("resolve");
    assert_eq!(config.protocol, Protocol::Http);
    assert_eq!(config.host, "splunk.local");
    assert_eq!(config.port, 9088);
    assert_eq!(config.path, "/services/collector/raw");
}

#[rstest]
fn explicit_fields_beat_url_fields() {
    let overrides = ConfigOverrides::new()
        .with_token("t")
        .with_url("http://splunk.local:9088/custom")
        .with_host("explicit-host")
        .with_port(9999)
        .with_protocol(Protocol::Https)
        .with_path("/explicit");
    let config = resolve(None, &overrides).expect("resolve");
    assert_eq!(config.protocol, Protocol::Https);
    assert_eq!(config.host, "explicit-host");
    assert_eq!(config.port, 9999);
    assert_eq!(config.path, "/explicit");
}

#[rstest]
fn bare_slash_url_path_keeps_inherited_path(base: Config) {
    let overrides = ConfigOverrides::new().with_url("https://splunk.local/");
    let config = resolve(Some(&base), &overrides).expect("resolve");
    assert_eq!(config.host, "splunk.local");
    assert_eq!(config.path, DEFAULT_PATH);
    assert_eq!(config.port, DEFAULT_PORT);
}

#[rstest]
#[case("http://splunk.local:80/", 80)]
#[case("https://splunk.local:443", 443)]
#[case("https://splunk.local:999/services/collector", 999)]
fn url_port_below_range_is_rejected(#[case] url: &str, #[case] port: i64) {
    let overrides = ConfigOverrides::new().with_token("t").with_url(url);
    assert_eq!(
        resolve(None, &overrides),
        Err(ConfigError::PortOutOfRange(port))
    );
}

#[rstest]
fn use_https_flag_selects_protocol() {
    let config = resolve(None, &ConfigOverrides::new().with_token("t").with_use_https(false))
        .expect("resolve");
    assert_eq!(config.protocol, Protocol::Http);
}

#[rstest]
#[case(json!(999))]
#[case(json!(65536))]
#[case(json!("65536"))]
#[case(json!(-1))]
fn out_of_range_ports_fail(#[case] port: serde_json::Value) {
    let err = resolve_value(None, Some(&json!({"token": "t", "port": port})))
        .expect_err("port must be rejected");
    assert!(matches!(err, ConfigError::PortOutOfRange(_)));
}

#[rstest]
#[case(json!("not-a-port"))]
#[case(json!("80a"))]
#[case(json!(8088.25))]
fn non_integer_ports_fail(#[case] port: serde_json::Value) {
    let err = resolve_value(None, Some(&json!({"token": "t", "port": port})))
        .expect_err("port must be rejected");
    assert!(matches!(err, ConfigError::PortNotInteger(_)));
}

#[rstest]
#[case(json!(1000), 1000)]
#[case(json!(65535), 65535)]
#[case(json!("1000"), 1000)]
fn boundary_ports_succeed(#[case] port: serde_json::Value, #[case] expected: u16) {
    let config = resolve_value(None, Some(&json!({"token": "t", "port": port}))).expect("resolve");
    assert_eq!(config.port, expected);
}

#[rstest]
fn absent_json_overrides_fail() {
    assert_eq!(resolve_value(None, None), Err(ConfigError::Missing));
}

#[rstest]
fn zero_thresholds_disable_batching(base: Config) {
    let overrides = ConfigOverrides::new()
        .with_max_batch_count(0)
        .with_max_batch_size(0)
        .with_batch_interval(Duration::ZERO);
    let config = resolve(Some(&base), &overrides).expect("resolve");
    assert_eq!(config.max_batch_count, None);
    assert_eq!(config.max_batch_size, None);
    assert_eq!(config.batch_interval, None);
}

#[rstest]
fn thresholds_are_inherited(base: Config) {
    let batched = resolve(
        Some(&base),
        &ConfigOverrides::new()
            .with_max_batch_count(5)
            .with_batch_interval(Duration::from_millis(500)),
    )
    .expect("resolve");
    let config = resolve(Some(&batched), &ConfigOverrides::new()).expect("resolve");
    assert_eq!(config.max_batch_count, Some(5));
    assert_eq!(config.batch_interval, Some(Duration::from_millis(500)));
}

#[rstest]
fn revalidate_catches_edited_tokens(base: Config) {
    let mut edited = base.clone();
    edited.token.clear();
    assert_eq!(revalidate(&edited), Err(ConfigError::MissingToken));
    assert_eq!(revalidate(&base), Ok(base));
}

fn arb_overrides() -> impl Strategy<Value = ConfigOverrides> {
    (
        "[a-z0-9]{1,16}",
        proptest::option::of("[a-z][a-z0-9.-]{0,20}"),
        proptest::option::of(1000u16..=65535),
        proptest::option::of("(debug|info|warn|error)"),
        proptest::option::of(any::<bool>()),
        proptest::option::of(0usize..100),
    )
        .prop_map(|(token, host, port, level, auto_flush, count)| {
            let mut overrides = ConfigOverrides::new().with_token(token);
            overrides.host = host;
            overrides.port = port.map(PortValue::from);
            overrides.level = level;
            overrides.auto_flush = auto_flush;
            overrides.max_batch_count = count;
            overrides
        })
}

proptest! {
    #[test]
    fn resolve_is_idempotent(overrides in arb_overrides()) {
        let once = resolve(None, &overrides).expect("resolve once");
        let twice = resolve(Some(&once), &ConfigOverrides::new()).expect("resolve twice");
        prop_assert_eq!(once, twice);
    }
}

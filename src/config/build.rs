//! Resolution of override layers into a [`Config`] snapshot.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use super::overrides::{ConfigOverrides, PortValue};
use super::types::{
    Config, ConfigError, DEFAULT_HOST, DEFAULT_LEVEL, DEFAULT_NAME, DEFAULT_PATH, DEFAULT_PORT,
    MAX_PORT, MIN_PORT, Protocol,
};

/// Components extracted from a connection URL.
#[derive(Debug, Default, PartialEq, Eq)]
struct UrlParts {
    protocol: Option<Protocol>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
}

fn parse_connection_url(raw: &str) -> Result<UrlParts, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    let protocol = Protocol::from_scheme(url.scheme())
        .ok_or_else(|| ConfigError::UnsupportedProtocol(url.scheme().to_owned()))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_owned);
    // A bare "/" is what the parser reports for URLs without a path.
    let path = Some(url.path())
        .filter(|p| !p.is_empty() && *p != "/")
        .map(str::to_owned);
    Ok(UrlParts {
        protocol: Some(protocol),
        host,
        port: explicit_port(raw, &url),
        path,
    })
}

/// The port written in `raw`, including one equal to the scheme default.
///
/// `Url::port` hides default ports, so the authority is checked for a
/// `:port` suffix before falling back to the scheme's known default.
fn explicit_port(raw: &str, url: &Url) -> Option<u16> {
    if let Some(port) = url.port() {
        return Some(port);
    }
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let after_host = host_port.rsplit_once(']').map_or(host_port, |(_, tail)| tail);
    let written = after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()));
    if written {
        url.port_or_known_default()
    } else {
        None
    }
}

/// Parse a caller supplied port and check it against the accepted range.
pub(crate) fn parse_port(value: &PortValue) -> Result<u16, ConfigError> {
    let port = match value {
        PortValue::Integer(n) => *n,
        PortValue::Float(f) if f.is_finite() && f.fract() == 0.0 => *f as i64,
        PortValue::Float(f) => return Err(ConfigError::PortNotInteger(f.to_string())),
        PortValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::PortNotInteger(s.clone()))?,
    };
    check_port_range(port)
}

fn check_port_range(port: i64) -> Result<u16, ConfigError> {
    if !(MIN_PORT..=MAX_PORT).contains(&port) {
        return Err(ConfigError::PortOutOfRange(port));
    }
    u16::try_from(port).map_err(|_| ConfigError::PortOutOfRange(port))
}

fn non_zero<T: PartialEq + Default>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

/// Merge `overrides` onto `base` and the library defaults.
///
/// Every field follows the same precedence: the override value, then (for
/// protocol, host, port and path) the value derived from `overrides.url`,
/// then the base value, then the default. The base is never modified.
///
/// # Errors
///
/// Fails with [`ConfigError`] when no non-empty token is available, when the
/// connection URL cannot be parsed or uses an unsupported scheme, or when the
/// port is not an integer in `[1000, 65535]`.
///
/// # Examples
///
/// ```
/// use hec_logging::config::{resolve, ConfigOverrides};
///
/// let overrides = ConfigOverrides::new()
///     .with_token("secret")
///     .with_url("http://collector.local:9088");
/// let config = resolve(None, &overrides).unwrap();
/// assert_eq!(config.url(), "http://collector.local:9088/services/collector/event/1.0");
/// ```
pub fn resolve(base: Option<&Config>, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
    let token = overrides
        .token
        .clone()
        .or_else(|| base.map(|b| b.token.clone()))
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::MissingToken)?;

    let from_url = match overrides.url.as_deref() {
        Some(raw) => parse_connection_url(raw)?,
        None => UrlParts::default(),
    };

    let protocol = overrides
        .protocol
        .or(overrides.use_https.map(Protocol::from_use_https))
        .or(from_url.protocol)
        .or(base.map(|b| b.protocol))
        .unwrap_or_default();

    let port = match &overrides.port {
        Some(value) => parse_port(value)?,
        None => match from_url.port {
            Some(port) => check_port_range(i64::from(port))?,
            None => base.map_or(DEFAULT_PORT, |b| b.port),
        },
    };

    let pick = |explicit: &Option<String>,
                derived: Option<String>,
                inherited: Option<&String>,
                default: &str| {
        explicit
            .clone()
            .or(derived)
            .or_else(|| inherited.cloned())
            .unwrap_or_else(|| default.to_owned())
    };

    let host = pick(
        &overrides.host,
        from_url.host,
        base.map(|b| &b.host),
        DEFAULT_HOST,
    );
    let path = pick(
        &overrides.path,
        from_url.path,
        base.map(|b| &b.path),
        DEFAULT_PATH,
    );
    let name = pick(&overrides.name, None, base.map(|b| &b.name), DEFAULT_NAME);
    let level = pick(&overrides.level, None, base.map(|b| &b.level), DEFAULT_LEVEL);

    let batch_interval = match overrides.batch_interval {
        Some(ms) => non_zero(Some(ms)).map(Duration::from_millis),
        None => base.and_then(|b| b.batch_interval),
    };

    Ok(Config {
        token,
        name,
        host,
        path,
        protocol,
        port,
        level,
        auto_flush: overrides
            .auto_flush
            .or(base.map(|b| b.auto_flush))
            .unwrap_or(true),
        max_retries: overrides
            .max_retries
            .or(base.map(|b| b.max_retries))
            .unwrap_or(0),
        batch_interval,
        max_batch_count: match overrides.max_batch_count {
            Some(count) => non_zero(Some(count)),
            None => base.and_then(|b| b.max_batch_count),
        },
        max_batch_size: match overrides.max_batch_size {
            Some(size) => non_zero(Some(size)),
            None => base.and_then(|b| b.max_batch_size),
        },
    })
}

/// Resolve an untyped JSON override layer.
///
/// # Errors
///
/// [`ConfigError::Missing`] when `overrides` is `None`, plus everything
/// [`ConfigOverrides::from_json`] and [`resolve`] report.
pub fn resolve_value(base: Option<&Config>, overrides: Option<&Value>) -> Result<Config, ConfigError> {
    let value = overrides.ok_or(ConfigError::Missing)?;
    let overrides = ConfigOverrides::from_json(value)?;
    resolve(base, &overrides)
}

/// Re-check an existing snapshot, e.g. after middleware edited it.
pub(crate) fn revalidate(config: &Config) -> Result<Config, ConfigError> {
    resolve(Some(config), &ConfigOverrides::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com", Some(Protocol::Https), Some("example.com"), None, None)]
    #[case("http://example.com:9000/", Some(Protocol::Http), Some("example.com"), Some(9000), None)]
    #[case(
        "https://10.0.0.1:8088/services/collector",
        Some(Protocol::Https),
        Some("10.0.0.1"),
        Some(8088),
        Some("/services/collector")
    )]
    #[case("http://example.com:80/", Some(Protocol::Http), Some("example.com"), Some(80), None)]
    #[case("https://example.com:443", Some(Protocol::Https), Some("example.com"), Some(443), None)]
    #[case("https://[::1]:443/raw", Some(Protocol::Https), Some("[::1]"), Some(443), Some("/raw"))]
    #[case("https://user:pw@example.com/", Some(Protocol::Https), Some("example.com"), None, None)]
    fn url_parts_are_extracted(
        #[case] raw: &str,
        #[case] protocol: Option<Protocol>,
        #[case] host: Option<&str>,
        #[case] port: Option<u16>,
        #[case] path: Option<&str>,
    ) {
        let parts = parse_connection_url(raw).expect("parse url");
        assert_eq!(parts.protocol, protocol);
        assert_eq!(parts.host.as_deref(), host);
        assert_eq!(parts.port, port);
        assert_eq!(parts.path.as_deref(), path);
    }

    #[rstest]
    fn unsupported_scheme_is_rejected() {
        assert_eq!(
            parse_connection_url("ftp://example.com"),
            Err(ConfigError::UnsupportedProtocol("ftp".into()))
        );
    }

    #[rstest]
    fn unparseable_url_is_rejected() {
        assert!(matches!(
            parse_connection_url("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[rstest]
    #[case(PortValue::Integer(1000), Ok(1000))]
    #[case(PortValue::Integer(65535), Ok(65535))]
    #[case(PortValue::Text(" 8089 ".into()), Ok(8089))]
    #[case(PortValue::Float(8090.0), Ok(8090))]
    #[case(PortValue::Integer(999), Err(ConfigError::PortOutOfRange(999)))]
    #[case(PortValue::Integer(65536), Err(ConfigError::PortOutOfRange(65536)))]
    #[case(PortValue::Text("abc".into()), Err(ConfigError::PortNotInteger("abc".into())))]
    #[case(PortValue::Float(8088.5), Err(ConfigError::PortNotInteger("8088.5".into())))]
    fn ports_are_validated(#[case] value: PortValue, #[case] expected: Result<u16, ConfigError>) {
        assert_eq!(parse_port(&value), expected);
    }
}

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use accounts_statements::{DEFAULT_KEY_PREFIX, StatementsProperties};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub transactions_api_url: reqwest::Url,
    pub data_api_url: reqwest::Url,
    pub upstream_timeout_ms: u64,
    pub statements: StatementsProperties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StartupError {}

impl ApiConfig {
    pub fn load() -> Result<Self, StartupError> {
        let mut merged = HashMap::new();

        if let Ok(config_path) = std::env::var("ACCOUNTS_CONFIG_PATH") {
            let config_path = config_path.trim();
            if !config_path.is_empty() {
                let file_kv = parse_env_file(config_path)?;
                merged.extend(file_kv);
            }
        }

        merged.extend(std::env::vars());

        Self::from_kv(&merged)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, StartupError> {
        let bind_addr = parse_socket_addr(
            kv.get("ACCOUNTS_BIND_ADDR"),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            "ACCOUNTS_BIND_ADDR",
        )?;

        let transactions_api_url = parse_base_url(
            &require_nonempty(kv, "ACCOUNTS_TRANSACTIONS_API_URL")?,
            "ACCOUNTS_TRANSACTIONS_API_URL",
        )?;
        let data_api_url = parse_base_url(
            &require_nonempty(kv, "ACCOUNTS_DATA_API_URL")?,
            "ACCOUNTS_DATA_API_URL",
        )?;

        let upstream_timeout_ms = parse_u64(
            kv.get("ACCOUNTS_UPSTREAM_TIMEOUT_MS"),
            2000,
            "ACCOUNTS_UPSTREAM_TIMEOUT_MS",
        )?;
        if !(1..=60_000).contains(&upstream_timeout_ms) {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "ACCOUNTS_UPSTREAM_TIMEOUT_MS must be between 1 and 60000".to_string(),
            });
        }

        let statements = StatementsProperties::from_kv(kv, DEFAULT_KEY_PREFIX);
        let require_statements =
            parse_bool(kv.get("ACCOUNTS_REQUIRE_STATEMENTS")).unwrap_or(false);
        if require_statements && statements.is_empty() {
            return Err(StartupError {
                code: "ERR_MISSING_CONFIG",
                message: format!(
                    "ACCOUNTS_REQUIRE_STATEMENTS is set but no {}* keys are configured",
                    DEFAULT_KEY_PREFIX
                ),
            });
        }

        Ok(Self {
            bind_addr,
            transactions_api_url,
            data_api_url,
            upstream_timeout_ms,
            statements,
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

fn parse_env_file(path: &str) -> Result<HashMap<String, String>, StartupError> {
    let contents = std::fs::read_to_string(path).map_err(|_| StartupError {
        code: "ERR_CONFIG_FILE_READ",
        message: format!("failed to read config file at {}", path),
    })?;

    parse_env_contents(&contents)
}

fn parse_env_contents(contents: &str) -> Result<HashMap<String, String>, StartupError> {
    let mut kv = HashMap::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| StartupError {
            code: "ERR_CONFIG_FILE_PARSE",
            message: format!("invalid config line {} (expected KEY=VALUE)", idx + 1),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(StartupError {
                code: "ERR_CONFIG_FILE_PARSE",
                message: format!("invalid config line {} (empty key)", idx + 1),
            });
        }

        kv.insert(key.to_string(), strip_quotes(value.trim()));
    }

    Ok(kv)
}

fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..bytes.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn require_nonempty(
    kv: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, StartupError> {
    let value = kv
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StartupError {
            code: "ERR_MISSING_CONFIG",
            message: format!("missing required config key {}", key),
        })?;

    Ok(value.to_string())
}

fn parse_socket_addr(
    value: Option<&String>,
    default: SocketAddr,
    key: &'static str,
) -> Result<SocketAddr, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse::<SocketAddr>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be a valid host:port socket address", key),
        }),
    }
}

/// Upstream bases must be http(s) URLs that path segments can be pushed onto.
fn parse_base_url(value: &str, key: &'static str) -> Result<reqwest::Url, StartupError> {
    let invalid = || StartupError {
        code: "ERR_INVALID_CONFIG",
        message: format!("{} must be an absolute http(s) URL", key),
    };

    let url = reqwest::Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must not carry a query or fragment", key),
        });
    }

    Ok(url)
}

fn parse_u64(value: Option<&String>, default: u64, key: &'static str) -> Result<u64, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse::<u64>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_bool(value: Option<&String>) -> Option<bool> {
    let value = value.map(|v| v.trim()).filter(|v| !v.is_empty())?;

    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_ok_env() -> HashMap<String, String> {
        HashMap::from([
            (
                "ACCOUNTS_TRANSACTIONS_API_URL".to_string(),
                "http://localhost:18080".to_string(),
            ),
            (
                "ACCOUNTS_DATA_API_URL".to_string(),
                "http://localhost:18081".to_string(),
            ),
        ])
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = ApiConfig::from_kv(&minimal_ok_env()).expect("config should load");

        assert_eq!(
            cfg.bind_addr,
            "127.0.0.1:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(cfg.transactions_api_url.as_str(), "http://localhost:18080/");
        assert_eq!(cfg.upstream_timeout_ms, 2000);
        assert_eq!(cfg.upstream_timeout(), Duration::from_secs(2));
        assert!(cfg.statements.is_empty());
    }

    #[test]
    fn missing_transactions_api_url_fails() {
        let mut env = minimal_ok_env();
        env.insert("ACCOUNTS_TRANSACTIONS_API_URL".to_string(), "  ".to_string());
        let err = ApiConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_MISSING_CONFIG");
        assert!(err.message.contains("ACCOUNTS_TRANSACTIONS_API_URL"));
    }

    #[test]
    fn upstream_urls_must_be_absolute_http_urls() {
        for bad in ["localhost:18080", "ftp://localhost/", "mailto:ops@example.com"] {
            let mut env = minimal_ok_env();
            env.insert("ACCOUNTS_DATA_API_URL".to_string(), bad.to_string());
            let err = ApiConfig::from_kv(&env).unwrap_err();
            assert_eq!(err.code, "ERR_INVALID_CONFIG", "{bad}");
            assert!(err.message.contains("ACCOUNTS_DATA_API_URL"));
        }

        let mut env = minimal_ok_env();
        env.insert(
            "ACCOUNTS_TRANSACTIONS_API_URL".to_string(),
            "http://localhost:18080/?token=x".to_string(),
        );
        let err = ApiConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let mut env = minimal_ok_env();
        env.insert("ACCOUNTS_BIND_ADDR".to_string(), "not-an-addr".to_string());
        let err = ApiConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }

    #[test]
    fn out_of_range_upstream_timeout_fails() {
        let mut env = minimal_ok_env();
        env.insert("ACCOUNTS_UPSTREAM_TIMEOUT_MS".to_string(), "0".to_string());
        let err = ApiConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }

    #[test]
    fn statements_are_collected_from_prefixed_keys() {
        let mut env = minimal_ok_env();
        env.insert(
            "ACCOUNTS_STATEMENTS_SECTION_477".to_string(),
            "exempt for the year ending {period_end_on}".to_string(),
        );
        env.insert("ACCOUNTS_REQUIRE_STATEMENTS".to_string(), "true".to_string());

        let cfg = ApiConfig::from_kv(&env).expect("config should load");
        let copy = cfg.statements.statements_copy();
        assert_eq!(
            copy.get("section_477").map(String::as_str),
            Some("exempt for the year ending {period_end_on}")
        );
    }

    #[test]
    fn required_statements_without_any_fails() {
        let mut env = minimal_ok_env();
        env.insert("ACCOUNTS_REQUIRE_STATEMENTS".to_string(), "yes".to_string());
        let err = ApiConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_MISSING_CONFIG");
    }

    #[test]
    fn env_file_contents_parse_comments_and_quotes() {
        let kv = parse_env_contents(
            "# comment\n\nACCOUNTS_BIND_ADDR = \"127.0.0.1:9000\"\nACCOUNTS_STATEMENTS_A='text a'\n",
        )
        .expect("contents should parse");

        assert_eq!(
            kv.get("ACCOUNTS_BIND_ADDR").map(String::as_str),
            Some("127.0.0.1:9000")
        );
        assert_eq!(
            kv.get("ACCOUNTS_STATEMENTS_A").map(String::as_str),
            Some("text a")
        );
    }

    #[test]
    fn env_file_line_without_separator_fails() {
        let err = parse_env_contents("ACCOUNTS_BIND_ADDR\n").unwrap_err();
        assert_eq!(err.code, "ERR_CONFIG_FILE_PARSE");
        assert!(err.message.contains("line 1"));
    }
}

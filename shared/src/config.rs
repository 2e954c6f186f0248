use std::time::Duration;
use tracing::warn;

/// Where cache entries and request records are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Sled(String), // data directory
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub storage: StorageBackend,
    pub cache_ttl: Option<Duration>, // None = entries never expire
    pub fibonacci_max_n: u64,
    pub factorial_max_n: u64,
    pub magnitude_ceiling: f64,
    pub allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8000;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
    pub const DEFAULT_FIBONACCI_MAX_N: u64 = 1000;
    pub const DEFAULT_FACTORIAL_MAX_N: u64 = 170;
    pub const DEFAULT_MAGNITUDE_CEILING: f64 = 1e308;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir =
            lookup("ABACUS_DATA_DIR").unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string());

        let storage = match lookup("ABACUS_STORAGE")
            .unwrap_or_else(|| "sled".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "sled" => StorageBackend::Sled(data_dir),
            other => {
                warn!("Unknown ABACUS_STORAGE '{}', using sled", other);
                StorageBackend::Sled(data_dir)
            }
        };

        let ttl_secs = parse_or(&lookup, "ABACUS_CACHE_TTL_SECS", Self::DEFAULT_CACHE_TTL_SECS);

        let log_format = match lookup("ABACUS_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            host: lookup("ABACUS_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&lookup, "ABACUS_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            storage,
            cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            fibonacci_max_n: parse_or(
                &lookup,
                "ABACUS_FIBONACCI_MAX_N",
                Self::DEFAULT_FIBONACCI_MAX_N,
            ),
            factorial_max_n: parse_or(
                &lookup,
                "ABACUS_FACTORIAL_MAX_N",
                Self::DEFAULT_FACTORIAL_MAX_N,
            ),
            magnitude_ceiling: magnitude_ceiling(&lookup),
            allowed_origins: lookup("ABACUS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_format,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// The ceiling bounds every computation, so it must be finite and positive.
fn magnitude_ceiling(lookup: &impl Fn(&str) -> Option<String>) -> f64 {
    let name = "ABACUS_MAGNITUDE_CEILING";
    let ceiling = parse_or(lookup, name, Config::DEFAULT_MAGNITUDE_CEILING);
    if ceiling.is_finite() && ceiling > 0.0 {
        ceiling
    } else {
        warn!("Invalid value '{}' for {}, using default", ceiling, name);
        Config::DEFAULT_MAGNITUDE_CEILING
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using default", raw, name);
            default
        }),
        None => default,
    }
}

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::matching::scoring::{MatchingConfig, ScoringConfigError};
use crate::matching::DEFAULT_BATCH_CONCURRENCY;

/// Deployment stage the process runs in; only affects logging context today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Local,
    Ci,
    Live,
}

impl Stage {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" | "prod" | "production" => Self::Live,
            "ci" | "test" => Self::Ci,
            _ => Self::Local,
        }
    }
}

/// Everything the binaries read from the environment (and an optional `.env` file).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub stage: Stage,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub matching: MatchingSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            stage: Stage::parse(&var_or("RAILMATCH_STAGE", "local")),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: var_or("RAILMATCH_LOG", "info"),
            },
            matching: MatchingSettings::from_env()?,
        })
    }
}

fn var_or(name: &str, fallback: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Listener address for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_port = var_or("RAILMATCH_PORT", "8080");
        let port = match raw_port.trim().parse::<u16>() {
            Ok(port) => port,
            Err(_) => return Err(ConfigError::InvalidPort(raw_port)),
        };
        Ok(Self {
            host: var_or("RAILMATCH_HOST", "127.0.0.1"),
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost {
                    host: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// `EnvFilter` directives used when `RUST_LOG` is unset.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the scoring rubric comes from and how wide batch recomputation runs.
#[derive(Debug, Clone)]
pub struct MatchingSettings {
    /// JSON document with a full [`MatchingConfig`]; the reference tuning when absent.
    pub config_path: Option<PathBuf>,
    pub batch_concurrency: usize,
}

impl MatchingSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let config_path = env::var_os("MATCHING_CONFIG_PATH")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let batch_concurrency = match env::var("MATCHING_BATCH_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(workers) if workers > 0 => workers,
                _ => return Err(ConfigError::InvalidConcurrency(raw)),
            },
            Err(_) => DEFAULT_BATCH_CONCURRENCY,
        };
        Ok(Self {
            config_path,
            batch_concurrency,
        })
    }

    pub fn load_matching_config(&self) -> Result<MatchingConfig, ConfigError> {
        match &self.config_path {
            Some(path) => load_matching_config(path),
            None => Ok(MatchingConfig::default()),
        }
    }
}

/// Read and validate a matching configuration document.
pub fn load_matching_config(path: &Path) -> Result<MatchingConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::MatchingFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config: MatchingConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::MatchingFormat {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate().map_err(ConfigError::Matching)?;
    Ok(config)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(String),
    InvalidHost {
        host: String,
        source: std::net::AddrParseError,
    },
    InvalidConcurrency(String),
    MatchingFile {
        path: PathBuf,
        source: std::io::Error,
    },
    MatchingFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
    Matching(ScoringConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort(raw) => {
                write!(f, "RAILMATCH_PORT '{raw}' is not a port number")
            }
            ConfigError::InvalidHost { host, .. } => {
                write!(f, "RAILMATCH_HOST '{host}' is not an IP address or localhost")
            }
            ConfigError::InvalidConcurrency(raw) => write!(
                f,
                "MATCHING_BATCH_CONCURRENCY '{raw}' must be a positive integer"
            ),
            ConfigError::MatchingFile { path, .. } => {
                write!(f, "cannot read matching config {}", path.display())
            }
            ConfigError::MatchingFormat { path, source } => {
                write!(f, "matching config {} is malformed: {source}", path.display())
            }
            ConfigError::Matching(err) => write!(f, "invalid matching config: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort(_) | ConfigError::InvalidConcurrency(_) => None,
            ConfigError::InvalidHost { source, .. } => Some(source),
            ConfigError::MatchingFile { source, .. } => Some(source),
            ConfigError::MatchingFormat { source, .. } => Some(source),
            ConfigError::Matching(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    const VARS: [&str; 6] = [
        "RAILMATCH_STAGE",
        "RAILMATCH_HOST",
        "RAILMATCH_PORT",
        "RAILMATCH_LOG",
        "MATCHING_CONFIG_PATH",
        "MATCHING_BATCH_CONCURRENCY",
    ];

    fn reset_env() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("railmatch-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write scratch file");
        path
    }

    #[test]
    fn falls_back_to_local_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.stage, Stage::Local);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.matching.batch_concurrency, DEFAULT_BATCH_CONCURRENCY);
        assert_eq!(
            config
                .matching
                .load_matching_config()
                .expect("reference config"),
            MatchingConfig::default()
        );
    }

    #[test]
    fn localhost_binds_loopback() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RAILMATCH_HOST", "localhost");
        env::set_var("RAILMATCH_PORT", "9100");
        env::set_var("RAILMATCH_STAGE", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.stage, Stage::Live);
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 9100));
        reset_env();
    }

    #[test]
    fn unparseable_port_is_reported_verbatim() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RAILMATCH_PORT", "eighty");
        let error = AppConfig::load().expect_err("port is invalid");
        assert!(error.to_string().contains("eighty"));
        reset_env();
    }

    #[test]
    fn rejects_zero_batch_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCHING_BATCH_CONCURRENCY", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidConcurrency(_))
        ));
        reset_env();
    }

    #[test]
    fn loads_matching_config_from_json() {
        let mut tuned = MatchingConfig::default();
        tuned.min_score_threshold = 0.7;
        tuned.price_tolerance_percentage = 10.0;
        let path = scratch_file(
            "tuned.json",
            &serde_json::to_string(&tuned).expect("serialize config"),
        );

        let loaded = load_matching_config(&path).expect("config loads");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, tuned);
    }

    #[test]
    fn rejects_matching_config_with_bad_weights() {
        let mut broken = MatchingConfig::default();
        broken.weights.price_match = 0.5;
        let path = scratch_file(
            "broken.json",
            &serde_json::to_string(&broken).expect("serialize config"),
        );

        let result = load_matching_config(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Matching(_))));
    }

    #[test]
    fn reports_missing_matching_config_file() {
        let result = load_matching_config(Path::new("/nonexistent/railmatch.json"));
        assert!(matches!(result, Err(ConfigError::MatchingFile { .. })));
    }
}

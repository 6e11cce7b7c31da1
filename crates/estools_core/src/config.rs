use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::ElasticClientConfig;

pub const DEFAULT_SRC_ADDR: &str = "http://localhost:9200";
pub const DEFAULT_DEST_ADDR: &str = "http://localhost:9201";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_USER_AGENT: &str = concat!("estools/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CONFIG_FILENAME: &str = "estools.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct EstoolsConfig {
    #[serde(default)]
    pub source: ClusterSection,
    #[serde(default)]
    pub destination: ClusterSection,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ClusterSection {
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HttpSection {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressOverrides {
    pub src_addr: Option<String>,
    pub dest_addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub src_addr: String,
    pub src_addr_source: ValueSource,
    pub dest_addr: String,
    pub dest_addr_source: ValueSource,
    pub http: ElasticClientConfig,
}

impl ResolvedConnection {
    pub fn diagnostics(&self) -> String {
        format!(
            "src_addr={} ({})\ndest_addr={} ({})\ntimeout_ms={}\nuser_agent={}",
            self.src_addr,
            self.src_addr_source.as_str(),
            self.dest_addr,
            self.dest_addr_source.as_str(),
            self.http.timeout_ms,
            self.http.user_agent
        )
    }
}

/// Load and parse an EstoolsConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<EstoolsConfig> {
    if !config_path.exists() {
        return Ok(EstoolsConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: EstoolsConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Explicit `--config` wins; otherwise `estools.toml` in the working directory.
pub fn config_path(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.join(DEFAULT_CONFIG_FILENAME),
    }
}

pub fn resolve_connection_from_process(
    config: &EstoolsConfig,
    overrides: &AddressOverrides,
) -> ResolvedConnection {
    resolve_connection(config, overrides, |key| env::var(key).ok())
}

/// Resolve connection values: flag > env > config > default.
pub fn resolve_connection<F>(
    config: &EstoolsConfig,
    overrides: &AddressOverrides,
    env_lookup: F,
) -> ResolvedConnection
where
    F: Fn(&str) -> Option<String>,
{
    let (src_addr, src_addr_source) = resolve_value(
        overrides.src_addr.as_deref(),
        env_lookup("ESTOOLS_SRC_ADDR"),
        config.source.addr.as_deref(),
        DEFAULT_SRC_ADDR,
    );
    let (dest_addr, dest_addr_source) = resolve_value(
        overrides.dest_addr.as_deref(),
        env_lookup("ESTOOLS_DEST_ADDR"),
        config.destination.addr.as_deref(),
        DEFAULT_DEST_ADDR,
    );

    let timeout_ms = env_lookup("ESTOOLS_HTTP_TIMEOUT_MS")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .or(config.http.timeout_ms)
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    let (user_agent, _) = resolve_value(
        None,
        env_lookup("ESTOOLS_USER_AGENT"),
        config.http.user_agent.as_deref(),
        DEFAULT_USER_AGENT,
    );

    ResolvedConnection {
        src_addr,
        src_addr_source,
        dest_addr,
        dest_addr_source,
        http: ElasticClientConfig {
            timeout_ms,
            user_agent,
        },
    }
}

fn resolve_value(
    flag: Option<&str>,
    env: Option<String>,
    config: Option<&str>,
    default: &str,
) -> (String, ValueSource) {
    if let Some(value) = non_blank(flag) {
        return (value, ValueSource::Flag);
    }
    if let Some(value) = non_blank(env.as_deref()) {
        return (value, ValueSource::Env);
    }
    if let Some(value) = non_blank(config) {
        return (value, ValueSource::Config);
    }
    (default.to_string(), ValueSource::Default)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

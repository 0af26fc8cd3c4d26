//! Shared configuration for campus tools.
//!
//! TOML profiles merged with `CAMPUS_*` environment variables, and
//! translation to `campus_core::ClientConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use campus_core::{CacheConfig, ClientConfig, Service, ServiceEndpoints, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no service endpoints configured for profile '{profile}'")]
    NoEndpoints { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Gateway override for the active profile, from `CAMPUS_GATEWAY`.
    /// Never written back to the file.
    #[serde(default, skip_serializing)]
    pub gateway: Option<String>,

    /// Per-service overrides for the active profile, from
    /// `CAMPUS_SERVICES__<SERVICE>`. Never written back to the file.
    #[serde(default, skip_serializing)]
    pub services: BTreeMap<Service, String>,

    /// Named deployment profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            gateway: None,
            services: BTreeMap::new(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: the explicit one, else the default.
    pub fn active_profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds a successful read stays fresh.
    #[serde(default = "default_stale_time")]
    pub stale_time: u64,

    /// Automatic retries after a failed read.
    #[serde(default = "default_retry")]
    pub retry: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            stale_time: default_stale_time(),
            retry: default_retry(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_stale_time() -> u64 {
    300
}
fn default_retry() -> u32 {
    1
}

/// A named deployment: where the services live and how to reach them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API gateway base URL serving every service not listed in `services`.
    pub gateway: Option<String>,

    /// Base URL per service, e.g. `fees = "http://fees.school.internal:8080"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<Service, String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override stale time.
    pub stale_time: Option<u64>,

    /// Override retry count.
    pub retry: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "campus", "campus").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("campus");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing files are skipped) + environment.
///
/// Environment keys use the `CAMPUS_` prefix with `__` for nesting:
/// `CAMPUS_SERVICES__FEES=http://fees:8080`, `CAMPUS_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMPUS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load the canonical file alone, for editing and saving back.
pub fn load_file_config() -> Result<Config, ConfigError> {
    load_file_config_from(&config_path())
}

/// Load `path` over the defaults without the environment layer.
pub fn load_file_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to the client config ────────────────────────────────

/// Build a `ClientConfig` for `profile`, applying the top-level
/// overrides and global defaults. No CLI flags.
pub fn profile_to_client_config(
    config: &Config,
    profile: &Profile,
    profile_name: &str,
) -> Result<ClientConfig, ConfigError> {
    let gateway = config
        .gateway
        .as_deref()
        .or(profile.gateway.as_deref())
        .map(|raw| parse_url("gateway", raw))
        .transpose()?;

    let mut services = profile.services.clone();
    services.extend(config.services.iter().map(|(k, v)| (*k, v.clone())));

    let mut endpoints = ServiceEndpoints {
        gateway,
        ..ServiceEndpoints::default()
    };
    for (service, raw) in &services {
        let url = parse_url(&format!("services.{service}"), raw)?;
        endpoints = endpoints.with_service(*service, url);
    }
    if endpoints.is_empty() {
        return Err(ConfigError::NoEndpoints {
            profile: profile_name.into(),
        });
    }

    let defaults = &config.defaults;
    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let cache = CacheConfig {
        stale_time: Duration::from_secs(profile.stale_time.unwrap_or(defaults.stale_time)),
        retry: profile.retry.unwrap_or(defaults.retry),
        request_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        ..CacheConfig::default()
    };

    Ok(ClientConfig {
        endpoints,
        cache,
        tls,
    })
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("'{raw}' is not a base URL"),
        });
    }
    Ok(url)
}

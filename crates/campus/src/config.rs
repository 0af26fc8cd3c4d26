//! CLI configuration: thin wrapper around `campus_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--gateway, --insecure, --timeout).

use std::time::Duration;

use campus_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use campus_config::{
    Config, ConfigError, Profile, config_path, load_config, load_file_config, save_config,
};

/// Build a `ClientConfig` from the config file, profile, environment and flags.
///
/// Without a matching profile the top-level `gateway`/`services` entries
/// (usually from `CAMPUS_*` variables or `--gateway`) must resolve on their own.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let mut cfg = load_config()?;
    if let Some(ref gateway) = global.gateway {
        cfg.gateway = Some(gateway.clone());
    }

    let name = cfg.active_profile_name(global.profile.as_deref()).to_owned();
    let profile = match cfg.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    let mut client = match campus_config::profile_to_client_config(&cfg, &profile, &name) {
        Ok(client) => client,
        Err(ConfigError::NoEndpoints { .. }) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.cache.request_timeout = Duration::from_secs(secs);
    }
    Ok(client)
}

//! Config subcommand handlers.

use std::collections::BTreeMap;

use dialoguer::{Confirm, Input};
use strum::IntoEnumIterator;

use campus_core::Service;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn validate_url(input: &str) -> Result<(), String> {
    if input.is_empty() {
        return Ok(());
    }
    match url::Url::parse(input) {
        Ok(url) if !url.cannot_be_a_base() => Ok(()),
        Ok(_) => Err("not a base URL".into()),
        Err(e) => Err(format!("invalid URL: {e}")),
    }
}

fn prompt_url(prompt: &str) -> Result<Option<String>, CliError> {
    let raw: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .validate_with(|input: &String| validate_url(input))
        .interact_text()
        .map_err(prompt_err)?;
    Ok((!raw.is_empty()).then_some(raw))
}

fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool, CliError> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(prompt_err)
}

/// Interactive wizard: one profile, gateway and/or per-service URLs.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("campus configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let gateway = prompt_url("Gateway URL (empty to configure services one by one)")?;

    let mut services = BTreeMap::new();
    let per_service = gateway.is_none()
        || prompt_yes_no("Override individual service URLs?", false)?;
    if per_service {
        for service in Service::iter() {
            if let Some(url) = prompt_url(&format!("{service} URL (empty to skip)"))? {
                services.insert(service, url);
            }
        }
    }
    if gateway.is_none() && services.is_empty() {
        return Err(CliError::Validation {
            field: "endpoints".into(),
            reason: "a gateway or at least one service URL is required".into(),
        });
    }

    let insecure = prompt_yes_no("Accept self-signed TLS certificates?", false)?;

    let mut cfg = config::load_file_config()?;
    let make_default = cfg.profiles.is_empty()
        || prompt_yes_no(&format!("Make '{profile_name}' the default profile?"), true)?;
    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            gateway,
            services,
            insecure: insecure.then_some(true),
            ..Profile::default()
        },
    );
    if make_default {
        cfg.default_profile = Some(profile_name.clone());
    }

    let path = config::save_config(&cfg)?;
    eprintln!("\n   Profile '{profile_name}' saved to {}", path.display());
    eprintln!("   Try: campus resources");
    Ok(())
}

fn show(cfg: &Config, format: OutputFormat) -> Result<String, CliError> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(cfg)?,
        OutputFormat::JsonCompact => serde_json::to_string(cfg)?,
        OutputFormat::Yaml => output::render_yaml(cfg),
        OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(cfg)
            .map_err(|e| CliError::Config(config::ConfigError::Serialization(e)))?,
    };
    Ok(out)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = show(&cfg, global.output)?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

//! Shared helpers for command handlers.

use std::io::IsTerminal;

use serde_json::Value;

use campus_core::Filters;

use crate::cli::BodyArgs;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse the request body from `--data` or `--file`. Bodies must be JSON objects.
pub fn read_body(body: &BodyArgs) -> Result<Value, CliError> {
    let (field, raw) = match (&body.data, &body.file) {
        (Some(data), _) => ("data", data.clone()),
        (None, Some(path)) => ("file", std::fs::read_to_string(path)?),
        (None, None) => {
            return Err(CliError::Validation {
                field: "data".into(),
                reason: "pass --data or --file".into(),
            });
        }
    };
    let value: Value = serde_json::from_str(&raw)?;
    if !value.is_object() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "body must be a JSON object".into(),
        });
    }
    Ok(value)
}

pub fn to_filters(pairs: Vec<(String, Value)>) -> Filters {
    let mut filters = Filters::new();
    for (key, value) in pairs {
        filters.insert(key, value);
    }
    filters
}

//! `campus resources`: the resource catalogue as this profile sees it.

use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;

use campus_core::{InvalidationRules, ResourceKind, ServiceEndpoints};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Serialize, Tabled)]
struct ResourceRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Invalidates")]
    #[serde(serialize_with = "as_list")]
    invalidates: String,
}

fn as_list<S: serde::Serializer>(joined: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(joined.split(", ").filter(|s| !s.is_empty()))
}

fn rows(endpoints: &ServiceEndpoints, rules: &InvalidationRules) -> Vec<ResourceRow> {
    ResourceKind::iter()
        .map(|kind| {
            let related: Vec<&str> = rules
                .targets(kind)
                .into_iter()
                .filter(|k| *k != kind)
                .map(ResourceKind::as_str)
                .collect();
            ResourceRow {
                kind: kind.as_str().to_owned(),
                service: kind.service().to_string(),
                endpoint: endpoints
                    .collection_url(kind)
                    .map_or_else(|| "-".into(), String::from),
                invalidates: related.join(", "),
            }
        })
        .collect()
}

/// Works without configuration; endpoints then show as `-`.
pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let endpoints = match config::build_client_config(global) {
        Ok(client) => client.endpoints,
        Err(CliError::NoConfig { .. }) => ServiceEndpoints::default(),
        Err(e) => return Err(e),
    };
    let data = rows(&endpoints, &InvalidationRules::default());
    let out = output::render_list(global.output, &data, ResourceRow::clone, |r| r.kind.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

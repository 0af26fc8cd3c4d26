//! `campus watch`: subscribe to a list and print every state change.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::{Instant, interval_at};

use campus_core::{Payload, Query, QueryClient, QueryOptions, QueryState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// One state change, as printed for structured formats.
#[derive(Debug, Serialize)]
struct WatchEvent<'a> {
    at: DateTime<Utc>,
    status: String,
    is_fetching: bool,
    is_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> WatchEvent<'a> {
    fn new(state: &'a QueryState) -> Self {
        let page = state.data.as_deref().and_then(Payload::as_list);
        Self {
            at: Utc::now(),
            status: state.status.to_string(),
            is_fetching: state.is_fetching,
            is_stale: state.is_stale,
            total: page.map(|p| p.total),
            items: page.map(|p| p.items.as_slice()),
            error: state.error.as_ref().map(ToString::to_string),
        }
    }
}

pub async fn handle(
    client: &QueryClient,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let kind = args.list.kind;
    let query = Query::list(kind, util::to_filters(args.list.filters));
    let mut handle = client.watch(query, QueryOptions::default());
    let mut printer = Printer::new(global);
    printer.show(&handle.state());

    let mut ticks = interval_at(Instant::now() + args.interval, args.interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = handle.changed() => {
                let Some(state) = changed else { break };
                printer.show(&state);
            }
            _ = ticks.tick() => {
                let invalidation = client.invalidate_resource(kind);
                tracing::debug!(resource = %kind, refetching = invalidation.refetch.len(), "interval invalidation");
            }
            _ = &mut ctrl_c => break,
        }
    }
    Ok(())
}

/// Prints state changes; tables and ids only when the data itself changed.
struct Printer {
    format: OutputFormat,
    quiet: bool,
    color: bool,
    last_data: Option<Arc<Payload>>,
}

impl Printer {
    fn new(global: &GlobalOpts) -> Self {
        Self {
            format: global.output,
            quiet: global.quiet,
            color: output::should_color(global.color),
            last_data: None,
        }
    }

    fn show(&mut self, state: &QueryState) {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
                let event = WatchEvent::new(state);
                let out = match self.format {
                    OutputFormat::Yaml => format!("---\n{}", output::render_yaml(&event)),
                    OutputFormat::Json => serde_json::to_string_pretty(&event).unwrap_or_default(),
                    _ => serde_json::to_string(&event).unwrap_or_default(),
                };
                output::print_output(out.trim_end(), self.quiet);
            }
            OutputFormat::Table | OutputFormat::Plain => {
                if !self.quiet {
                    eprintln!("{}", self.status_line(state));
                }
                if state.is_fetching || state.data == self.last_data {
                    return;
                }
                self.last_data.clone_from(&state.data);
                if let Some(page) = state.data.as_deref().and_then(Payload::as_list) {
                    let out = output::render_records(self.format, &page.items);
                    output::print_output(&out, self.quiet);
                }
            }
        }
    }

    fn status_line(&self, state: &QueryState) -> String {
        let now = Local::now().format("%H:%M:%S");
        let mut line = format!(
            "{now} {}",
            output::paint_status(&state.status.to_string(), self.color)
        );
        if state.is_fetching {
            line.push_str(" (fetching)");
        }
        if let Some(page) = state.data.as_deref().and_then(Payload::as_list) {
            line.push_str(&format!(" {} items", page.total));
        }
        if let Some(ref err) = state.error {
            line.push_str(&format!(": {err}"));
        }
        line
    }
}

//! Record handlers: list, get, create, update, delete.

use std::sync::Arc;

use serde_json::Value;

use campus_core::{Payload, QueryClient, ResourceKind};

use crate::cli::{BodyArgs, GlobalOpts, ListArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn list(
    client: &QueryClient,
    args: ListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let filters = util::to_filters(args.filters);
    let payload = client.resource(args.kind).list(filters).await?;
    print_payload(&payload, global);

    if let Some(page) = payload.as_list() {
        let shown = u64::try_from(page.items.len()).unwrap_or(u64::MAX);
        if page.total > shown && !global.quiet {
            eprintln!("showing {shown} of {} {}", page.total, args.kind);
        }
    }
    Ok(())
}

pub async fn get(
    client: &QueryClient,
    kind: ResourceKind,
    id: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let payload = client
        .resource(kind)
        .get(id)
        .await
        .map_err(|e| CliError::for_record(e, kind, id))?;
    print_payload(&payload, global);
    Ok(())
}

pub async fn create(
    client: &QueryClient,
    kind: ResourceKind,
    body: &BodyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let payload = util::read_body(body)?;
    let response = client.resource(kind).create(payload).await?;
    print_response(response.as_ref(), kind, "created", global);
    Ok(())
}

pub async fn update(
    client: &QueryClient,
    kind: ResourceKind,
    id: &str,
    body: &BodyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let payload = util::read_body(body)?;
    let response = client
        .resource(kind)
        .update(id, payload)
        .await
        .map_err(|e| CliError::for_record(e, kind, id))?;
    print_response(response.as_ref(), kind, "updated", global);
    Ok(())
}

pub async fn delete(
    client: &QueryClient,
    kind: ResourceKind,
    id: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !util::confirm(&format!("Delete {kind} '{id}'?"), global.yes)? {
        if !global.quiet {
            eprintln!("aborted");
        }
        return Ok(());
    }
    client
        .resource(kind)
        .delete(id)
        .await
        .map_err(|e| CliError::for_record(e, kind, id))?;
    if !global.quiet {
        eprintln!("{kind} '{id}' deleted");
    }
    Ok(())
}

fn print_payload(payload: &Arc<Payload>, global: &GlobalOpts) {
    let out = match payload.as_ref() {
        Payload::List(page) => output::render_records(global.output, &page.items),
        Payload::Item(item) => output::render_record(global.output, item),
    };
    output::print_output(&out, global.quiet);
}

fn print_response(response: Option<&Value>, kind: ResourceKind, verb: &str, global: &GlobalOpts) {
    match response {
        Some(item) if !item.is_null() => {
            let out = output::render_record(global.output, item);
            output::print_output(&out, global.quiet);
        }
        _ => {
            if !global.quiet {
                eprintln!("{kind} {verb}");
            }
        }
    }
}

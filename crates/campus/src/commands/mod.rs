//! Command dispatch: bridges CLI args -> cache operations -> output formatting.

pub mod catalog;
pub mod config_cmd;
pub mod records;
pub mod util;
pub mod watch;

use campus_core::QueryClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &QueryClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => records::list(client, args, global).await,
        Command::Get { kind, id } => records::get(client, kind, &id, global).await,
        Command::Create { kind, body } => records::create(client, kind, &body, global).await,
        Command::Update { kind, id, body } => {
            records::update(client, kind, &id, &body, global).await
        }
        Command::Delete { kind, id } => records::delete(client, kind, &id, global).await,
        Command::Watch(args) => watch::handle(client, args, global).await,
        // Handled before a client is built
        Command::Resources | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

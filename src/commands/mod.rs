mod clean;
mod key;
mod ls;
mod put;
mod read;
mod rotate;
mod shred;

use crate::app::AppContext;
use crate::client::{ClientOperator, Session};
use crate::{cli, exit_codes};
use std::process::ExitCode;

pub fn dispatch(command: cli::Commands, ctx: &AppContext) -> ExitCode {
    match command {
        cli::Commands::Ls => ls::run(ctx),
        cli::Commands::Read(args) => read::run(args, ctx),
        cli::Commands::Put(args) => put::run(args, ctx),
        cli::Commands::Shred(args) => shred::run(args, ctx),
        cli::Commands::Clean => clean::run(ctx),
        cli::Commands::RotateKeys => rotate::run(ctx),
        cli::Commands::ExportKey(args) => key::run(args, ctx),
    }
}

/// Open the session for a command, translating failures into the exit code
/// the caller should return.
fn open_session(ctx: &AppContext) -> Result<(Session, ClientOperator), ExitCode> {
    Session::open(ctx.settings_dir.clone(), &ctx.store_dir).map_err(|error| {
        eprintln!("Error: {error}");
        exit_codes::exit_code_for_session_error(&error)
    })
}

/// Persist the session after a state-changing command.
fn save_session(session: &Session, operator: &mut ClientOperator) -> Result<(), ExitCode> {
    session.save(operator).map_err(|error| {
        eprintln!("Error: {error}");
        exit_codes::exit_code_for_session_error(&error)
    })
}

use crate::client::session;
use crate::{cli, commands, exit_codes, output};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

pub struct AppContext {
    pub output: output::OutputMode,
    pub settings_dir: PathBuf,
    pub store_dir: PathBuf,
}

pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();

    let Some(command) = cli.command else {
        let mut cmd = cli::Cli::command();
        cmd.print_help().expect("help to be printed");
        println!();
        return ExitCode::from(exit_codes::EXIT_USAGE);
    };

    let settings_dir = match session::settings_dir(cli.settings_dir.as_deref()) {
        Ok(dir) => dir,
        Err(error) => {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_session_error(&error);
        }
    };
    let store_dir = match session::store_dir(cli.store_dir.as_deref()) {
        Ok(dir) => dir,
        Err(error) => {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_session_error(&error);
        }
    };

    let ctx = AppContext {
        output: output::OutputMode { json: cli.json },
        settings_dir,
        store_dir,
    };
    commands::dispatch(command, &ctx)
}

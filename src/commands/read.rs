use crate::app::AppContext;
use crate::{cli, exit_codes, output};
use serde_json::json;
use std::process::ExitCode;

pub fn run(args: cli::ReadArgs, ctx: &AppContext) -> ExitCode {
    let (_session, mut operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    if !operator.exists_path(&args.path) {
        eprintln!("Error: no cloud file at {}", args.path.display());
        return ExitCode::from(exit_codes::EXIT_USAGE);
    }
    let id = match operator.get_id(&args.path) {
        Ok(id) => id,
        Err(error) => {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_operator_error(&error);
        }
    };

    match operator.get(&id) {
        Ok(content) => output::print_value(
            String::from_utf8_lossy(&content).into_owned(),
            json!({
                "kind": "read",
                "path": args.path.display().to_string(),
                "bytes": content.len(),
            }),
            &ctx.output,
        ),
        Err(error) => {
            eprintln!("Error: {error}");
            exit_codes::exit_code_for_operator_error(&error)
        }
    }
}

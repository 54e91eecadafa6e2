use crate::app::AppContext;
use crate::{cli, exit_codes, output};
use serde_json::json;
use std::process::ExitCode;

pub fn run(args: cli::ShredArgs, ctx: &AppContext) -> ExitCode {
    let (session, mut operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    if !operator.exists_path(&args.path) {
        eprintln!("Error: no cloud file at {}", args.path.display());
        return ExitCode::from(exit_codes::EXIT_USAGE);
    }
    let result = match operator.get_id(&args.path) {
        Ok(id) => operator.shred(&id),
        Err(error) => Err(error),
    };
    if let Err(error) = result {
        eprintln!("Error: {error}");
        return exit_codes::exit_code_for_operator_error(&error);
    }

    if let Err(code) = super::save_session(&session, &mut operator) {
        return code;
    }

    output::print_value(
        format!("Shredded {}", args.path.display()),
        json!({
            "kind": "shred",
            "path": args.path.display().to_string(),
        }),
        &ctx.output,
    )
}

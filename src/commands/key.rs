use crate::app::AppContext;
use crate::client::fsio;
use crate::{cli, exit_codes, output};
use serde_json::json;
use std::process::ExitCode;

pub fn run(args: cli::ExportKeyArgs, ctx: &AppContext) -> ExitCode {
    let (_session, operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let exported = match &args.password {
        Some(password) => match operator.export_key_with_password(password) {
            Ok(sealed) => sealed,
            Err(error) => {
                eprintln!("Error: {error}");
                return exit_codes::exit_code_for_operator_error(&error);
            }
        },
        None => operator.export_key().to_vec(),
    };

    if let Err(error) = fsio::write_bytes_atomic(&args.out, &exported) {
        eprintln!("Error: {error}");
        return ExitCode::from(exit_codes::EXIT_IO);
    }

    output::print_value(
        format!("Exported key to {}", args.out.display()),
        json!({
            "kind": "export-key",
            "path": args.out.display().to_string(),
            "sealed": args.password.is_some(),
        }),
        &ctx.output,
    )
}

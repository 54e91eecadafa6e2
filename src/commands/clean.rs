use crate::app::AppContext;
use crate::{exit_codes, output};
use serde_json::json;
use std::process::ExitCode;

pub fn run(ctx: &AppContext) -> ExitCode {
    let (session, mut operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let deleted = match operator.clean() {
        Ok(deleted) => deleted,
        Err(error) => {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_operator_error(&error);
        }
    };

    if let Err(code) = super::save_session(&session, &mut operator) {
        return code;
    }

    output::print_value(
        format!("Number of deleted objects: {deleted}"),
        json!({
            "kind": "clean",
            "deleted": deleted,
        }),
        &ctx.output,
    )
}

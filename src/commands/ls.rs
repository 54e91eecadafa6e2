use crate::app::AppContext;
use crate::output;
use serde_json::json;
use std::process::ExitCode;

pub fn run(ctx: &AppContext) -> ExitCode {
    let (_session, operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let files = operator.list_files();
    let value = if files.is_empty() {
        "No files found.".to_owned()
    } else {
        files.join("\n")
    };

    output::print_value(
        value,
        json!({
            "kind": "ls",
            "files": files,
        }),
        &ctx.output,
    )
}

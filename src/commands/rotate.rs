use crate::app::AppContext;
use crate::pkw::HpprfAeadPkw;
use crate::{exit_codes, output};
use serde_json::json;
use std::process::ExitCode;

pub fn run(ctx: &AppContext) -> ExitCode {
    let (session, mut operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let fresh = match HpprfAeadPkw::new(operator.tag_len(), operator.key_len()) {
        Ok(fresh) => fresh,
        Err(error) => {
            eprintln!("Error: {error}");
            return ExitCode::from(exit_codes::EXIT_SOFTWARE);
        }
    };
    let rotated = match operator.rotate_keys(fresh) {
        Ok(rotated) => rotated,
        Err(error) => {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_operator_error(&error);
        }
    };

    if let Err(code) = super::save_session(&session, &mut operator) {
        return code;
    }

    output::print_value(
        format!("Number of re-wrapped keys: {rotated}"),
        json!({
            "kind": "rotate-keys",
            "rotated": rotated,
        }),
        &ctx.output,
    )
}

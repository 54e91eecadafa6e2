use crate::app::AppContext;
use crate::{cli, exit_codes, output};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run(args: cli::PutArgs, ctx: &AppContext) -> ExitCode {
    if !args.local_path.exists() {
        eprintln!("Error: {} was not found", args.local_path.display());
        return ExitCode::from(exit_codes::EXIT_USAGE);
    }
    if args.local_path.is_dir() && args.dest.is_some() {
        eprintln!("Error: --as applies to single files, not directories");
        return ExitCode::from(exit_codes::EXIT_USAGE);
    }

    let (session, mut operator) = match super::open_session(ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let uploads: Vec<(PathBuf, PathBuf)> = if args.local_path.is_dir() {
        match collect_files(&args.local_path) {
            Ok(files) => files.into_iter().map(|f| (f.clone(), f)).collect(),
            Err(error) => {
                eprintln!("Error: {error}");
                return ExitCode::from(exit_codes::EXIT_IO);
            }
        }
    } else {
        let cloud_path = args.dest.clone().unwrap_or_else(|| args.local_path.clone());
        vec![(args.local_path.clone(), cloud_path)]
    };

    let mut stored = Vec::with_capacity(uploads.len());
    for (local, cloud_path) in uploads {
        let content = match fs::read(&local) {
            Ok(content) => content,
            Err(error) => {
                eprintln!("Error: cannot read {}: {error}", local.display());
                return ExitCode::from(exit_codes::EXIT_IO);
            }
        };
        if let Err(error) = operator.put(&cloud_path, &content) {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_operator_error(&error);
        }
        stored.push(cloud_path.display().to_string());
    }

    if let Err(code) = super::save_session(&session, &mut operator) {
        return code;
    }

    let value = match stored.as_slice() {
        [single] => format!("Stored {single}"),
        many => format!("Stored {} files", many.len()),
    };
    output::print_value(
        value,
        json!({
            "kind": "put",
            "stored": stored,
        }),
        &ctx.output,
    )
}

/// Every regular file under `dir`, recursively.
fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(collect_files(&path)?);
        } else {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

use std::process::ExitCode;

fn main() -> ExitCode {
    cloudshred::app::run()
}

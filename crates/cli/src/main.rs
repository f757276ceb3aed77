use std::process::ExitCode;

fn main() -> ExitCode {
    shopsight_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    reqflow_cli::run()
}

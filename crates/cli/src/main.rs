use std::process::ExitCode;

fn main() -> ExitCode {
    lendflow_cli::run()
}

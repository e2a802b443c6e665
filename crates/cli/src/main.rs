use std::process::ExitCode;

fn main() -> ExitCode {
    sourcely_cli::run()
}

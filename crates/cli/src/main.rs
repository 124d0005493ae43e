use std::process::ExitCode;

fn main() -> ExitCode {
    wardhouse_cli::run()
}

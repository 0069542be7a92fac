use std::process::ExitCode;

fn main() -> ExitCode {
    salescast_cli::run()
}

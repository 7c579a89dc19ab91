use std::process::ExitCode;

fn main() -> ExitCode {
    tilly_cli::run()
}

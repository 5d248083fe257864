use std::process::ExitCode;

fn main() -> ExitCode {
    autoquote_cli::run()
}

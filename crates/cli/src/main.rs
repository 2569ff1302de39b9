use std::process::ExitCode;

fn main() -> ExitCode {
    bento_cli::run()
}

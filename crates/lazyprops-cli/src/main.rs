use std::process::ExitCode;

fn main() -> ExitCode {
    lazyprops_cli::run()
}

use clap::Parser;
use macropost::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

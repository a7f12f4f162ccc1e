#![allow(missing_docs)]

use clap::Parser;
use hnl_sens_cli::{helpers, Opts, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let opts = Opts::parse();

    match opts.subcommand.run(&opts.configuration) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            match e.chain().find_map(|cause| cause.downcast_ref::<hnl_sens::Error>()) {
                Some(core_error) => helpers::error_exit_code(core_error),
                None => ExitCode::FAILURE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_command() {
        use clap::CommandFactory;
        Opts::command().debug_assert();
    }
}

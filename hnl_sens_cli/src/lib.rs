#![allow(clippy::missing_errors_doc)]
#![allow(missing_docs)]

mod batch;
mod combine;
mod geometry;
pub mod helpers;
mod scan;
mod xsec;

use anyhow::Result;
use clap::Parser;
use enum_dispatch::enum_dispatch;
use git_version::git_version;
use std::path::PathBuf;
use std::process::ExitCode;

/// Options shared across every subcommand.
#[derive(Parser)]
pub struct GlobalConfiguration {
    /// Directory for the geometry disk cache (`spec.md §5`). Disabled
    /// (compute every time, write nothing) if unset.
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[enum_dispatch]
pub trait Subcommand {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode>;
}

#[enum_dispatch(Subcommand)]
#[derive(Parser)]
pub enum SubcommandEnum {
    Batch(batch::Opts),
    Combine(combine::Opts),
    Geometry(geometry::Opts),
    Scan(scan::Opts),
    Xsec(xsec::Opts),
}

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    author,
    about,
    disable_help_subcommand = true,
    name = "hnl-sens",
    version = git_version!(
        args = ["--always", "--dirty", "--long", "--tags"],
        cargo_prefix = "",
        fallback = "unknown"
    )
)]
pub struct Opts {
    #[command(flatten)]
    pub configuration: GlobalConfiguration,
    #[command(subcommand)]
    pub subcommand: SubcommandEnum,
}

use super::{GlobalConfiguration, Subcommand};
use anyhow::Result;
use clap::Parser;
use hnl_sens::xsec::XsecRegistry;
use std::process::ExitCode;

/// Prints the built-in parent cross-section and branching-ratio registry
/// (`spec.md §4.1`).
#[derive(Parser)]
pub struct Opts {
    /// Restrict the listing to a single absolute parent PDG.
    #[arg(long)]
    pdg: Option<i32>,
}

impl Subcommand for Opts {
    fn run(&self, _: &GlobalConfiguration) -> Result<ExitCode> {
        let registry = XsecRegistry::global();
        let pdgs: Vec<i32> = match self.pdg {
            Some(pdg) => vec![pdg.abs()],
            None => registry.known_parents(),
        };

        let mut table = super::helpers::create_table();
        table.set_titles(prettytable::row!["PDG", "sigma [pb]", "BR(->tau nu)"]);
        for pdg in pdgs {
            table.add_row(prettytable::row![
                pdg,
                format!("{:.3e}", registry.sigma_parent(pdg)),
                format!("{:.3e}", registry.br_parent_to_taunu(pdg)),
            ]);
        }
        table.printstd();

        Ok(ExitCode::SUCCESS)
    }
}

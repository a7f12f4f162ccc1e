//! Shared console-output and exit-code plumbing for every subcommand.

use hnl_sens::Error;
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
use prettytable::Table;
use std::process::ExitCode;

/// Builds a [`Table`] with the house formatting used across every
/// subcommand's console output.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .column_separator(' ')
            .separator(LinePosition::Title, LineSeparator::new('-', '+', ' ', ' '))
            .build(),
    );
    table
}

/// Maps a core [`Error`] to the exit-code convention of `spec.md §6`:
/// 0 success (not reached here), 1 configuration error, 2 data error,
/// 3 reserved for future use.
///
/// `Io`/`Csv` cover a missing event CSV or sample directory (surfaced by
/// `csv::Reader::from_path`/`std::fs::read_dir`) alongside genuine
/// malformed-row failures; `spec.md §7` treats a missing input as a
/// configuration error, so both variants are routed to exit code 1 rather
/// than the data-error code.
#[must_use]
pub fn error_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Configuration(_)
        | Error::TheoryAdapterFailure { .. }
        | Error::Io(_)
        | Error::Csv(_) => ExitCode::from(1),
        Error::MissingCoverage { .. }
        | Error::DataCorruption { .. }
        | Error::OverlappingSamples { .. }
        | Error::KinematicInfeasibility(_)
        | Error::ScalingDegeneracy(_)
        | Error::Cache(_) => ExitCode::from(2),
    }
}

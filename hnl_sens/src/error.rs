//! Kind-tagged error type for the pipeline core.
//!
//! Each variant corresponds to one row of the error-kind table in the
//! pipeline design notes; the recovery policy for a given kind lives with
//! its caller, not with the error type itself.

use thiserror::Error;

/// Catch-all error for the `hnl_sens` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown flavour string, missing detector mesh, or any other error
    /// that should be fatal at startup with a clear message.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parent PDG lacked a cross-section or branching-ratio entry.
    /// Callers log this once per (mass, flavour) scan and continue,
    /// excluding the affected rows; it is exposed as an error variant only
    /// so the count can be threaded through `Result`-returning helpers
    /// that want to propagate it as a diagnostic rather than swallow it.
    #[error("missing coverage for PDG {pdg}: {detail}")]
    MissingCoverage {
        /// Absolute PDG code lacking coverage.
        pdg: i32,
        /// Human-readable detail (which table was missing the entry).
        detail: String,
    },

    /// NaN or infinite values found in geometry, weight, or momentum
    /// columns.
    #[error("data corruption in {column}: {row_count} row(s) dropped")]
    DataCorruption {
        /// Name of the offending column.
        column: String,
        /// Number of rows dropped as a result.
        row_count: usize,
    },

    /// Two or more sample files would contribute the same (parent-class,
    /// variant) rank to a combined event table.
    #[error("overlapping non-mergeable samples for {mass_gev} GeV {flavour}: {detail}")]
    OverlappingSamples {
        /// Mass point, in GeV, for which the overlap was detected.
        mass_gev: f64,
        /// Flavour string for which the overlap was detected.
        flavour: String,
        /// Human-readable detail (which files collided).
        detail: String,
    },

    /// Every grid point of a scan fell below threshold, or the grid was
    /// too coarse to bracket a crossing; not a failure, but callers that
    /// need `Result` plumbing can surface it distinctly from a crash.
    #[error("kinematically infeasible: {0}")]
    KinematicInfeasibility(String),

    /// `cτ₀` underflowed or overflowed its representable range and had to
    /// be clamped.
    #[error("scaling degeneracy: {0}")]
    ScalingDegeneracy(String),

    /// The external theory adapter failed for a given (mass, coupling)
    /// point. The (mass, flavour) unit that triggered it is marked failed;
    /// other units proceed.
    #[error("theory adapter failed for mass={mass_gev} GeV: {source}")]
    TheoryAdapterFailure {
        /// Mass point, in GeV, passed to the adapter.
        mass_gev: f64,
        /// Underlying failure reported by the adapter.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O failure reading or writing an event table, mesh, or cache file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV (de)serialisation failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Binary (de)serialisation failure in the geometry cache.
    #[error("cache (de)serialisation error: {0}")]
    Cache(#[from] Box<bincode::ErrorKind>),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

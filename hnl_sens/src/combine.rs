//! C3: the sample combiner.
//!
//! Merges the several production-regime CSVs that may exist at a given
//! (mass, flavour) into one unified [`EventTable`], per `spec.md §4.3`'s
//! merge policy: form-factor precedence, additive regimes, fromTau
//! inclusion recorded separately, and a fatal error on genuine overlap.

use crate::error::{Error, Result};
use crate::event::EventTable;
use crate::flavour::Flavour;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Parent-class regime of a sample file, `spec.md §6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Regime {
    /// Kaon-parent sample.
    Kaon,
    /// Charm-meson-parent sample.
    Charm,
    /// Beauty-meson-parent sample.
    Beauty,
    /// Electroweak-boson-parent sample.
    Ew,
}

impl Regime {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "kaon" => Some(Self::Kaon),
            "charm" => Some(Self::Charm),
            "beauty" => Some(Self::Beauty),
            "EW" => Some(Self::Ew),
            _ => None,
        }
    }
}

/// Tau production mode, applicable only to the tau flavour, `spec.md §6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TauMode {
    /// Direct production (the parent decays straight to the HNL).
    Direct,
    /// The parent decays to a tau, which then decays to the HNL.
    FromTau,
}

impl TauMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(Self::Direct),
            "fromTau" => Some(Self::FromTau),
            _ => None,
        }
    }
}

/// A parsed sample filename, `HNL_<mass>GeV_<flavour>_<regime>[_<mode>][_ff].csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFileName {
    /// Mass point, GeV.
    pub mass_gev: f64,
    /// Lepton-coupling flavour.
    pub flavour: Flavour,
    /// Parent-class regime.
    pub regime: Regime,
    /// Tau production mode, if the flavour is tau and the filename names
    /// one explicitly.
    pub mode: Option<TauMode>,
    /// Whether this is the form-factor variant.
    pub form_factor: bool,
}

impl SampleFileName {
    /// Parses a sample filename (basename, with or without a directory
    /// prefix). Returns `None` for filenames that do not match the naming
    /// convention at all (the combiner skips these rather than erroring:
    /// a directory of samples may contain unrelated files).
    #[must_use]
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".csv")?;
        let rest = stem.strip_prefix("HNL_")?;
        let gev_at = rest.find("GeV_")?;
        let mass_gev: f64 = rest[..gev_at].replace('p', ".").parse().ok()?;
        let rest = &rest[gev_at + 4..];

        let mut tokens: Vec<&str> = rest.split('_').collect();
        let form_factor = tokens.last() == Some(&"ff");
        if form_factor {
            tokens.pop();
        }

        let flavour: Flavour = tokens.first()?.parse().ok()?;
        let regime = Regime::parse(tokens.get(1)?)?;
        let mode = tokens.get(2).and_then(|s| TauMode::parse(s));

        Some(Self { mass_gev, flavour, regime, mode, form_factor })
    }

    fn matches(&self, mass_gev: f64, flavour: Flavour, tolerance: f64) -> bool {
        self.flavour == flavour && (self.mass_gev - mass_gev).abs() <= tolerance
    }

    fn dedup_key(&self) -> (Regime, Option<TauMode>) {
        (self.regime, self.mode)
    }
}

/// Whether fromTau files are folded into the unified table (default
/// `true`, `spec.md §4.3`: "included by default but recorded
/// separately").
#[derive(Debug, Clone, Copy)]
pub struct CombineOptions {
    /// Include `_fromTau` files.
    pub include_from_tau: bool,
    /// Regimes expected to be present; a regime named here with no
    /// matching file produces a non-fatal warning (`spec.md §4.3`
    /// Failure policy) rather than silence. Empty by default: the
    /// combiner otherwise has no way to know which regimes a given mass
    /// point should have.
    pub expected_regimes: Vec<Regime>,
    /// Mass tolerance for matching filenames to the requested mass
    /// point, GeV (the two-decimal filename encoding loses precision).
    pub mass_tolerance_gev: f64,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            include_from_tau: true,
            expected_regimes: Vec::new(),
            mass_tolerance_gev: 5e-3,
        }
    }
}

/// Diagnostics describing how a combined table was assembled.
#[derive(Debug, Clone, Default)]
pub struct CombineDiagnostics {
    /// Files selected for the combined table, in the order concatenated.
    pub files_used: Vec<PathBuf>,
    /// Files excluded by form-factor precedence.
    pub files_superseded: Vec<PathBuf>,
    /// Regimes named in [`CombineOptions::expected_regimes`] with no
    /// matching file.
    pub missing_regimes: Vec<Regime>,
    /// Total rows in the unified table.
    pub total_rows: usize,
    /// Rows belonging to fromTau channels, a subset of `total_rows`.
    pub from_tau_rows: usize,
}

/// Combines every sample file in `dir` matching `(mass_gev, flavour)`
/// into one unified [`EventTable`], per `spec.md §4.3`.
///
/// # Errors
///
/// Returns [`Error::OverlappingSamples`] if two files would contribute
/// the same (regime, mode, variant-rank) to the table. Propagates
/// [`Error::Io`]/[`Error::Csv`] from the underlying file loads.
pub fn combine(
    dir: impl AsRef<Path>,
    mass_gev: f64,
    flavour: Flavour,
    opts: &CombineOptions,
) -> Result<(EventTable, CombineDiagnostics)> {
    let dir = dir.as_ref();
    let mut groups: BTreeMap<(Regime, Option<TauMode>), Vec<(PathBuf, SampleFileName)>> = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else { continue };
        let Some(parsed) = SampleFileName::parse(&name) else { continue };
        if !parsed.matches(mass_gev, flavour, opts.mass_tolerance_gev) {
            continue;
        }
        groups.entry(parsed.dedup_key()).or_default().push((entry.path(), parsed));
    }

    let mut unified = EventTable::default();
    let mut diag = CombineDiagnostics::default();
    let found_regimes: std::collections::BTreeSet<Regime> = groups.keys().map(|(r, _)| *r).collect();

    for ((regime, mode), mut files) in groups {
        if mode == Some(TauMode::FromTau) && !opts.include_from_tau {
            continue;
        }

        let (ff, non_ff): (Vec<_>, Vec<_>) = files.drain(..).partition(|(_, p)| p.form_factor);
        if ff.len() > 1 {
            return Err(Error::OverlappingSamples {
                mass_gev,
                flavour: flavour.to_string(),
                detail: format!("{} duplicate form-factor files for {regime:?}/{mode:?}", ff.len()),
            });
        }
        if non_ff.len() > 1 {
            return Err(Error::OverlappingSamples {
                mass_gev,
                flavour: flavour.to_string(),
                detail: format!("{} duplicate phase-space files for {regime:?}/{mode:?}", non_ff.len()),
            });
        }

        let selected = if let Some((path, _)) = ff.first() {
            if let Some((superseded, _)) = non_ff.first() {
                diag.files_superseded.push(superseded.clone());
                info!(path = %superseded.display(), "superseded by form-factor variant");
            }
            path.clone()
        } else if let Some((path, _)) = non_ff.first() {
            path.clone()
        } else {
            continue;
        };

        let (table, file_diag) = EventTable::load_csv(&selected)?;
        if file_diag.total_dropped() > 0 {
            warn!(path = %selected.display(), dropped = file_diag.total_dropped(), "rows dropped loading sample");
        }
        if mode == Some(TauMode::FromTau) {
            diag.from_tau_rows += table.len();
        }
        diag.total_rows += table.len();
        unified.extend_from(&table);
        diag.files_used.push(selected);
    }

    for regime in &opts.expected_regimes {
        if !found_regimes.contains(regime) {
            warn!(mass_gev, flavour = %flavour, ?regime, "expected regime had no matching sample file");
            diag.missing_regimes.push(*regime);
        }
    }

    unified.sort_by_event_id();
    Ok((unified, diag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_beauty_sample() {
        let parsed = SampleFileName::parse("HNL_2p60GeV_muon_beauty.csv").unwrap();
        assert_eq!(parsed.mass_gev, 2.60);
        assert_eq!(parsed.flavour, Flavour::Muon);
        assert_eq!(parsed.regime, Regime::Beauty);
        assert_eq!(parsed.mode, None);
        assert!(!parsed.form_factor);
    }

    #[test]
    fn parses_from_tau_form_factor_sample() {
        let parsed = SampleFileName::parse("HNL_1p00GeV_tau_charm_fromTau_ff.csv").unwrap();
        assert_eq!(parsed.flavour, Flavour::Tau);
        assert_eq!(parsed.regime, Regime::Charm);
        assert_eq!(parsed.mode, Some(TauMode::FromTau));
        assert!(parsed.form_factor);
    }

    #[test]
    fn rejects_unrelated_filenames() {
        assert!(SampleFileName::parse("readme.txt").is_none());
        assert!(SampleFileName::parse("HNL_2p60GeV_muon_beauty.root").is_none());
    }

    fn write_sample_with_header(dir: &Path, name: &str, rows: &[(i64, i32)]) {
        let mut writer = csv::Writer::from_path(dir.join(name)).unwrap();
        writer
            .write_record([
                "event", "weight", "hnl_id", "parent_pdg", "tau_parent_id", "pt", "eta", "phi",
                "p", "E", "mass", "prod_x_mm", "prod_y_mm", "prod_z_mm", "beta_gamma",
            ])
            .unwrap();
        for &(event_id, parent_pdg) in rows {
            writer
                .write_record([
                    event_id.to_string(),
                    "1.0".into(),
                    crate::event::HNL_PDG.to_string(),
                    parent_pdg.to_string(),
                    "0".into(),
                    "1.0".into(),
                    "0.5".into(),
                    "0.1".into(),
                    "4.0".into(),
                    "4.1".into(),
                    "2.0".into(),
                    "0.0".into(),
                    "0.0".into(),
                    "0.0".into(),
                    "2.0".into(),
                ])
                .unwrap();
        }
        writer.flush().unwrap();
    }

    #[test]
    fn additive_regimes_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_with_header(dir.path(), "HNL_2p60GeV_muon_beauty.csv", &[(1, 511)]);
        write_sample_with_header(dir.path(), "HNL_2p60GeV_muon_charm.csv", &[(2, 411)]);

        let (table, diag) = combine(dir.path(), 2.60, Flavour::Muon, &CombineOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(diag.files_used.len(), 2);
    }

    #[test]
    fn form_factor_supersedes_phase_space() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_with_header(dir.path(), "HNL_2p60GeV_muon_beauty.csv", &[(1, 511)]);
        write_sample_with_header(dir.path(), "HNL_2p60GeV_muon_beauty_ff.csv", &[(1, 511), (2, 511)]);

        let (table, diag) = combine(dir.path(), 2.60, Flavour::Muon, &CombineOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(diag.files_superseded.len(), 1);
    }

    #[test]
    fn duplicate_non_ff_files_are_fatal() {
        // two differently-named files both parse to (Beauty, None, non-ff)
        // and would silently double-count the same regime if not rejected.
        let dir = tempfile::tempdir().unwrap();
        write_sample_with_header(dir.path(), "HNL_2p60GeV_muon_beauty.csv", &[(1, 511)]);
        write_sample_with_header(dir.path(), "HNL_2p60GeV_muon_beauty_v2.csv", &[(2, 511)]);

        let err = combine(dir.path(), 2.60, Flavour::Muon, &CombineOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OverlappingSamples { .. }));
    }
}

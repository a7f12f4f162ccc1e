//! C4: the theory adapter.
//!
//! Hides the external BR/cτ₀ calculator behind a stable, object-safe
//! trait (`spec.md §9` Design Notes: "tagged-variant or single-trait
//! abstraction over {anchor-based analytic model, table-lookup model,
//! future models}"). The calculator's internals stay out of scope
//! (`spec.md §1`); only its anchor-at-a-reference-coupling interface is
//! modeled here, plus the coupling scaling laws of `spec.md §4.4` that let
//! one anchor call stand in for the whole `|U|^2` scan.

use crate::config::{CTAU0_CEILING_M, CTAU0_FLOOR_M};
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// The result of one theory-calculator call at a reference coupling
/// `U_ref`, per `spec.md §3`.
#[derive(Debug, Clone, PartialEq)]
pub struct TheoryAnchor {
    /// Proper decay length at `U_ref`, metres.
    pub ctau0_ref_m: f64,
    /// Inclusive `BR(parent -> lepton N)` at `U_ref`, keyed by absolute
    /// parent PDG.
    pub br_per_parent: FxHashMap<i32, f64>,
    /// Inclusive `BR(tau -> N + X)` at `U_ref`, used only for fromTau
    /// channels.
    pub br_tau_to_n: f64,
    /// The reference coupling vector `(U_e, U_mu, U_tau)` this anchor was
    /// computed at.
    pub u_ref: [f64; 3],
}

impl TheoryAnchor {
    /// `BR(parent -> lepton N)` at `U_ref` for `abs_pdg`, or 0 if the
    /// theory calculator's returned mapping has no coverage for it
    /// (`spec.md §4.4` Failure policy).
    #[must_use]
    pub fn br_parent(&self, abs_pdg: i32) -> f64 {
        self.br_per_parent.get(&abs_pdg.abs()).copied().unwrap_or(0.0)
    }
}

/// The single abstraction point over theory calculators. Object-safe so
/// callers can hold `&dyn TheoryModel` without committing to a concrete
/// implementation at the call site.
pub trait TheoryModel {
    /// Computes the anchor record at `mass_gev` for reference coupling
    /// `u_ref`. Callers pick a canonical `U_ref`, typically the unit
    /// vector of the benchmark flavour being scanned (`spec.md §4.4`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TheoryAdapterFailure`] if the underlying
    /// calculator raises or has no coverage for `mass_gev`.
    fn anchor(&self, mass_gev: f64, u_ref: [f64; 3]) -> Result<TheoryAnchor>;
}

/// `cτ₀(|U|^2) = cτ₀_ref · |U_ref|^2 / |U|^2` (`spec.md §4.4`), with the
/// result clamped to `[`[`CTAU0_FLOOR_M`]`, `[`[`CTAU0_CEILING_M`]`]` and a
/// diagnostic logged on clamp (`spec.md §7` "scaling degeneracy").
#[must_use]
pub fn scale_ctau0(ctau0_ref_m: f64, u_ref_sq: f64, u_sq: f64) -> f64 {
    let u_sq = u_sq.max(f64::MIN_POSITIVE);
    let raw = ctau0_ref_m * u_ref_sq / u_sq;
    if raw > CTAU0_CEILING_M {
        warn!(raw, ceiling = CTAU0_CEILING_M, "cτ0 overflowed, clamped");
        CTAU0_CEILING_M
    } else if raw < CTAU0_FLOOR_M {
        warn!(raw, floor = CTAU0_FLOOR_M, "cτ0 underflowed, clamped");
        CTAU0_FLOOR_M
    } else {
        raw
    }
}

/// `BR(|U|^2) = BR_ref · |U|^2 / |U_ref|^2` (`spec.md §4.4`), clamped to
/// `[0, 1]`: a branching ratio extrapolated far past its reference point
/// can exceed unity, which is unphysical but not itself an error the
/// scaling law can detect; callers scanning to very large `|U|^2` should
/// expect saturation here rather than a crash.
#[must_use]
pub fn scale_br(br_ref: f64, u_ref_sq: f64, u_sq: f64) -> f64 {
    if u_ref_sq <= 0.0 {
        return 0.0;
    }
    (br_ref * u_sq / u_ref_sq).clamp(0.0, 1.0)
}

/// Reads a precomputed anchor table written ahead of time by the external
/// theory calculator (`spec.md §1`: the calculator itself is out of
/// scope, only its output format is modeled). This is the production
/// adapter.
///
/// CSV columns: `mass_gev,flavour,u_ref_e,u_ref_mu,u_ref_tau,ctau0_ref_m,
/// br_tau_to_n,br_<pdg>...` with one `br_<pdg>` column per parent species
/// the calculator covers. Unknown `br_<pdg>` columns present in the file
/// but never looked up are simply carried; absent ones resolve to 0 via
/// [`TheoryAnchor::br_parent`].
#[derive(Debug, Clone, Default)]
pub struct TableTheoryModel {
    rows: BTreeMap<(i64, String), TheoryAnchor>,
}

/// Scales a mass in GeV to a fixed-point key so `f64` masses can be used
/// as map keys without implementing `Ord` on `f64` itself.
fn mass_key(mass_gev: f64) -> i64 {
    (mass_gev * 1000.0).round() as i64
}

impl TableTheoryModel {
    /// Loads the anchor table from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Csv`] or [`Error::Io`] on a malformed or unreadable
    /// file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();
        let br_columns: Vec<(usize, i32)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                name.strip_prefix("br_").and_then(|pdg| pdg.parse::<i32>().ok()).map(|pdg| (i, pdg))
            })
            .collect();

        let mut rows = BTreeMap::new();
        for result in reader.records() {
            let record = result?;
            let get = |name: &str| -> Option<f64> {
                headers.iter().position(|h| h == name).and_then(|i| record.get(i)).and_then(|v| v.parse().ok())
            };
            let mass_gev = get("mass_gev").unwrap_or(f64::NAN);
            let flavour = headers
                .iter()
                .position(|h| h == "flavour")
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_owned();
            let u_ref = [
                get("u_ref_e").unwrap_or(0.0),
                get("u_ref_mu").unwrap_or(0.0),
                get("u_ref_tau").unwrap_or(0.0),
            ];
            let ctau0_ref_m = get("ctau0_ref_m").unwrap_or(0.0);
            let br_tau_to_n = get("br_tau_to_n").unwrap_or(0.0);
            let mut br_per_parent = FxHashMap::default();
            for &(col, pdg) in &br_columns {
                if let Some(value) = record.get(col).and_then(|v| v.parse::<f64>().ok()) {
                    br_per_parent.insert(pdg, value);
                }
            }
            rows.insert(
                (mass_key(mass_gev), flavour),
                TheoryAnchor { ctau0_ref_m, br_per_parent, br_tau_to_n, u_ref },
            );
        }
        Ok(Self { rows })
    }

    /// Number of (mass, flavour) rows loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TheoryModel for TableTheoryModel {
    fn anchor(&self, mass_gev: f64, u_ref: [f64; 3]) -> Result<TheoryAnchor> {
        // The table is keyed by mass and flavour name; the flavour is
        // recovered from the dominant component of `u_ref`, since every
        // caller passes a unit vector along the benchmark axis
        // (`spec.md §4.4`).
        let flavour = [
            crate::flavour::Flavour::Electron,
            crate::flavour::Flavour::Muon,
            crate::flavour::Flavour::Tau,
        ]
        .into_iter()
        .max_by(|a, b| u_ref[a.index()].abs().total_cmp(&u_ref[b.index()].abs()))
        .unwrap_or(crate::flavour::Flavour::Electron);

        self.rows
            .get(&(mass_key(mass_gev), flavour.as_str().to_owned()))
            .cloned()
            .ok_or_else(|| Error::TheoryAdapterFailure {
                mass_gev,
                source: format!("no precomputed anchor row for mass={mass_gev} GeV flavour={flavour}").into(),
            })
    }
}

/// A closed-form, order-of-magnitude stand-in for the theory calculator,
/// used by the test suite and by `scan --theory analytic` for quick
/// sanity scans without a precomputed table (`spec.md §4.4`: the
/// adapter's contract says nothing about *how* the anchor is computed).
/// Never claims physical accuracy: the branching ratio uses a simple
/// two-body phase-space suppression factor and the lifetime a
/// `1/mass^5`-like scaling typical of four-fermion HNL decay widths.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticTheoryModel {
    /// `BR(parent -> lepton N)` at `|U_ref|^2 = 1` and the phase-space
    /// threshold fully open, before suppression.
    pub base_br: f64,
    /// `cτ₀` at `|U_ref|^2 = 1` and `mass = 1` GeV, metres.
    pub ctau0_at_1_gev_m: f64,
}

impl Default for AnalyticTheoryModel {
    fn default() -> Self {
        Self {
            base_br: 1e-6,
            ctau0_at_1_gev_m: 1.0,
        }
    }
}

/// Approximate masses (GeV) of the parent species in [`crate::xsec`],
/// used only to evaluate [`AnalyticTheoryModel`]'s phase-space factor.
const PARENT_MASSES_GEV: [(i32, f64); 11] = [
    (511, 5.280),  // B0
    (521, 5.279),  // B+
    (531, 5.367),  // Bs
    (5122, 5.620), // Lambda_b
    (421, 1.865),  // D0
    (411, 1.870),  // D+
    (431, 1.968),  // Ds
    (4122, 2.286), // Lambda_c
    (321, 0.494),  // K+
    (24, 80.377),  // W
    (23, 91.188),  // Z
];

fn phase_space_factor(parent_mass_gev: f64, hnl_mass_gev: f64) -> f64 {
    if hnl_mass_gev >= parent_mass_gev {
        return 0.0;
    }
    let x = hnl_mass_gev / parent_mass_gev;
    (1.0 - x * x).powi(2)
}

impl TheoryModel for AnalyticTheoryModel {
    fn anchor(&self, mass_gev: f64, u_ref: [f64; 3]) -> Result<TheoryAnchor> {
        if mass_gev <= 0.0 {
            return Err(Error::TheoryAdapterFailure {
                mass_gev,
                source: "mass must be positive".into(),
            });
        }
        let u_ref_sq = crate::flavour::norm_squared(u_ref);
        let mut br_per_parent = FxHashMap::default();
        for &(pdg, parent_mass) in &PARENT_MASSES_GEV {
            let factor = phase_space_factor(parent_mass, mass_gev);
            if factor > 0.0 {
                br_per_parent.insert(pdg, self.base_br * factor * u_ref_sq);
            }
        }
        let ctau0_ref_m = self.ctau0_at_1_gev_m / mass_gev.powi(5) * u_ref_sq.max(f64::MIN_POSITIVE).recip();
        Ok(TheoryAnchor {
            ctau0_ref_m: ctau0_ref_m.clamp(CTAU0_FLOOR_M, CTAU0_CEILING_M),
            br_per_parent,
            br_tau_to_n: self.base_br * u_ref_sq,
            u_ref,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctau0_scales_inversely() {
        let ref_val = scale_ctau0(10.0, 1.0, 1e-6);
        let scanned = scale_ctau0(10.0, 1.0, 1e-5);
        assert!(float_cmp::approx_eq!(f64, scanned, ref_val / 10.0, epsilon = ref_val * 1e-9));
    }

    #[test]
    fn br_scales_directly() {
        let ref_val = scale_br(1e-7, 1.0, 1e-6);
        let scanned = scale_br(1e-7, 1.0, 1e-5);
        assert!(float_cmp::approx_eq!(f64, scanned, ref_val * 10.0, epsilon = ref_val * 1e-9));
    }

    #[test]
    fn br_clamps_to_unity() {
        assert_eq!(scale_br(0.5, 1e-6, 1.0), 1.0);
    }

    #[test]
    fn ctau0_clamps_on_underflow() {
        let tiny = scale_ctau0(1e-20, 1.0, 1e12);
        assert_eq!(tiny, CTAU0_FLOOR_M);
    }

    #[test]
    fn analytic_model_forbids_above_threshold_mass() {
        let model = AnalyticTheoryModel::default();
        let anchor = model.anchor(2.6, crate::flavour::Flavour::Muon.unit_vector()).unwrap();
        // kaon (0.494 GeV) cannot produce a 2.6 GeV HNL
        assert_eq!(anchor.br_parent(321), 0.0);
        // beauty mesons can
        assert!(anchor.br_parent(511) > 0.0);
    }

    #[test]
    fn analytic_model_rejects_nonpositive_mass() {
        let model = AnalyticTheoryModel::default();
        assert!(model.anchor(0.0, [0.0, 1.0, 0.0]).is_err());
    }
}

//! C5: the exclusion solver.
//!
//! Scans the per-coupling signal kernel across a `|U|^2` grid and
//! inverts it into a 95% CL exclusion interval, per `spec.md §4.5.2`.
//! The expected shape is single-peaked in `log|U|^2` (`spec.md §4.5.2`
//! "Physics expectation"): too small and the HNL escapes before decaying,
//! too large and it decays before reaching the detector. The exclusion
//! region is therefore an island, not a half-line.

use crate::config::{DEFAULT_GRID_POINTS, DEFAULT_N_THRESHOLD, DEFAULT_U2_MIN, DEFAULT_U2_MAX};
use crate::flavour::Flavour;
use crate::geometry::GeometryTable;
use crate::kernel::{KernelConfig, SignalResult, signal_kernel};
use serde::{Deserialize, Serialize};

/// One `(|U|^2, N_sig)` point of a completed scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    /// The `|U|^2` grid point.
    pub u2: f64,
    /// Total expected signal at that point.
    pub n_sig: f64,
}

/// The outcome of a scan inversion, `spec.md §4.5.2`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionResult {
    /// A bounded exclusion island was found.
    Island {
        /// Lower `|U|^2` edge (the grid point closest to, but not below,
        /// threshold from the low side).
        u2_min: f64,
        /// Upper `|U|^2` edge.
        u2_max: f64,
        /// `|U|^2` of the peak yield within the island.
        peak_u2: f64,
        /// Peak expected signal within the island.
        peak_n_sig: f64,
    },
    /// The maximum yield over the whole grid fell below threshold.
    NoExclusion {
        /// The maximum expected signal found anywhere on the grid.
        peak_n_sig: f64,
    },
    /// The grid was too coarse: the maximum yield was at or above
    /// threshold, but no contiguous run of grid points could be
    /// identified (should not occur with a reasonable grid; recorded
    /// rather than silently picking an arbitrary island).
    Degenerate {
        /// The maximum expected signal found anywhere on the grid.
        peak_n_sig: f64,
    },
}

/// Builds the default `|U|^2` scan grid: `n` log-spaced points from
/// `u2_min` to `u2_max` inclusive (`spec.md §4.5.2`).
///
/// # Panics
///
/// Panics if `u2_min <= 0.0`, `u2_max <= u2_min`, or `n < 2`.
#[must_use]
pub fn log_spaced_grid(u2_min: f64, u2_max: f64, n: usize) -> Vec<f64> {
    assert!(u2_min > 0.0, "u2_min must be positive");
    assert!(u2_max > u2_min, "u2_max must exceed u2_min");
    assert!(n >= 2, "a grid needs at least two points");

    let log_min = u2_min.ln();
    let log_max = u2_max.ln();
    (0..n)
        .map(|k| {
            let frac = k as f64 / (n - 1) as f64;
            (log_min + frac * (log_max - log_min)).exp()
        })
        .collect()
}

/// The default grid of `spec.md §4.5.2`: 100 log-spaced points from
/// `1e-12` to `1e-2`.
#[must_use]
pub fn default_grid() -> Vec<f64> {
    log_spaced_grid(DEFAULT_U2_MIN, DEFAULT_U2_MAX, DEFAULT_GRID_POINTS)
}

/// Evaluates the signal kernel at every point of `grid` and inverts the
/// result into an exclusion interval against `threshold` (default
/// [`DEFAULT_N_THRESHOLD`], `spec.md §4.5.2`). Diagnostics are logged
/// only at the first grid point, per `spec.md §4.5.1`.
#[must_use]
pub fn solve_exclusion(
    cfg: &KernelConfig<'_>,
    geometry: &GeometryTable,
    grid: &[f64],
    threshold: f64,
) -> (Vec<SignalResult>, ExclusionResult) {
    let results: Vec<SignalResult> = grid
        .iter()
        .enumerate()
        .map(|(k, &u2)| signal_kernel(cfg, geometry, u2, k == 0))
        .collect();

    let points: Vec<ScanPoint> = results.iter().map(|r| ScanPoint { u2: r.u2, n_sig: r.n_sig_total }).collect();
    let exclusion = invert(&points, threshold);
    (results, exclusion)
}

/// Convenience wrapper over [`solve_exclusion`] using the default grid
/// and threshold.
#[must_use]
pub fn solve_exclusion_default(cfg: &KernelConfig<'_>, geometry: &GeometryTable) -> (Vec<SignalResult>, ExclusionResult) {
    solve_exclusion(cfg, geometry, &default_grid(), DEFAULT_N_THRESHOLD)
}

/// Identifies the dominant contiguous island of `points` at or above
/// `threshold`, per `spec.md §4.5.2`. "Dominant" is the island with the
/// highest peak yield, since the physics expectation is a single-peaked
/// function and a single island should normally exist.
fn invert(points: &[ScanPoint], threshold: f64) -> ExclusionResult {
    let peak_n_sig = points.iter().map(|p| p.n_sig).fold(0.0_f64, f64::max);

    if peak_n_sig < threshold {
        return ExclusionResult::NoExclusion { peak_n_sig };
    }

    let mut islands: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, p) in points.iter().enumerate() {
        if p.n_sig >= threshold {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            islands.push((start, i - 1));
        }
    }
    if let Some(start) = run_start {
        islands.push((start, points.len() - 1));
    }

    let Some(&(start, end)) = islands.iter().max_by(|a, b| {
        let peak_a = points[a.0..=a.1].iter().map(|p| p.n_sig).fold(0.0_f64, f64::max);
        let peak_b = points[b.0..=b.1].iter().map(|p| p.n_sig).fold(0.0_f64, f64::max);
        peak_a.total_cmp(&peak_b)
    }) else {
        return ExclusionResult::Degenerate { peak_n_sig };
    };

    let island = &points[start..=end];
    let peak_point = island.iter().max_by(|a, b| a.n_sig.total_cmp(&b.n_sig)).expect("non-empty island");

    ExclusionResult::Island {
        u2_min: points[start].u2,
        u2_max: points[end].u2,
        peak_u2: peak_point.u2,
        peak_n_sig: peak_point.n_sig,
    }
}

/// One row of the summary output of `spec.md §6`:
/// `mass_GeV, flavour, U2_min, U2_max, peak_Nsig, island_decades,
/// geom_acceptance`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRow {
    /// Mass point, GeV.
    pub mass_gev: f64,
    /// Lepton-coupling flavour, as its string name.
    pub flavour: String,
    /// Lower `|U|^2` exclusion edge; `NaN` if [`ExclusionResult::NoExclusion`]
    /// or [`ExclusionResult::Degenerate`].
    pub u2_min: f64,
    /// Upper `|U|^2` exclusion edge; `NaN` under the same conditions.
    pub u2_max: f64,
    /// Peak expected signal anywhere on the grid.
    pub peak_n_sig: f64,
    /// `log10(u2_max / u2_min)`, the island's width in decades; 0 if no
    /// island was found.
    pub island_decades: f64,
    /// Weighted fraction of events whose ray hit the detector mesh,
    /// independent of `|U|^2` (a property of the sample and detector
    /// alone, not of the decay probability).
    pub geom_acceptance: f64,
}

/// Weighted geometric acceptance of a sample: `sum(weight where hits_tube)
/// / sum(weight)`, the `geom_acceptance` column of `spec.md §6`.
#[must_use]
pub fn geometric_acceptance(geometry: &GeometryTable) -> f64 {
    let total: f64 = geometry.events.weight.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let hit: f64 = geometry
        .events
        .weight
        .iter()
        .zip(&geometry.hits_tube)
        .filter_map(|(&w, &hit)| hit.then_some(w))
        .sum();
    hit / total
}

/// Assembles one [`SummaryRow`] from a completed scan's result.
#[must_use]
pub fn summarize(mass_gev: f64, flavour: Flavour, geometry: &GeometryTable, exclusion: &ExclusionResult) -> SummaryRow {
    let geom_acceptance = geometric_acceptance(geometry);
    match *exclusion {
        ExclusionResult::Island { u2_min, u2_max, peak_n_sig, .. } => SummaryRow {
            mass_gev,
            flavour: flavour.to_string(),
            u2_min,
            u2_max,
            peak_n_sig,
            island_decades: (u2_max / u2_min).log10(),
            geom_acceptance,
        },
        ExclusionResult::NoExclusion { peak_n_sig } | ExclusionResult::Degenerate { peak_n_sig } => SummaryRow {
            mass_gev,
            flavour: flavour.to_string(),
            u2_min: f64::NAN,
            u2_max: f64::NAN,
            peak_n_sig,
            island_decades: 0.0,
            geom_acceptance,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(u2_ns: &[(f64, f64)]) -> Vec<ScanPoint> {
        u2_ns.iter().map(|&(u2, n_sig)| ScanPoint { u2, n_sig }).collect()
    }

    #[test]
    fn grid_is_log_spaced_and_monotonic() {
        let grid = log_spaced_grid(1e-12, 1e-2, 100);
        assert_eq!(grid.len(), 100);
        assert!((grid[0] - 1e-12).abs() / 1e-12 < 1e-9);
        assert!((grid[99] - 1e-2).abs() / 1e-2 < 1e-9);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn below_threshold_everywhere_is_no_exclusion() {
        let pts = points(&[(1e-8, 0.1), (1e-6, 0.5), (1e-4, 0.2)]);
        let result = invert(&pts, 3.0);
        assert!(matches!(result, ExclusionResult::NoExclusion { .. }));
    }

    #[test]
    fn single_island_brackets_the_peak() {
        let pts = points(&[
            (1e-9, 1.0),
            (1e-8, 5.0),
            (1e-7, 50.0),
            (1e-6, 10.0),
            (1e-5, 1.0),
        ]);
        let result = invert(&pts, 3.0);
        match result {
            ExclusionResult::Island { u2_min, u2_max, peak_u2, peak_n_sig } => {
                assert_eq!(u2_min, 1e-8);
                assert_eq!(u2_max, 1e-6);
                assert_eq!(peak_u2, 1e-7);
                assert_eq!(peak_n_sig, 50.0);
            }
            other => panic!("expected an island, got {other:?}"),
        }
    }

    #[test]
    fn geometric_acceptance_is_weighted_hit_fraction() {
        use crate::event::EventTable;
        let mut events = EventTable::default();
        for i in 0..4 {
            events.event_id.push(i);
            events.weight.push(1.0);
            events.parent_pdg.push(511);
            events.tau_parent_id.push(0);
            events.pt.push(1.0);
            events.eta.push(0.0);
            events.phi.push(0.0);
            events.p.push(8.0);
            events.e.push(8.0);
            events.mass.push(2.0);
            events.prod_x_mm.push(0.0);
            events.prod_y_mm.push(0.0);
            events.prod_z_mm.push(0.0);
        }
        let geometry = GeometryTable {
            events,
            hits_tube: vec![true, true, false, false],
            entry_distance_m: vec![20.0; 4],
            path_length_m: vec![1.0; 4],
            beta_gamma: vec![4.0; 4],
        };
        assert!((geometric_acceptance(&geometry) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dominant_island_is_chosen_among_several() {
        let pts = points(&[
            (1e-10, 4.0), // small island 1
            (1e-9, 1.0),
            (1e-8, 40.0), // dominant island
            (1e-7, 1.0),
        ]);
        let result = invert(&pts, 3.0);
        match result {
            ExclusionResult::Island { peak_n_sig, .. } => assert_eq!(peak_n_sig, 40.0),
            other => panic!("expected an island, got {other:?}"),
        }
    }
}

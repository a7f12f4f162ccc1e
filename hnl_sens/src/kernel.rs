//! C5: the per-coupling expected-signal kernel.
//!
//! The heart of the pipeline (`spec.md §4.5.1`): combines geometry,
//! cross-sections, and a theory anchor into an expected yield `N_sig`,
//! with every parent species treated as an independent production
//! channel rather than collapsing multi-HNL collisions per event
//! (`spec.md §4.5.1` "Per-parent accumulation").

use crate::config::{LAMBDA_FLOOR_M, PB_TO_FB};
use crate::flavour::norm_squared;
use crate::geometry::GeometryTable;
use crate::theory::{TheoryAnchor, scale_br, scale_ctau0};
use crate::xsec::XsecRegistry;
use std::collections::BTreeMap;
use tracing::warn;

/// Per-coupling kernel inputs that do not change across a `|U|^2` scan;
/// passed by value/reference rather than threaded through mutable scan
/// state (`spec.md §9` Design Notes).
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig<'a> {
    /// Integrated luminosity, fb⁻¹.
    pub luminosity_fb_inv: f64,
    /// Reference coupling vector the theory anchor was computed at.
    pub u_ref: [f64; 3],
    /// Cross-section registry (C1).
    pub xsec: &'a XsecRegistry,
    /// Theory anchor (C4), computed once per mass at `u_ref`.
    pub anchor: &'a TheoryAnchor,
}

/// One production channel's contribution to `N_sig` at a single `|U|^2`
/// point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentContribution {
    /// Absolute PDG of the production channel (the grandparent meson for
    /// fromTau channels, the direct parent otherwise).
    pub parent_pdg: i32,
    /// Whether this channel is a fromTau cascade.
    pub from_tau: bool,
    /// Number of event rows folded into this channel.
    pub n_events: usize,
    /// Production cross-section, pb.
    pub sigma_pb: f64,
    /// Effective branching ratio applied (`BR(parent -> lN)` directly, or
    /// `BR(parent -> tau nu) * BR(tau -> NX)` for fromTau).
    pub br_effective: f64,
    /// Weighted geometric x decay acceptance,
    /// `sum(weight * P_decay) / sum(weight)`.
    pub epsilon: f64,
    /// This channel's contribution to `N_sig`.
    pub n_sig: f64,
}

/// The kernel's output at one `|U|^2` point.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalResult {
    /// The `|U|^2` point evaluated.
    pub u2: f64,
    /// Total expected signal, summed over every production channel.
    pub n_sig_total: f64,
    /// Per-parent decomposition, sorted by `(parent_pdg, from_tau)` for
    /// determinism.
    pub contributions: Vec<ParentContribution>,
    /// Rows whose parent PDG had no theory BR coverage
    /// (`spec.md §4.5.1` Diagnostics).
    pub missing_br_rows: usize,
    /// Rows whose parent PDG had no cross-section coverage.
    pub missing_sigma_rows: usize,
}

/// Numerically stable per-event decay-in-volume probability,
/// `spec.md §4.5.1`:
///
/// `P_decay = exp(-entry_distance/lambda) * (1 - exp(-path_length/lambda))`
///
/// computed as `exp(A) * (-expm1(B))` to preserve accuracy when
/// `path_length << lambda`. `lambda` is floored at [`LAMBDA_FLOOR_M`].
#[must_use]
pub fn decay_probability(entry_distance_m: f64, path_length_m: f64, lambda_m: f64) -> f64 {
    let lambda = lambda_m.max(LAMBDA_FLOOR_M);
    let a = -entry_distance_m / lambda;
    let b = -path_length_m / lambda;
    (a.exp() * (-b.exp_m1())).clamp(0.0, 1.0)
}

/// Production-channel key: `None` for a direct parent, `Some(grandparent)`
/// for a fromTau cascade grouped by its grandparent meson
/// (`spec.md §4.5.1` step 1: "partition further by `tau_parent_id`").
type ChannelKey = (i32, bool);

fn channel_key(parent_pdg: i32, tau_parent_id: i32) -> ChannelKey {
    if parent_pdg.abs() == 15 {
        (tau_parent_id.abs(), true)
    } else {
        (parent_pdg.abs(), false)
    }
}

/// Evaluates the signal kernel at a single `|U|^2` point, per
/// `spec.md §4.5.1`. When `log_diagnostics` is set, emits one `tracing`
/// warning per missing-coverage category (callers scanning a grid should
/// set this only for the first grid point, per the spec's diagnostics
/// policy).
#[must_use]
pub fn signal_kernel(cfg: &KernelConfig<'_>, geometry: &GeometryTable, u2: f64, log_diagnostics: bool) -> SignalResult {
    let u_ref_sq = norm_squared(cfg.u_ref);
    let ctau0_m = scale_ctau0(cfg.anchor.ctau0_ref_m, u_ref_sq, u2);

    let n = geometry.len();
    let mut channels: BTreeMap<ChannelKey, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        let key = channel_key(geometry.events.parent_pdg[i], geometry.events.tau_parent_id[i]);
        channels.entry(key).or_default().push(i);
    }

    let mut contributions = Vec::with_capacity(channels.len());
    let mut missing_br_rows = 0usize;
    let mut missing_sigma_rows = 0usize;
    let mut n_sig_total = 0.0;

    for ((pdg, from_tau), rows) in channels {
        let sigma_pb = cfg.xsec.sigma_parent(pdg);
        if sigma_pb == 0.0 {
            missing_sigma_rows += rows.len();
        }

        let br_effective = if from_tau {
            let br_taunu = cfg.xsec.br_parent_to_taunu(pdg);
            let br_tau_to_n = scale_br(cfg.anchor.br_tau_to_n, u_ref_sq, u2);
            if cfg.anchor.br_tau_to_n == 0.0 {
                missing_br_rows += rows.len();
            }
            br_taunu * br_tau_to_n
        } else {
            let br_ref = cfg.anchor.br_parent(pdg);
            if br_ref == 0.0 {
                missing_br_rows += rows.len();
            }
            scale_br(br_ref, u_ref_sq, u2)
        };

        let mut weight_sum = 0.0;
        let mut weighted_p_sum = 0.0;
        for &i in &rows {
            let w = geometry.events.weight[i];
            weight_sum += w;
            if geometry.hits_tube[i] && geometry.beta_gamma[i] > 0.0 {
                let lambda = geometry.beta_gamma[i] * ctau0_m;
                let p = decay_probability(geometry.entry_distance_m[i], geometry.path_length_m[i], lambda);
                weighted_p_sum += w * p;
            }
        }
        let epsilon = if weight_sum > 0.0 { weighted_p_sum / weight_sum } else { 0.0 };

        let n_sig = cfg.luminosity_fb_inv * sigma_pb * PB_TO_FB * br_effective * epsilon;
        n_sig_total += n_sig;
        contributions.push(ParentContribution {
            parent_pdg: pdg,
            from_tau,
            n_events: rows.len(),
            sigma_pb,
            br_effective,
            epsilon,
            n_sig,
        });
    }

    if log_diagnostics {
        if missing_sigma_rows > 0 {
            warn!(count = missing_sigma_rows, "rows with no cross-section coverage for their parent PDG");
        }
        if missing_br_rows > 0 {
            warn!(count = missing_br_rows, "rows with no branching-ratio coverage for their parent PDG");
        }
    }

    SignalResult { u2, n_sig_total, contributions, missing_br_rows, missing_sigma_rows }
}

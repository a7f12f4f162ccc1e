//! The simulated-HNL event record and the columnar table that holds many
//! of them.
//!
//! Rows are stored structure-of-arrays rather than array-of-structs: every
//! per-event operation downstream (geometry, decay probability, per-parent
//! accumulation) reduces over a single column or a handful of them, and
//! nothing needs a materialised single-event object. [`EventTable::row`]
//! offers an array-of-structs-shaped view for the rare call site that wants
//! one.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// PDG code of the heavy neutral lepton. Rows in a raw event file that
/// carry a different `hnl_id` must have been generated for a different
/// particle and are filtered out on load.
pub const HNL_PDG: i32 = 9_900_012;

/// Absolute PDG codes of grandparent mesons valid for the fromTau chain.
pub const TAU_GRANDPARENTS: [i32; 5] = [431, 511, 521, 531, 541];

/// One row of a raw event CSV, before geometry augmentation.
///
/// Field names mirror the CSV header of `spec.md §6` rather than Rust
/// convention (`prod_x_mm`, not `prod_x`) so that `serde`'s CSV mapping
/// needs no per-field rename outside the two columns whose header differs
/// from their Rust name (`event` and `E`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Collision index; not unique per row.
    #[serde(rename = "event")]
    pub event_id: i64,
    /// Relative Monte Carlo weight.
    pub weight: f64,
    /// HNL PDG code; expected to equal [`HNL_PDG`].
    pub hnl_id: i32,
    /// Signed PDG code of the physical parent.
    pub parent_pdg: i32,
    /// Absolute PDG of the grandparent meson for fromTau events, else 0.
    pub tau_parent_id: i32,
    /// Transverse momentum, GeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle, radians.
    pub phi: f64,
    /// Total momentum, GeV.
    pub p: f64,
    /// Total energy, GeV.
    #[serde(rename = "E")]
    pub e: f64,
    /// Nominal HNL mass, GeV.
    pub mass: f64,
    /// Production vertex x, mm.
    pub prod_x_mm: f64,
    /// Production vertex y, mm.
    pub prod_y_mm: f64,
    /// Production vertex z, mm.
    pub prod_z_mm: f64,
    /// `p / mass`, as supplied by the generator (re-derived by the
    /// geometry engine rather than trusted downstream).
    pub beta_gamma: f64,
}

/// A read-only view of a single row, for call sites that want an
/// array-of-structs shape (diagnostics, tests).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRow {
    /// See [`EventRecord`].
    pub event_id: i64,
    /// See [`EventRecord`].
    pub weight: f64,
    /// See [`EventRecord`].
    pub parent_pdg: i32,
    /// See [`EventRecord`].
    pub tau_parent_id: i32,
    /// See [`EventRecord`].
    pub pt: f64,
    /// See [`EventRecord`].
    pub eta: f64,
    /// See [`EventRecord`].
    pub phi: f64,
    /// See [`EventRecord`].
    pub p: f64,
    /// See [`EventRecord`].
    pub e: f64,
    /// See [`EventRecord`].
    pub mass: f64,
    /// See [`EventRecord`].
    pub prod_x_mm: f64,
    /// See [`EventRecord`].
    pub prod_y_mm: f64,
    /// See [`EventRecord`].
    pub prod_z_mm: f64,
}

/// Columnar table of simulated-HNL events, one column per [`EventRecord`]
/// field (minus `hnl_id`, which has done its job as a load-time filter and
/// carries no further information once every row shares it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTable {
    /// Collision indices.
    pub event_id: Vec<i64>,
    /// Relative MC weights.
    pub weight: Vec<f64>,
    /// Signed parent PDG codes.
    pub parent_pdg: Vec<i32>,
    /// Absolute grandparent PDG for fromTau rows, else 0.
    pub tau_parent_id: Vec<i32>,
    /// Transverse momenta, GeV.
    pub pt: Vec<f64>,
    /// Pseudorapidities.
    pub eta: Vec<f64>,
    /// Azimuthal angles, radians.
    pub phi: Vec<f64>,
    /// Total momenta, GeV.
    pub p: Vec<f64>,
    /// Total energies, GeV.
    pub e: Vec<f64>,
    /// Nominal HNL masses, GeV.
    pub mass: Vec<f64>,
    /// Production vertex x, mm.
    pub prod_x_mm: Vec<f64>,
    /// Production vertex y, mm.
    pub prod_y_mm: Vec<f64>,
    /// Production vertex z, mm.
    pub prod_z_mm: Vec<f64>,
}

/// Counts of rows dropped while loading or validating an [`EventTable`],
/// reported once per (mass, flavour) unit rather than per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadDiagnostics {
    /// Rows filtered out because `hnl_id != HNL_PDG`.
    pub wrong_particle: usize,
    /// Rows dropped for non-finite weight, momentum, or mass.
    pub non_finite: usize,
    /// Rows dropped for `mass <= 0`.
    pub non_positive_mass: usize,
    /// fromTau rows (`|parent_pdg| == 15`) whose `tau_parent_id` was not
    /// one of [`TAU_GRANDPARENTS`].
    pub invalid_tau_grandparent: usize,
}

impl LoadDiagnostics {
    /// Total number of rows affected across all categories.
    #[must_use]
    pub const fn total_dropped(&self) -> usize {
        self.non_finite + self.non_positive_mass
    }

    fn log_if_any(&self, source: &str) {
        if self.wrong_particle > 0 {
            warn!(source, count = self.wrong_particle, "rows with hnl_id != HNL_PDG filtered");
        }
        if self.non_finite > 0 {
            warn!(source, count = self.non_finite, "rows with non-finite columns dropped");
        }
        if self.non_positive_mass > 0 {
            warn!(source, count = self.non_positive_mass, "rows with mass <= 0 dropped");
        }
        if self.invalid_tau_grandparent > 0 {
            warn!(
                source,
                count = self.invalid_tau_grandparent,
                "fromTau rows with an unrecognised grandparent meson"
            );
        }
    }
}

impl EventTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.event_id.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_id.is_empty()
    }

    /// A struct-shaped view of row `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> EventRow {
        EventRow {
            event_id: self.event_id[i],
            weight: self.weight[i],
            parent_pdg: self.parent_pdg[i],
            tau_parent_id: self.tau_parent_id[i],
            pt: self.pt[i],
            eta: self.eta[i],
            phi: self.phi[i],
            p: self.p[i],
            e: self.e[i],
            mass: self.mass[i],
            prod_x_mm: self.prod_x_mm[i],
            prod_y_mm: self.prod_y_mm[i],
            prod_z_mm: self.prod_z_mm[i],
        }
    }

    fn push_record(&mut self, rec: EventRecord) {
        self.event_id.push(rec.event_id);
        self.weight.push(rec.weight);
        self.parent_pdg.push(rec.parent_pdg);
        self.tau_parent_id.push(rec.tau_parent_id);
        self.pt.push(rec.pt);
        self.eta.push(rec.eta);
        self.phi.push(rec.phi);
        self.p.push(rec.p);
        self.e.push(rec.e);
        self.mass.push(rec.mass);
        self.prod_x_mm.push(rec.prod_x_mm);
        self.prod_y_mm.push(rec.prod_y_mm);
        self.prod_z_mm.push(rec.prod_z_mm);
    }

    /// Appends the rows of `other` to `self`, preserving order. Used by the
    /// sample combiner to concatenate additive regimes.
    pub fn extend_from(&mut self, other: &Self) {
        self.event_id.extend_from_slice(&other.event_id);
        self.weight.extend_from_slice(&other.weight);
        self.parent_pdg.extend_from_slice(&other.parent_pdg);
        self.tau_parent_id.extend_from_slice(&other.tau_parent_id);
        self.pt.extend_from_slice(&other.pt);
        self.eta.extend_from_slice(&other.eta);
        self.phi.extend_from_slice(&other.phi);
        self.p.extend_from_slice(&other.p);
        self.e.extend_from_slice(&other.e);
        self.mass.extend_from_slice(&other.mass);
        self.prod_x_mm.extend_from_slice(&other.prod_x_mm);
        self.prod_y_mm.extend_from_slice(&other.prod_y_mm);
        self.prod_z_mm.extend_from_slice(&other.prod_z_mm);
    }

    /// Sorts all rows by `event_id`, stably. Part of making floating-point
    /// summation order deterministic across loaders and platforms.
    pub fn sort_by_event_id(&mut self) {
        let mut idx: Vec<usize> = (0..self.len()).collect();
        idx.sort_by_key(|&i| self.event_id[i]);
        self.reorder(&idx);
    }

    fn reorder(&mut self, idx: &[usize]) {
        macro_rules! apply {
            ($field:ident) => {
                self.$field = idx.iter().map(|&i| self.$field[i]).collect();
            };
        }
        apply!(event_id);
        apply!(weight);
        apply!(parent_pdg);
        apply!(tau_parent_id);
        apply!(pt);
        apply!(eta);
        apply!(phi);
        apply!(p);
        apply!(e);
        apply!(mass);
        apply!(prod_x_mm);
        apply!(prod_y_mm);
        apply!(prod_z_mm);
    }

    /// Loads an [`EventTable`] from a CSV file, filtering non-HNL rows and
    /// rows that violate the invariants of `spec.md §3`. Returns the table
    /// plus a diagnostics summary; the caller decides whether to log it
    /// (callers processing many files usually want one aggregated log line
    /// per (mass, flavour) unit, not one per file).
    pub fn load_csv(path: impl AsRef<Path>) -> Result<(Self, LoadDiagnostics)> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let mut table = Self::default();
        let mut diag = LoadDiagnostics::default();

        for result in reader.deserialize() {
            let rec: EventRecord = result?;
            if rec.hnl_id != HNL_PDG {
                diag.wrong_particle += 1;
                continue;
            }
            if !rec.weight.is_finite()
                || !rec.pt.is_finite()
                || !rec.eta.is_finite()
                || !rec.phi.is_finite()
                || !rec.p.is_finite()
                || !rec.e.is_finite()
                || !rec.mass.is_finite()
                || !rec.prod_x_mm.is_finite()
                || !rec.prod_y_mm.is_finite()
                || !rec.prod_z_mm.is_finite()
            {
                diag.non_finite += 1;
                continue;
            }
            if rec.mass <= 0.0 {
                diag.non_positive_mass += 1;
                continue;
            }
            if rec.parent_pdg.abs() == 15 && !TAU_GRANDPARENTS.contains(&rec.tau_parent_id) {
                diag.invalid_tau_grandparent += 1;
            }
            table.push_record(rec);
        }

        diag.log_if_any(&path.display().to_string());
        table.sort_by_event_id();
        Ok((table, diag))
    }

    /// Writes the table back out in the CSV format of `spec.md §6`, for
    /// round-trip tests and for inspecting a combined sample
    /// (`hnl_sens_cli`'s `combine` subcommand). `beta_gamma` is recomputed
    /// as `p / mass` rather than trusted from the original input, matching
    /// the convention that it is re-derived downstream rather than stored.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for i in 0..self.len() {
            writer.serialize(EventRecord {
                event_id: self.event_id[i],
                weight: self.weight[i],
                hnl_id: HNL_PDG,
                parent_pdg: self.parent_pdg[i],
                tau_parent_id: self.tau_parent_id[i],
                pt: self.pt[i],
                eta: self.eta[i],
                phi: self.phi[i],
                p: self.p[i],
                e: self.e[i],
                mass: self.mass[i],
                prod_x_mm: self.prod_x_mm[i],
                prod_y_mm: self.prod_y_mm[i],
                prod_z_mm: self.prod_z_mm[i],
                beta_gamma: self.p[i] / self.mass[i],
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Validates `spec.md §3`'s invariants over an already-constructed
    /// table, for tables assembled in memory (tests, the combiner) rather
    /// than loaded fresh from CSV.
    #[must_use]
    pub fn validate(&self) -> LoadDiagnostics {
        let mut diag = LoadDiagnostics::default();
        for i in 0..self.len() {
            if self.mass[i] <= 0.0 {
                diag.non_positive_mass += 1;
            }
            if self.parent_pdg[i].abs() == 15 && !TAU_GRANDPARENTS.contains(&self.tau_parent_id[i])
            {
                diag.invalid_tau_grandparent += 1;
            }
        }
        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(event_id: i64, parent_pdg: i32) -> EventRecord {
        EventRecord {
            event_id,
            weight: 1.0,
            hnl_id: HNL_PDG,
            parent_pdg,
            tau_parent_id: 0,
            pt: 1.0,
            eta: 0.5,
            phi: 0.1,
            p: 4.0,
            e: 4.1,
            mass: 1.0,
            prod_x_mm: 0.0,
            prod_y_mm: 0.0,
            prod_z_mm: 0.0,
            beta_gamma: 4.0,
        }
    }

    #[test]
    fn sort_by_event_id_is_stable_and_total() {
        let mut table = EventTable::default();
        table.push_record(sample_row(3, 511));
        table.push_record(sample_row(1, 511));
        table.push_record(sample_row(2, -531));
        table.sort_by_event_id();
        assert_eq!(table.event_id, vec![1, 2, 3]);
    }

    #[test]
    fn validate_flags_bad_tau_grandparent() {
        let mut table = EventTable::default();
        let mut bad = sample_row(1, 15);
        bad.tau_parent_id = 321; // not a valid grandparent
        table.push_record(bad);
        let diag = table.validate();
        assert_eq!(diag.invalid_tau_grandparent, 1);
    }

    #[test]
    fn write_then_load_csv_round_trips() {
        let mut table = EventTable::default();
        table.push_record(sample_row(1, 511));
        table.push_record(sample_row(2, -531));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.csv");
        table.write_csv(&path).unwrap();
        let (loaded, diag) = EventTable::load_csv(&path).unwrap();

        assert_eq!(diag.total_dropped(), 0);
        assert_eq!(loaded.event_id, table.event_id);
        assert_eq!(loaded.parent_pdg, table.parent_pdg);
        assert_eq!(loaded.mass, table.mass);
    }

    #[test]
    fn extend_from_concatenates_columns() {
        let mut a = EventTable::default();
        a.push_record(sample_row(1, 511));
        let mut b = EventTable::default();
        b.push_record(sample_row(2, -531));
        a.extend_from(&b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.parent_pdg, vec![511, -531]);
    }
}

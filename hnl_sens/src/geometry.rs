//! C2: the geometry engine.
//!
//! Ray-traces each simulated HNL through a fixed [`DetectorMesh`], per
//! `spec.md §4.2`, and produces the geometry columns of `spec.md §3`:
//! `hits_tube`, `entry_distance`, `path_length`, `beta_gamma`.

use crate::config::PATH_LENGTH_TOLERANCE_M;
use crate::event::EventTable;
use crate::mesh::DetectorMesh;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Converts pseudorapidity to polar angle, `theta = 2 atan(e^{-eta})`.
#[must_use]
pub fn eta_to_theta(eta: f64) -> f64 {
    2.0 * (-eta).exp().atan()
}

/// Unit direction vector for a ray with transverse momentum direction
/// `phi` and pseudorapidity `eta`.
#[must_use]
pub fn direction_from_pt_eta_phi(eta: f64, phi: f64) -> [f64; 3] {
    let theta = eta_to_theta(eta);
    [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()]
}

/// An [`EventTable`] augmented with the geometry columns of `spec.md §3`.
/// Produced once per (mass, flavour, detector) combination and then
/// read-only; see [`crate::cache`] for the disk-backed memoisation of this
/// computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryTable {
    /// The underlying event columns (production kinematics, parentage).
    pub events: EventTable,
    /// Whether the ray hit both an entry and an exit face of the mesh.
    pub hits_tube: Vec<bool>,
    /// Distance from the production vertex to the entry intersection,
    /// metres. Zero for rows that miss.
    pub entry_distance_m: Vec<f64>,
    /// Chord length through the volume, metres. Zero for rows that miss
    /// or whose raw chord falls below [`PATH_LENGTH_TOLERANCE_M`].
    pub path_length_m: Vec<f64>,
    /// `p / mass`, re-derived rather than trusted from the input file.
    pub beta_gamma: Vec<f64>,
}

impl GeometryTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Writes the event columns plus the four geometry columns of
    /// `spec.md §3` to a CSV file, for inspection by
    /// `hnl_sens_cli`'s `geometry` subcommand and for round-trip tests.
    pub fn write_csv(&self, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for i in 0..self.len() {
            writer.serialize(GeometryRecord {
                event_id: self.events.event_id[i],
                weight: self.events.weight[i],
                parent_pdg: self.events.parent_pdg[i],
                tau_parent_id: self.events.tau_parent_id[i],
                mass: self.events.mass[i],
                hits_tube: self.hits_tube[i],
                entry_distance_m: self.entry_distance_m[i],
                path_length_m: self.path_length_m[i],
                beta_gamma: self.beta_gamma[i],
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads back a table written by [`GeometryTable::write_csv`]. Columns
    /// not carried by [`GeometryRecord`] (kinematics beyond what the
    /// signal kernel consumes) are left at their zero default: nothing
    /// downstream of the kernel reads them.
    pub fn read_csv(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut table = Self::default();
        for result in reader.deserialize() {
            let rec: GeometryRecord = result?;
            table.events.event_id.push(rec.event_id);
            table.events.weight.push(rec.weight);
            table.events.parent_pdg.push(rec.parent_pdg);
            table.events.tau_parent_id.push(rec.tau_parent_id);
            table.events.pt.push(0.0);
            table.events.eta.push(0.0);
            table.events.phi.push(0.0);
            table.events.p.push(0.0);
            table.events.e.push(0.0);
            table.events.mass.push(rec.mass);
            table.events.prod_x_mm.push(0.0);
            table.events.prod_y_mm.push(0.0);
            table.events.prod_z_mm.push(0.0);
            table.hits_tube.push(rec.hits_tube);
            table.entry_distance_m.push(rec.entry_distance_m);
            table.path_length_m.push(rec.path_length_m);
            table.beta_gamma.push(rec.beta_gamma);
        }
        Ok(table)
    }
}

/// One row of a geometry-augmented table, for CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// See [`crate::event::EventRecord`].
    pub event_id: i64,
    /// See [`crate::event::EventRecord`].
    pub weight: f64,
    /// See [`crate::event::EventRecord`].
    pub parent_pdg: i32,
    /// See [`crate::event::EventRecord`].
    pub tau_parent_id: i32,
    /// See [`crate::event::EventRecord`].
    pub mass: f64,
    /// See [`GeometryTable::hits_tube`].
    pub hits_tube: bool,
    /// See [`GeometryTable::entry_distance_m`].
    pub entry_distance_m: f64,
    /// See [`GeometryTable::path_length_m`].
    pub path_length_m: f64,
    /// See [`GeometryTable::beta_gamma`].
    pub beta_gamma: f64,
}

/// Computes the geometry columns for every row of `events` against
/// `mesh`, per `spec.md §4.2`'s algorithm:
///
/// 1. Form a unit direction from `(eta, phi)`.
/// 2. Intersect the ray, originating at the production vertex (converted
///    mm -> m), with the mesh.
/// 3. `entry_distance = t_entry`, `path_length = max(0, t_exit - t_entry)`,
///    `hits_tube = both intersections exist`.
/// 4. `beta_gamma = p / mass`.
///
/// Rays parallel to or missing the mesh get `hits_tube = false` and zeroed
/// geometry fields; such rows later contribute zero signal.
#[must_use]
pub fn compute_geometry(events: &EventTable, mesh: &DetectorMesh) -> GeometryTable {
    let n = events.len();
    let mut hits_tube = Vec::with_capacity(n);
    let mut entry_distance_m = Vec::with_capacity(n);
    let mut path_length_m = Vec::with_capacity(n);
    let mut beta_gamma = Vec::with_capacity(n);

    const MM_PER_M: f64 = 1000.0;

    for i in 0..n {
        let origin = [
            events.prod_x_mm[i] / MM_PER_M,
            events.prod_y_mm[i] / MM_PER_M,
            events.prod_z_mm[i] / MM_PER_M,
        ];
        let dir = direction_from_pt_eta_phi(events.eta[i], events.phi[i]);

        match mesh.intersect(origin, dir) {
            Some((t_entry, t_exit)) if t_entry > 0.0 => {
                let chord = (t_exit - t_entry).max(0.0);
                let chord = if chord < PATH_LENGTH_TOLERANCE_M { 0.0 } else { chord };
                hits_tube.push(true);
                entry_distance_m.push(t_entry);
                path_length_m.push(chord);
            }
            _ => {
                hits_tube.push(false);
                entry_distance_m.push(0.0);
                path_length_m.push(0.0);
            }
        }

        let mass = events.mass[i];
        // `EventTable::load_csv` already drops mass <= 0 rows; this guard
        // covers tables assembled directly in memory that skip that check.
        let bg = if mass > 0.0 {
            events.p[i] / mass
        } else {
            warn!(row = i, "mass <= 0 in geometry pass, beta_gamma set to 0");
            0.0
        };
        beta_gamma.push(bg);
    }

    let n_miss = hits_tube.iter().filter(|&&h| !h).count();
    if n_miss > 0 {
        warn!(count = n_miss, total = n, "rows whose ray misses the detector mesh");
    }

    GeometryTable {
        events: events.clone(),
        hits_tube,
        entry_distance_m,
        path_length_m,
        beta_gamma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventRecord;

    fn straight_row(eta: f64, phi: f64, p: f64, mass: f64) -> EventRecord {
        EventRecord {
            event_id: 0,
            weight: 1.0,
            hnl_id: crate::event::HNL_PDG,
            parent_pdg: 511,
            tau_parent_id: 0,
            pt: 1.0,
            eta,
            phi,
            p,
            e: p,
            mass,
            prod_x_mm: 0.0,
            prod_y_mm: 0.0,
            prod_z_mm: 0.0,
            beta_gamma: 0.0,
        }
    }

    fn push(table: &mut EventTable, rec: EventRecord) {
        table.event_id.push(rec.event_id);
        table.weight.push(rec.weight);
        table.parent_pdg.push(rec.parent_pdg);
        table.tau_parent_id.push(rec.tau_parent_id);
        table.pt.push(rec.pt);
        table.eta.push(rec.eta);
        table.phi.push(rec.phi);
        table.p.push(rec.p);
        table.e.push(rec.e);
        table.mass.push(rec.mass);
        table.prod_x_mm.push(rec.prod_x_mm);
        table.prod_y_mm.push(rec.prod_y_mm);
        table.prod_z_mm.push(rec.prod_z_mm);
    }

    #[test]
    fn ray_along_tube_axis_hits() {
        let mesh = DetectorMesh::capped_cylinder_tube(1.54, 22.0, 100.0, 32);
        // eta = 0 -> theta = pi/2, phi = 0 -> direction along +x.
        let mut events = EventTable::default();
        push(&mut events, straight_row(0.0, 0.0, 8.0, 2.0));
        let geom = compute_geometry(&events, &mesh);
        assert!(geom.hits_tube[0]);
        assert!((geom.entry_distance_m[0] - 22.0).abs() < 1e-6);
        assert!((geom.path_length_m[0] - 100.0).abs() < 1e-6);
        assert!((geom.beta_gamma[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn ray_straight_up_misses() {
        let mesh = DetectorMesh::capped_cylinder_tube(1.54, 22.0, 100.0, 32);
        // eta = +inf-ish (large) -> theta -> 0, direction along +z, never
        // reaches the tube's x range.
        let mut events = EventTable::default();
        push(&mut events, straight_row(5.0, 0.3, 8.0, 2.0));
        let geom = compute_geometry(&events, &mesh);
        assert!(!geom.hits_tube[0]);
        assert_eq!(geom.entry_distance_m[0], 0.0);
        assert_eq!(geom.path_length_m[0], 0.0);
    }

    #[test]
    fn write_csv_round_trips_geometry_columns() {
        let mesh = DetectorMesh::capped_cylinder_tube(1.54, 22.0, 100.0, 32);
        let mut events = EventTable::default();
        push(&mut events, straight_row(0.0, 0.0, 8.0, 2.0));
        let geom = compute_geometry(&events, &mesh);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geom.csv");
        geom.write_csv(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<GeometryRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hits_tube, geom.hits_tube[0]);
        assert!((rows[0].entry_distance_m - geom.entry_distance_m[0]).abs() < 1e-12);
        assert!((rows[0].path_length_m - geom.path_length_m[0]).abs() < 1e-12);
    }

    #[test]
    fn read_csv_recovers_kernel_inputs() {
        let mesh = DetectorMesh::capped_cylinder_tube(1.54, 22.0, 100.0, 32);
        let mut events = EventTable::default();
        push(&mut events, straight_row(0.0, 0.0, 8.0, 2.0));
        let geom = compute_geometry(&events, &mesh);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geom.csv");
        geom.write_csv(&path).unwrap();
        let loaded = GeometryTable::read_csv(&path).unwrap();

        assert_eq!(loaded.hits_tube, geom.hits_tube);
        assert_eq!(loaded.events.parent_pdg, geom.events.parent_pdg);
        assert!((loaded.beta_gamma[0] - geom.beta_gamma[0]).abs() < 1e-12);
    }

    #[test]
    fn eta_zero_is_transverse() {
        assert!((eta_to_theta(0.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}

//! Detector mesh and the ray/triangle intersection primitive the geometry
//! engine (C2) builds on.
//!
//! `spec.md §6` abstracts the detector as "a static 3D surface mesh
//! (format abstracted; any triangulated closed surface suffices)" exposing
//! a single "intersect ray with mesh" primitive. This module provides that
//! primitive (Möller-Trumbore ray/triangle intersection, looped over every
//! face — the detector mesh used here has a few hundred faces, so no
//! acceleration structure is warranted) plus a constructor for the default
//! detector geometry of `spec.md §6`: a curved tube at z≈22 m above the
//! interaction point, horizontal extent ≈100 m, effective radius
//! [`crate::config::detector_effective_radius_m`].

use crate::config::{
    DETECTOR_HORIZONTAL_EXTENT_M, DETECTOR_Z_NEAR_M, detector_effective_radius_m,
};
use crate::error::{Error, Result};
use std::f64::consts::TAU;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A 3-vector in metres.
pub type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// A single triangular face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub v0: Vec3,
    /// Second vertex.
    pub v1: Vec3,
    /// Third vertex.
    pub v2: Vec3,
}

const MOLLER_TRUMBORE_EPSILON: f64 = 1e-12;

impl Triangle {
    /// Möller-Trumbore ray/triangle intersection. Returns the ray
    /// parameter `t` of the intersection point if the ray (not
    /// necessarily normalised) hits the triangle at `t > 0`.
    #[must_use]
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f64> {
        let edge1 = sub(self.v1, self.v0);
        let edge2 = sub(self.v2, self.v0);
        let pvec = cross(dir, edge2);
        let det = dot(edge1, pvec);
        if det.abs() < MOLLER_TRUMBORE_EPSILON {
            return None; // ray parallel to the triangle's plane
        }
        let inv_det = 1.0 / det;
        let tvec = sub(origin, self.v0);
        let u = dot(tvec, pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = cross(tvec, edge1);
        let v = dot(dir, qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = dot(edge2, qvec) * inv_det;
        if t > 0.0 { Some(t) } else { None }
    }
}

/// A static, triangulated closed surface representing the detector
/// volume.
#[derive(Debug, Clone)]
pub struct DetectorMesh {
    triangles: Vec<Triangle>,
}

impl DetectorMesh {
    /// Number of triangular faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// A stable hash of the mesh's geometry, used as the detector
    /// component of a geometry-cache key (`spec.md §5`).
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = rustc_hash::FxHasher::default();
        self.triangles.len().hash(&mut hasher);
        for tri in &self.triangles {
            for v in [tri.v0, tri.v1, tri.v2] {
                for c in v {
                    c.to_bits().hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }

    /// Builds a capped cylindrical tube: the default detector geometry of
    /// `spec.md §6`. The axis runs horizontally along x at height
    /// `z = z_near`, `y = 0`, from `x = z_near` (tube starts where the
    /// line of sight first reaches the transverse plane) to
    /// `x = z_near + horizontal_extent`. `segments` controls the
    /// triangulation density of the curved wall and both caps.
    #[must_use]
    pub fn capped_cylinder_tube(
        radius_m: f64,
        z_near_m: f64,
        horizontal_extent_m: f64,
        segments: usize,
    ) -> Self {
        let segments = segments.max(3);
        let x0 = z_near_m;
        let x1 = z_near_m + horizontal_extent_m;
        let y0 = 0.0;
        let z0 = 0.0;

        let ring = |x: f64| -> Vec<Vec3> {
            (0..segments)
                .map(|i| {
                    let theta = TAU * (i as f64) / (segments as f64);
                    [x, y0 + radius_m * theta.cos(), z0 + radius_m * theta.sin()]
                })
                .collect()
        };
        let ring0 = ring(x0);
        let ring1 = ring(x1);
        let center0: Vec3 = [x0, y0, z0];
        let center1: Vec3 = [x1, y0, z0];

        let mut triangles = Vec::with_capacity(segments * 4);
        for i in 0..segments {
            let j = (i + 1) % segments;
            // side wall: two triangles per quad
            triangles.push(Triangle {
                v0: ring0[i],
                v1: ring1[i],
                v2: ring1[j],
            });
            triangles.push(Triangle {
                v0: ring0[i],
                v1: ring1[j],
                v2: ring0[j],
            });
            // near cap
            triangles.push(Triangle {
                v0: center0,
                v1: ring0[j],
                v2: ring0[i],
            });
            // far cap
            triangles.push(Triangle {
                v0: center1,
                v1: ring1[i],
                v2: ring1[j],
            });
        }

        Self { triangles }
    }

    /// The default detector mesh named in `spec.md §6`.
    #[must_use]
    pub fn default_detector(segments: usize) -> Self {
        Self::capped_cylinder_tube(
            detector_effective_radius_m(),
            DETECTOR_Z_NEAR_M,
            DETECTOR_HORIZONTAL_EXTENT_M,
            segments,
        )
    }

    /// Loads a mesh from a minimal Wavefront-OBJ-like text format: lines
    /// `v x y z` define vertices, lines `f i j k` (1-based, matching OBJ
    /// convention) define triangular faces. Unsupported OBJ directives are
    /// ignored rather than rejected.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("mesh file {}: {e}", path.display())))?;
        let reader = BufReader::new(file);
        let mut vertices: Vec<Vec3> = Vec::new();
        let mut triangles = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("v") => {
                    let coords: Vec<f64> = tokens.filter_map(|t| t.parse().ok()).collect();
                    if coords.len() >= 3 {
                        vertices.push([coords[0], coords[1], coords[2]]);
                    }
                }
                Some("f") => {
                    let idx: Vec<usize> = tokens
                        .filter_map(|t| {
                            t.split('/').next().and_then(|n| n.parse::<usize>().ok())
                        })
                        .collect();
                    if idx.len() >= 3 {
                        let a = vertices.get(idx[0] - 1);
                        let b = vertices.get(idx[1] - 1);
                        let c = vertices.get(idx[2] - 1);
                        if let (Some(&v0), Some(&v1), Some(&v2)) = (a, b, c) {
                            triangles.push(Triangle { v0, v1, v2 });
                        }
                    }
                }
                _ => {}
            }
        }

        if triangles.is_empty() {
            return Err(Error::Configuration(format!(
                "mesh file {} contained no triangular faces",
                path.display()
            )));
        }

        Ok(Self { triangles })
    }

    /// Intersects a ray (`origin`, `dir`, `dir` need not be normalised)
    /// with the mesh. Returns `(t_entry, t_exit)` in units of `|dir|` if
    /// both a nearest and a farthest positive-`t` intersection exist;
    /// `None` otherwise (ray misses, or only grazes a single face).
    #[must_use]
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<(f64, f64)> {
        let mut hits: Vec<f64> = self
            .triangles
            .iter()
            .filter_map(|tri| tri.intersect(origin, dir))
            .collect();
        if hits.len() < 2 {
            return None;
        }
        hits.sort_by(f64::total_cmp);
        let t_entry = hits[0];
        let t_exit = *hits.last().unwrap();
        Some((t_entry, t_exit))
    }
}

//! Expected-signal kernel and exclusion solver for a heavy-neutral-lepton
//! (HNL) long-lived-particle search.
//!
//! Given Monte Carlo samples of simulated HNL kinematics produced from
//! many parent species (mesons, baryons, electroweak bosons, and
//! tau-decay cascades), this crate computes the expected number of
//! reconstructed signal events as a function of HNL mass and mixing
//! parameter, and inverts that function into a 95% CL exclusion interval
//! on the mixing squared `|U|^2` for each lepton-coupling flavour.
//!
//! The crate has no I/O-free event generator, theory calculator, or
//! plotting of its own; those are out of scope. It models:
//!
//! - [`xsec`] (C1): the parent cross-section registry.
//! - [`mesh`] and [`geometry`] (C2): the detector ray-tracing engine.
//! - [`combine`] (C3): the production-sample combiner.
//! - [`theory`] (C4): the theory-adapter abstraction and coupling
//!   scaling laws.
//! - [`kernel`] and [`solver`] (C5): the signal kernel and exclusion
//!   solver, the physics-bearing core.
//!
//! Supporting modules: [`event`] (the event record and columnar table),
//! [`config`] (named physical constants), [`error`] (the kind-tagged
//! error type), [`cache`] (the geometry disk cache), and [`flavour`]
//! (the lepton-coupling flavour axis).

pub mod cache;
pub mod combine;
pub mod config;
pub mod error;
pub mod event;
pub mod flavour;
pub mod geometry;
pub mod kernel;
pub mod mesh;
pub mod solver;
pub mod theory;
pub mod xsec;

pub use error::{Error, Result};
pub use flavour::Flavour;

//! The lepton-coupling flavour axis (`spec.md §1`, §6 naming convention).
//!
//! A benchmark scan fixes a single flavour; the reference coupling vector
//! `U_ref` of `spec.md §4.4` is the unit vector along that flavour's axis.

use std::fmt;
use std::str::FromStr;

/// One of the three lepton-coupling flavours an HNL may mix with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavour {
    /// Electron coupling, `U_e`.
    Electron,
    /// Muon coupling, `U_mu`.
    Muon,
    /// Tau coupling, `U_tau`.
    Tau,
}

impl Flavour {
    /// Lower-case name used in filenames and CLI arguments
    /// (`spec.md §6`: `electron`, `muon`, `tau`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electron => "electron",
            Self::Muon => "muon",
            Self::Tau => "tau",
        }
    }

    /// Index into a `(U_e, U_mu, U_tau)` 3-vector.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Electron => 0,
            Self::Muon => 1,
            Self::Tau => 2,
        }
    }

    /// The benchmark reference coupling: the unit vector along this
    /// flavour's axis, so `|U_ref|^2 = 1`.
    #[must_use]
    pub const fn unit_vector(self) -> [f64; 3] {
        match self {
            Self::Electron => [1.0, 0.0, 0.0],
            Self::Muon => [0.0, 1.0, 0.0],
            Self::Tau => [0.0, 0.0, 1.0],
        }
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`Flavour::from_str`] for an unrecognised string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flavour `{0}` (expected electron, muon, or tau)")]
pub struct UnknownFlavour(pub String);

impl FromStr for Flavour {
    type Err = UnknownFlavour;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electron" => Ok(Self::Electron),
            "muon" => Ok(Self::Muon),
            "tau" => Ok(Self::Tau),
            other => Err(UnknownFlavour(other.to_owned())),
        }
    }
}

/// Squared norm of a 3-vector coupling, `|U|^2 = U_e^2 + U_mu^2 + U_tau^2`.
#[must_use]
pub fn norm_squared(u: [f64; 3]) -> f64 {
    u[0].mul_add(u[0], u[1].mul_add(u[1], u[2] * u[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        for f in [Flavour::Electron, Flavour::Muon, Flavour::Tau] {
            assert_eq!(Flavour::from_str(f.as_str()).unwrap(), f);
        }
    }

    #[test]
    fn unrecognised_flavour_errors() {
        assert!(Flavour::from_str("gluon").is_err());
    }

    #[test]
    fn unit_vector_has_unit_norm() {
        assert!((norm_squared(Flavour::Muon.unit_vector()) - 1.0).abs() < 1e-12);
    }
}

#![allow(missing_docs)]

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn lists_known_parents() {
    Command::cargo_bin("hnl-sens")
        .unwrap()
        .arg("xsec")
        .assert()
        .success()
        .stdout(predicate::str::contains("PDG").and(predicate::str::contains("511")));
}

#[test]
fn restricts_to_a_single_pdg() {
    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args(["xsec", "--pdg", "511"])
        .assert()
        .success()
        // B0: sigma_bbbar * frag_B0 * particle/antiparticle factor = 5e8 * 0.40 * 2.0 = 4e8 pb.
        .stdout(predicate::str::contains("4.000e8"));
}

#[test]
fn unknown_pdg_reports_zero_cross_section() {
    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args(["xsec", "--pdg", "999999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.000e0"));
}

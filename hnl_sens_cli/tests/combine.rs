#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const HEADER: &str = "event,weight,hnl_id,parent_pdg,tau_parent_id,pt,eta,phi,p,E,mass,prod_x_mm,prod_y_mm,prod_z_mm,beta_gamma\n";

fn row(event: i64, parent_pdg: i32) -> String {
    format!("{event},1.0,9900012,{parent_pdg},0,1.2,0.1,0.0,5.0,5.2,2.6,0.0,0.0,0.0,1.923\n")
}

#[test]
fn combines_additive_regimes_into_one_table() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("HNL_2p60GeV_muon_kaon.csv")
        .write_str(&format!("{HEADER}{}{}", row(1, 321), row(2, 321)))
        .unwrap();
    dir.child("HNL_2p60GeV_muon_beauty.csv")
        .write_str(&format!("{HEADER}{}", row(3, 511)))
        .unwrap();

    let output = dir.child("combined.csv");

    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args([
            "combine",
            dir.path().to_str().unwrap(),
            "--mass-gev",
            "2.60",
            "--flavour",
            "muon",
            "--output",
        ])
        .arg(output.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files used"));

    output.assert(predicate::str::contains("parent_pdg"));
    let contents = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(contents.lines().count(), 4); // header + 3 rows
}

#[test]
fn overlapping_non_form_factor_samples_is_a_data_error() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("HNL_2p60GeV_muon_beauty.csv").write_str(&format!("{HEADER}{}", row(1, 511))).unwrap();
    // A second, differently-named file that parses to the same (mass, flavour, regime, mode).
    dir.child("HNL_2p6GeV_muon_beauty.csv").write_str(&format!("{HEADER}{}", row(2, 511))).unwrap();

    let output = dir.child("combined.csv");

    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args([
            "combine",
            dir.path().to_str().unwrap(),
            "--mass-gev",
            "2.60",
            "--flavour",
            "muon",
            "--output",
        ])
        .arg(output.path())
        .assert()
        .failure()
        .code(2);
}

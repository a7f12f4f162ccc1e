#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const GEOM_HEADER: &str = "event_id,weight,parent_pdg,tau_parent_id,mass,hits_tube,entry_distance_m,path_length_m,beta_gamma\n";

#[test]
fn scans_an_already_geometry_augmented_table() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("geometry.csv");
    // One row that clears the tube with a generous chord, one total miss.
    input
        .write_str(&format!(
            "{GEOM_HEADER}1,1.0,321,0,2.6,true,20.0,3.0,50.0\n2,1.0,321,0,2.6,false,0.0,0.0,50.0\n"
        ))
        .unwrap();

    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args([
            "scan",
            input.path().to_str().unwrap(),
            "--mass-gev",
            "2.60",
            "--flavour",
            "muon",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("peak Nsig"));
}

#[test]
fn appends_a_summary_row_with_header_written_once() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("geometry.csv");
    input.write_str(&format!("{GEOM_HEADER}1,1.0,321,0,2.6,true,20.0,3.0,50.0\n")).unwrap();
    let summary = dir.child("summary.csv");

    for _ in 0..2 {
        Command::cargo_bin("hnl-sens")
            .unwrap()
            .args([
                "scan",
                input.path().to_str().unwrap(),
                "--mass-gev",
                "2.60",
                "--flavour",
                "muon",
                "--summary-output",
            ])
            .arg(summary.path())
            .assert()
            .success();
    }

    let contents = std::fs::read_to_string(summary.path()).unwrap();
    assert_eq!(contents.lines().count(), 3); // one header, two appended rows
}

#[test]
fn missing_theory_table_argument_is_a_configuration_error() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("geometry.csv");
    input.write_str(&format!("{GEOM_HEADER}1,1.0,321,0,2.6,true,20.0,3.0,50.0\n")).unwrap();

    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args([
            "scan",
            input.path().to_str().unwrap(),
            "--mass-gev",
            "2.60",
            "--flavour",
            "muon",
            "--theory",
            "table",
        ])
        .assert()
        .failure()
        .code(1);
}

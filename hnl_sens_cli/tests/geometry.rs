#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const HEADER: &str = "event,weight,hnl_id,parent_pdg,tau_parent_id,pt,eta,phi,p,E,mass,prod_x_mm,prod_y_mm,prod_z_mm,beta_gamma\n";

fn row(event: i64, eta: f64) -> String {
    format!("{event},1.0,9900012,321,0,1.2,{eta},0.0,5.0,5.2,2.6,0.0,0.0,0.0,1.923\n")
}

#[test]
fn ray_traces_a_combined_table_through_the_default_detector() {
    let dir = assert_fs::TempDir::new().unwrap();
    let input = dir.child("combined.csv");
    input.write_str(&format!("{HEADER}{}{}{}", row(1, 0.2), row(2, 0.9), row(3, -0.4))).unwrap();

    let output = dir.child("geometry.csv");

    Command::cargo_bin("hnl-sens")
        .unwrap()
        .args([
            "geometry",
            input.path().to_str().unwrap(),
            "--output",
        ])
        .arg(output.path())
        .args(["--mass-gev", "2.60", "--flavour", "muon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rows").and(predicate::str::contains("faces")));

    let contents = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(contents.lines().count(), 4); // header + 3 rows
    assert!(contents.contains("hits_tube"));
}

#![allow(missing_docs)]

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn top_level_help_lists_every_subcommand() {
    Command::cargo_bin("hnl-sens")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("combine")
                .and(predicate::str::contains("geometry"))
                .and(predicate::str::contains("scan"))
                .and(predicate::str::contains("batch"))
                .and(predicate::str::contains("xsec")),
        );
}

#[test]
fn no_subcommand_prints_help_and_fails() {
    Command::cargo_bin("hnl-sens").unwrap().assert().failure();
}

#[test]
fn version_flag_succeeds() {
    Command::cargo_bin("hnl-sens").unwrap().arg("--version").assert().success();
}

#[test]
fn each_subcommand_help_succeeds() {
    for sub in ["combine", "geometry", "scan", "batch", "xsec"] {
        Command::cargo_bin("hnl-sens").unwrap().args([sub, "--help"]).assert().success();
    }
}

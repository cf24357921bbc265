use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn fr_be_case() -> Value {
    json!({
        "version": "1.0.0",
        "id": "fr_be",
        "buses": [
            { "id": 1, "name": "FR1", "voltageLevel": "VL_FR", "country": "FR" },
            { "id": 2, "name": "BE1", "voltageLevel": "VL_BE", "country": "BE" }
        ],
        "generators": [
            { "id": 1, "bus": 1, "targetP": 3000.0, "minP": 0.0, "maxP": 4000.0 },
            { "id": 2, "bus": 2, "targetP": 1500.0, "minP": 0.0, "maxP": 4000.0 }
        ],
        "loads": [
            { "id": 1, "bus": 1, "p0": 1800.0, "q0": 100.0 },
            { "id": 2, "bus": 2, "p0": 2700.0, "q0": 150.0 }
        ],
        "branches": [
            { "id": 1, "bus1": 1, "bus2": 2, "x": 0.1 },
            { "id": 2, "bus1": 1, "bus2": 2, "x": 0.1 }
        ]
    })
}

fn areas(fr_target: f64, be_target: f64) -> Value {
    json!({
        "areas": [
            { "name": "FR", "boundary": { "countries": ["FR"] },
              "scalable": { "generator": 1 }, "targetNetPosition": fr_target },
            { "name": "BE", "boundary": { "countries": ["BE"] },
              "scalable": { "generator": 2 }, "targetNetPosition": be_target }
        ]
    })
}

struct Fixture {
    dir: TempDir,
    case: PathBuf,
    areas: PathBuf,
}

fn fixture(areas_json: Value) -> Fixture {
    let dir = tempdir().unwrap();
    let case = dir.path().join("case.json");
    let areas = dir.path().join("areas.json");
    fs::write(&case, fr_be_case().to_string()).unwrap();
    fs::write(&areas, areas_json.to_string()).unwrap();
    Fixture { dir, case, areas }
}

fn gbal() -> Command {
    Command::cargo_bin("gbal").unwrap()
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn balance_commits_the_correction() {
    let fx = fixture(areas(1300.0, -1300.0));
    let out = fx.dir.path().join("balanced.json");
    let output = gbal()
        .args([
            "balance",
            path(&fx.case),
            "--areas",
            path(&fx.areas),
            "--format",
            "json",
            "--out",
            path(&out),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["status"], "SUCCESS");
    assert_eq!(result["iterationCount"], 2);
    let fr = result["balancedScalingMap"]["FR"].as_f64().unwrap();
    assert!((fr - 100.0).abs() < 1e-6);

    let balanced: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let target = balanced["generators"][0]["targetP"].as_f64().unwrap();
    assert!((target - 3100.0).abs() < 1e-6);
}

#[test]
fn balance_failure_exits_with_an_error() {
    let fx = fixture(areas(1300.0, -1400.0));
    let out = fx.dir.path().join("never.json");
    gbal()
        .args([
            "balance",
            path(&fx.case),
            "--areas",
            path(&fx.areas),
            "--max-iterations",
            "2",
            "--out",
            path(&out),
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed after 2 iteration(s)"))
        .stderr(predicate::str::contains("could not be balanced"));
    assert!(!out.exists());
}

#[test]
fn single_pass_balance_uses_static_areas() {
    let fx = fixture(json!({
        "areas": [
            { "name": "FR", "boundary": { "countries": ["FR"] }, "static": true,
              "scalable": { "generator": 1 }, "targetNetPosition": 1300.0 },
            { "name": "BE", "boundary": { "countries": ["BE"] }, "static": true,
              "scalable": "conformLoads", "targetNetPosition": -1300.0 }
        ]
    }));
    gbal()
        .args([
            "balance",
            path(&fx.case),
            "--areas",
            path(&fx.areas),
            "--single-pass",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("FR"))
        .stdout(predicate::str::contains("100.00"))
        .stdout(predicate::str::contains("Success after 1 iteration(s)"));
}

#[test]
fn net_position_reports_every_area() {
    let fx = fixture(areas(1300.0, -1300.0));
    let output = gbal()
        .args([
            "net-position",
            path(&fx.case),
            "--areas",
            path(&fx.areas),
            "--solve",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let positions: Value = serde_json::from_slice(&output).unwrap();
    let fr = positions[0]["netPosition"].as_f64().unwrap();
    let be_mismatch = positions[1]["mismatch"].as_f64().unwrap();
    assert!((fr - 1200.0).abs() < 1e-6);
    assert!((be_mismatch + 100.0).abs() < 1e-6);
}

#[test]
fn pf_dc_prints_flows_and_writes_the_solved_case() {
    let fx = fixture(areas(0.0, 0.0));
    let out = fx.dir.path().join("solved.json");
    gbal()
        .args(["pf", "dc", path(&fx.case), "--solver", "faer", "--out", path(&out)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converged"))
        .stdout(predicate::str::contains("600.00"));

    let solved: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let p1 = solved["branches"][0]["p1"].as_f64().unwrap();
    assert!((p1 - 600.0).abs() < 1e-6);
}

#[test]
fn malformed_inputs_are_reported() {
    let fx = fixture(json!({ "areas": [] }));
    gbal()
        .args(["balance", path(&fx.case), "--areas", path(&fx.areas)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no area defined"));

    gbal()
        .args(["pf", "dc", path(&fx.dir.path().join("missing.json"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

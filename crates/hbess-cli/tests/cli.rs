use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_flat_profile(path: &Path, power_w: f64) {
    let mut text = String::from("time (s),power (W)\n");
    for k in 0..=10 {
        text.push_str(&format!("{},{}\n", k * 360, power_w));
    }
    fs::write(path, text).unwrap();
}

#[test]
fn hbess_help_lists_commands() {
    Command::cargo_bin("hbess")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("size"))
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("cells"));
}

#[test]
fn hbess_cells_prints_presets() {
    Command::cargo_bin("hbess")
        .unwrap()
        .arg("cells")
        .assert()
        .success()
        .stdout(predicate::str::contains("HE reference"))
        .stdout(predicate::str::contains("HP reference"));
}

#[test]
fn hbess_cells_json_parses() {
    let output = Command::cargo_bin("hbess")
        .unwrap()
        .args(["cells", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["high_energy"]["unit_cost"], 62.0);
}

#[test]
fn hbess_profile_inspect_reports_energy() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("flat.csv");
    write_flat_profile(&csv, 10_000.0);

    // Trapezoid over 3600 s at 10 kW
    Command::cargo_bin("hbess")
        .unwrap()
        .args(["profile", "inspect", csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Samples"))
        .stdout(predicate::str::contains("10.000 kWh"));
}

#[test]
fn hbess_profile_inspect_missing_file_fails() {
    Command::cargo_bin("hbess")
        .unwrap()
        .args(["profile", "inspect", "/nonexistent/flat.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("opening load profile"));
}

#[test]
fn hbess_size_writes_json_report_and_series() {
    let dir = tempdir().unwrap();
    write_flat_profile(&dir.path().join("flat.csv"), 10_000.0);
    let scenario = dir.path().join("run.toml");
    fs::write(
        &scenario,
        r#"
[[profiles]]
path = "flat.csv"

[options]
voltage = { mode = "fixed", pack_voltage_v = 600.0 }
"#,
    )
    .unwrap();
    let out = dir.path().join("report.json");
    let series = dir.path().join("series");

    Command::cargo_bin("hbess")
        .unwrap()
        .args([
            "--log-level",
            "warn",
            "size",
            "--scenario",
            scenario.to_str().unwrap(),
            "--format",
            "json",
            "--out",
            out.to_str().unwrap(),
            "--series-dir",
            series.to_str().unwrap(),
        ])
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["relaxed"]["status"], "optimal");
    assert_eq!(report["relaxed"]["packs"][0]["series"], 163.0);

    let trace = fs::read_to_string(series.join("00_flat.csv")).unwrap();
    assert!(trace.starts_with("time (s),demand (W),HE power (W)"));
    // header + 12 SOC points
    assert_eq!(trace.lines().count(), 13);
}

#[test]
fn hbess_size_series_names_stay_inside_directory() {
    let dir = tempdir().unwrap();
    write_flat_profile(&dir.path().join("flat.csv"), 10_000.0);
    let scenario = dir.path().join("run.toml");
    fs::write(
        &scenario,
        r#"
[[profiles]]
path = "flat.csv"
name = "../escape"

[[profiles]]
path = "flat.csv"
name = "../escape"

[options]
voltage = { mode = "fixed", pack_voltage_v = 600.0 }
"#,
    )
    .unwrap();
    let series = dir.path().join("series");

    Command::cargo_bin("hbess")
        .unwrap()
        .args([
            "--log-level",
            "warn",
            "size",
            "--scenario",
            scenario.to_str().unwrap(),
            "--series-dir",
            series.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(series.join("00____escape.csv").is_file());
    assert!(series.join("01____escape.csv").is_file());
    assert!(!dir.path().join("escape.csv").exists());
    assert_eq!(fs::read_dir(&series).unwrap().count(), 2);
}

#[test]
fn hbess_size_rejects_empty_scenario() {
    let dir = tempdir().unwrap();
    let scenario = dir.path().join("empty.toml");
    fs::write(&scenario, "").unwrap();

    Command::cargo_bin("hbess")
        .unwrap()
        .args(["size", "--scenario", scenario.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no [[profiles]]"));
}

fn repo_path(relative: &str) -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

#[test]
fn hbess_size_bundled_scenario_prints_tables() {
    let scenario = repo_path("test_data/flat_600v.toml");
    Command::cargo_bin("hbess")
        .unwrap()
        .args(["size", "--scenario", scenario.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("relaxed design (optimal)"))
        .stdout(predicate::str::contains("Total system cost"))
        .stdout(predicate::str::contains("HE only"));
}

#[test]
fn hbess_size_matched_scenario_reaches_integer_design() {
    let scenario = repo_path("test_data/urban_matched.toml");
    let output = Command::cargo_bin("hbess")
        .unwrap()
        .args(["--log-level", "warn", "size", "--scenario"])
        .arg(&scenario)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["relaxed"]["status"], "optimal");
    assert_eq!(report["refinement"]["outcome"], "integer");
    let packs = report["refinement"]["design"]["packs"].as_array().unwrap();
    let he = packs.iter().find(|p| p["chemistry"] == "high_energy").unwrap();
    let parallel = he["parallel"].as_f64().unwrap();
    assert!(parallel >= 1.0 && parallel.fract() == 0.0, "{he}");
    assert!(he["series"].as_f64().unwrap() >= 1.0, "{he}");
}

use scfit_core::model::ScfCurve;
use scfit_core::qdp;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const SINGLE_ENTRIES: &str = "6.5, 1, 5, 8\n0.01, 1, 0, 1\n300, 1, 1, 10000\n";

fn write_dataset(dir: &Path, name: &str, level: f64) -> PathBuf {
    let count = 40;
    let x: Vec<f64> = (0..count)
        .map(|index| 1.0e-5 * 10f64.powf(index as f64 * 4.0 / (count - 1) as f64))
        .collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(index, &x)| {
            let wiggle = if index % 2 == 0 { 1.5e-4 } else { -1.5e-4 };
            ScfCurve::value(x, level, 0.02, 400.0) + wiggle
        })
        .collect();
    let zeros = vec![0.0; count];
    let errors = vec![1.0e-3; count];
    let header = vec![
        "READ SERR 1 2".to_string(),
        "@x1.pco".to_string(),
        "!".to_string(),
    ];
    let path = dir.join(name);
    qdp::write(&path, &header, &[&x, &zeros, &y, &errors]).expect("fixture should be written");
    path
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn scfit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scfit"))
        .args(args)
        .output()
        .expect("scfit should run")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths should be utf-8")
}

#[test]
fn single_fit_writes_log_and_model_table() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6);
    let params = temp.path().join("params.txt");
    write_file(&params, SINGLE_ENTRIES);
    let outdir = temp.path().join("out");

    let output = scfit(&[
        "fit",
        path_arg(&input),
        "--params",
        path_arg(&params),
        "--outdir",
        path_arg(&outdir),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[[Variables]]"));

    let log = fs::read_to_string(outdir.join("x1_scf_phase_01_02_result.log"))
        .expect("log should be written");
    assert!(log.contains("# data points      = 40"));
    assert!(log.contains(" Chi-squared value / d.o.f. = "));
    assert!(log.contains("/ 37\n"));

    let table = qdp::read_document(&outdir.join("x1_scf_phase_01_02_result.qdp"))
        .expect("model table should parse");
    assert_eq!(table.header, vec!["READ SERR 1 2", "@x1.pco", "!"]);
    assert_eq!(table.terminator_count(), 1);
    assert_eq!(table.row_count(), 500);
}

#[test]
fn joint_fit_from_glob_writes_summary_and_plot() {
    let temp = TempDir::new().expect("tempdir should be created");
    let data = temp.path().join("data");
    fs::create_dir_all(&data).expect("data dir should be created");
    write_dataset(&data, "x1_scf_phase_01_02.qdp", 6.6);
    write_dataset(&data, "x1_scf_phase_02_03.qdp", 6.45);
    let params = temp.path().join("params.txt");
    write_file(
        &params,
        "# Et_0, C_0, epsilon_0, Et_1\n6.5, 1, 5, 8\n0.01, 1, 0, 1\n300, 1, 1, 10000\n6.5, 1, 5, 8\n",
    );
    let settings = temp.path().join("settings.json");
    write_file(&settings, r#"{ "grid": { "points": 50 }, "report": { "correlationThreshold": 0.5 } }"#);
    let outdir = temp.path().join("out");
    let summary = temp.path().join("summary.json");

    let output = scfit(&[
        "fit",
        "--input-dir",
        path_arg(&data),
        "--glob",
        "x1_scf_phase_*.qdp",
        "--params",
        path_arg(&params),
        "--settings",
        path_arg(&settings),
        "--outdir",
        path_arg(&outdir),
        "--image",
        "--summary",
        path_arg(&summary),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let table = qdp::read_document(&outdir.join("x1_scf_phase_xx_xx_result.qdp"))
        .expect("model table should parse");
    assert_eq!(table.terminator_count(), 2);
    assert_eq!(table.row_count(), 100);

    let svg = fs::read_to_string(outdir.join("x1_scf_phase_xx_xx.svg")).expect("plot should be written");
    assert!(svg.contains("<svg"));

    let summary: Value = serde_json::from_str(
        &fs::read_to_string(&summary).expect("summary should be written"),
    )
    .expect("summary should be json");
    assert_eq!(summary["prefix"], "x1_scf_phase_xx_xx");
    assert_eq!(summary["mode"], "joint(2)");
    assert_eq!(summary["fit"]["degreesOfFreedom"], 76);
    assert_eq!(summary["artifacts"].as_array().map(Vec::len), Some(3));
    let parameters = summary["fit"]["parameters"].as_array().expect("parameters should be listed");
    assert!(parameters.iter().any(|parameter| parameter["name"] == "C_1" && parameter["expr"] == "C_0"));
}

#[test]
fn entries_are_prompted_on_stdin_when_no_file_is_given() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6);
    let outdir = temp.path().join("out");

    let mut child = Command::new(env!("CARGO_BIN_EXE_scfit"))
        .args(["fit", path_arg(&input), "--outdir", path_arg(&outdir)])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("scfit should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(SINGLE_ENTRIES.as_bytes())
        .expect("entries should be sent");
    let output = child.wait_with_output().expect("scfit should finish");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Et (value, vary, min, max[, expr]): "));
    assert!(outdir.join("x1_scf_phase_01_02_result.log").is_file());
}

#[test]
fn missing_header_marker_exits_with_input_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("x1_scf_phase_01_02.qdp");
    write_file(&input, "READ SERR 1 2\n1e-5 0 6.5 0.001\n");
    let params = temp.path().join("params.txt");
    write_file(&params, SINGLE_ENTRIES);

    let output = scfit(&["fit", path_arg(&input), "--params", path_arg(&params)]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [INPUT.QDP_MARKER]"));
    assert!(stderr.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn three_field_entry_exits_with_input_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6);
    let params = temp.path().join("params.txt");
    write_file(&params, "6.5, 1, 5\n0.01, 1, 0, 1\n300, 1, 1, 10000\n");
    let outdir = temp.path().join("out");

    let output = scfit(&[
        "fit",
        path_arg(&input),
        "--params",
        path_arg(&params),
        "--outdir",
        path_arg(&outdir),
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.PARAM_ENTRY]"));
    assert!(!outdir.exists());
}

#[test]
fn joint_inputs_with_different_sensors_are_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let first = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6);
    let second = write_dataset(temp.path(), "x3_scf_phase_02_03.qdp", 6.4);

    let output = scfit(&["fit", path_arg(&first), path_arg(&second)]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.JOINT_PREFIX]"));
}

#[test]
fn non_converged_fit_exits_zero_without_artifacts() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6);
    let params = temp.path().join("params.txt");
    write_file(&params, "6.0, 1, 5, 8\n0.5, 1, 0, 1\n10, 1, 1, 10000\n");
    let settings = temp.path().join("settings.json");
    write_file(&settings, r#"{ "minimizer": { "maxFunctionEvals": 3 } }"#);
    let outdir = temp.path().join("out");

    let output = scfit(&[
        "fit",
        path_arg(&input),
        "--params",
        path_arg(&params),
        "--settings",
        path_arg(&settings),
        "--outdir",
        path_arg(&outdir),
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("function evaluations"));
    assert!(!outdir.exists());
}

#[test]
fn unknown_settings_field_is_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6);
    let settings = temp.path().join("settings.json");
    write_file(&settings, r#"{ "grid": { "pointz": 10 } }"#);

    let output = scfit(&["fit", path_arg(&input), "--settings", path_arg(&settings)]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.SETTINGS]"));
}

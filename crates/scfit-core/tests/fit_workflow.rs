use scfit_core::discover::discover_inputs;
use scfit_core::export::artifact_paths;
use scfit_core::model::ScfCurve;
use scfit_core::qdp;
use scfit_core::settings::GridSettings;
use scfit_core::{
    FitMode, FitOutcome, FitState, LevenbergMarquardt, LmSettings, LoadedRun, ParameterEntry,
    ScfitErrorCategory, export,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_dataset(dir: &Path, name: &str, level: f64, count: usize) -> PathBuf {
    let x: Vec<f64> = (0..count)
        .map(|index| 1.0e-5 * 10f64.powf(index as f64 * 4.0 / (count - 1) as f64))
        .collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(index, &x)| {
            let wiggle = if index % 2 == 0 { 2.0e-4 } else { -2.0e-4 };
            ScfCurve::value(x, level, 0.02, 400.0) + wiggle
        })
        .collect();
    let zeros = vec![0.0; count];
    let errors = vec![1.0e-3; count];
    let path = dir.join(name);
    let header = vec!["READ SERR 1 2".to_string(), "!".to_string()];
    qdp::write(&path, &header, &[&x, &zeros, &y, &errors]).expect("fixture should be written");
    path
}

fn entries(lines: &[&str]) -> Vec<ParameterEntry> {
    lines
        .iter()
        .map(|line| line.parse().expect("entry should parse"))
        .collect()
}

#[test]
fn joint_fit_from_discovered_files_exports_both_artifacts() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6, 30);
    write_dataset(temp.path(), "x1_scf_phase_02_03.qdp", 6.3, 30);
    let paths = discover_inputs(temp.path(), "x1_scf_phase_*.qdp").expect("inputs should be found");

    let loaded = LoadedRun::load(ScfCurve, &paths).expect("inputs should load");
    assert_eq!(loaded.mode(), FitMode::Joint(2));
    assert_eq!(loaded.parameter_slots(), vec!["Et_0", "C_0", "epsilon_0", "Et_1"]);

    let outcome = loaded
        .parameterize_entries(&entries(&[
            "6.5, 1, 5, 8",
            "0.01, 1, 0, 1",
            "300, 1, 1, 10000",
            "6.5, 1, 5, 8",
        ]))
        .expect("entries should parameterize")
        .fit(&LevenbergMarquardt::default(), &GridSettings::default())
        .expect("fit should run");
    assert_eq!(outcome.state(), FitState::FittedOk);
    let FitOutcome::Converged(run) = outcome else {
        panic!("joint fit should converge");
    };

    let result = run.result();
    assert_eq!(result.data_points, 60);
    assert_eq!(result.variables, 4);
    assert_eq!(result.degrees_of_freedom, 56);
    assert_eq!(result.parameter("C_1").map(|(value, _)| value), result.parameter("C_0").map(|(value, _)| value));
    let (level_1, _) = result.parameter("Et_1").expect("Et_1 should exist");
    assert!((level_1 - 6.3).abs() < 1.0e-3, "Et_1 = {level_1}");

    let outdir = temp.path().join("out");
    let artifacts = export(&run, &outdir, 0.1).expect("export should succeed");
    assert_eq!(artifacts, artifact_paths(&outdir, "x1_scf_phase_xx_xx"));
    let table = qdp::read_document(&artifacts.table).expect("table should parse");
    assert_eq!(table.terminator_count(), 2);
    assert_eq!(table.row_count(), 1000);
}

#[test]
fn failed_fit_leaves_no_artifacts() {
    let temp = TempDir::new().expect("tempdir should be created");
    let path = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6, 50);
    let minimizer = LevenbergMarquardt::new(LmSettings {
        max_function_evals: 3,
        ..LmSettings::default()
    });

    let outcome = LoadedRun::load(ScfCurve, &[path])
        .expect("input should load")
        .parameterize_entries(&entries(&["6.0, 1, 5, 8", "0.5, 1, 0, 1", "10, 1, 1, 10000"]))
        .expect("entries should parameterize")
        .fit(&minimizer, &GridSettings::default())
        .expect("fit should run");

    assert_eq!(outcome.state(), FitState::FittedFailed);
    assert!(!outcome.result().success);
    assert!(outcome.result().message.contains("function evaluations"));
    let FitOutcome::Failed(failed) = outcome else {
        panic!("fit should fail");
    };
    assert_eq!(failed.prefix, "x1_scf_phase_01_02");
    let artifacts = artifact_paths(temp.path(), &failed.prefix);
    assert!(!artifacts.log.exists());
    assert!(!artifacts.table.exists());
}

#[test]
fn mismatched_sensors_are_rejected_before_loading() {
    let temp = TempDir::new().expect("tempdir should be created");
    let first = write_dataset(temp.path(), "x1_scf_phase_01_02.qdp", 6.6, 10);
    let second = temp.path().join("x3_scf_phase_02_03.qdp");

    let error = LoadedRun::load(ScfCurve, &[first, second])
        .err()
        .expect("prefix mismatch should fail");

    assert_eq!(error.category(), ScfitErrorCategory::InconsistentInputSet);
}

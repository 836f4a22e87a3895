#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array3};
use tempfile::TempDir;

use strata_core::error::StrataError;
use strata_core::io::geotiff::read_geotiff;
use strata_core::pipeline::config::JobConfig;
use strata_core::pipeline::run_job;

fn band(values: ndarray::Array2<f32>) -> Array3<f32> {
    values.insert_axis(ndarray::Axis(0))
}

/// Three co-registered 2x2 tiles with one threshold-surviving outlier (40)
/// at the (1,1) coordinate.
fn write_scenario(dir: &TempDir) {
    common::write_test_tiff(
        &dir.path().join("epoch_a.tif"),
        band(array![[1.0, 1.0], [1.0, 40.0]]),
    );
    common::write_test_tiff(
        &dir.path().join("epoch_b.tif"),
        band(array![[1.0, 1.0], [1.0, 1.0]]),
    );
    common::write_test_tiff(
        &dir.path().join("epoch_c.tif"),
        band(array![[1.0, 1.0], [1.0, 2.0]]),
    );
}

fn scenario_config(dir: &TempDir) -> JobConfig {
    JobConfig {
        folder: dir.path().to_path_buf(),
        threshold: Some(50.0),
        mean_stacking: true,
        sigma_stacking: true,
        sigma: Some(1.0),
        max_iters: 5,
    }
}

// ---------------------------------------------------------------------------
// End-to-end runs
// ---------------------------------------------------------------------------

#[test]
fn test_end_to_end_mean_vs_sigma_clipped() {
    let dir = TempDir::new().unwrap();
    write_scenario(&dir);

    let output = run_job(&scenario_config(&dir)).unwrap();
    assert_eq!(output.observations, 3);
    assert!(output.skipped.is_empty());

    // Plain mean keeps the 40; sigma clipping converges on {1, 2}
    let mean = read_geotiff(&dir.path().join("output_mean.tif")).unwrap();
    assert_abs_diff_eq!(mean.values[[0, 1, 1]], 43.0 / 3.0, epsilon = 1e-4);
    assert_abs_diff_eq!(mean.values[[0, 0, 0]], 1.0, epsilon = 1e-5);

    let clipped = read_geotiff(&dir.path().join("output_sigma_clipped.tif")).unwrap();
    assert_abs_diff_eq!(clipped.values[[0, 1, 1]], 1.5, epsilon = 1e-5);
    assert_abs_diff_eq!(clipped.values[[0, 0, 0]], 1.0, epsilon = 1e-5);

    assert!(dir.path().join("output_plot.png").exists());
}

#[test]
fn test_threshold_removes_extreme_value() {
    // 100 exceeds the threshold, so both aggregates see [missing, 1, 2]
    let dir = TempDir::new().unwrap();
    common::write_test_tiff(
        &dir.path().join("epoch_a.tif"),
        band(array![[1.0, 1.0], [1.0, 100.0]]),
    );
    common::write_test_tiff(
        &dir.path().join("epoch_b.tif"),
        band(array![[1.0, 1.0], [1.0, 1.0]]),
    );
    common::write_test_tiff(
        &dir.path().join("epoch_c.tif"),
        band(array![[1.0, 1.0], [1.0, 2.0]]),
    );

    run_job(&scenario_config(&dir)).unwrap();

    let mean = read_geotiff(&dir.path().join("output_mean.tif")).unwrap();
    assert_abs_diff_eq!(mean.values[[0, 1, 1]], 1.5, epsilon = 1e-5);
    let clipped = read_geotiff(&dir.path().join("output_sigma_clipped.tif")).unwrap();
    assert_abs_diff_eq!(clipped.values[[0, 1, 1]], 1.5, epsilon = 1e-5);
}

#[test]
fn test_all_masked_coordinate_is_missing_in_output() {
    let dir = TempDir::new().unwrap();
    common::write_test_tiff(
        &dir.path().join("epoch_a.tif"),
        band(array![[1.0, 99.0], [1.0, 88.0]]),
    );
    common::write_test_tiff(
        &dir.path().join("epoch_b.tif"),
        band(array![[1.0, 77.0], [1.0, 66.0]]),
    );

    let mut config = scenario_config(&dir);
    config.sigma_stacking = false;
    config.sigma = None;
    run_job(&config).unwrap();

    let mean = read_geotiff(&dir.path().join("output_mean.tif")).unwrap();
    // Both observations at column (0,1) and (1,1) exceeded the threshold
    assert!(!mean.valid[[0, 0, 1]]);
    assert!(!mean.valid[[0, 1, 1]]);
    assert!(mean.values[[0, 0, 1]].is_nan());
    assert!(mean.valid[[0, 0, 0]]);
}

#[test]
fn test_shape_mismatch_skipped_in_run() {
    let dir = TempDir::new().unwrap();
    write_scenario(&dir);
    // Sorts after the 2x2 tiles, so the reference shape stays 2x2
    common::write_test_tiff(
        &dir.path().join("epoch_d_odd.tif"),
        Array3::from_elem((1, 3, 3), 1.0),
    );

    let output = run_job(&scenario_config(&dir)).unwrap();
    assert_eq!(output.observations, 3);
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].actual, (1, 3, 3));
}

#[test]
fn test_rerun_ignores_previous_outputs() {
    let dir = TempDir::new().unwrap();
    write_scenario(&dir);

    let first = run_job(&scenario_config(&dir)).unwrap();
    assert_eq!(first.observations, 3);

    // output_mean.tif / output_sigma_clipped.tif now exist in the folder but
    // must not be ingested as inputs
    let second = run_job(&scenario_config(&dir)).unwrap();
    assert_eq!(second.observations, 3);
    assert!(second.skipped.is_empty());
}

#[test]
fn test_mean_only_run_without_sigma() {
    let dir = TempDir::new().unwrap();
    write_scenario(&dir);

    let config = JobConfig {
        folder: dir.path().to_path_buf(),
        threshold: None,
        mean_stacking: true,
        sigma_stacking: false,
        sigma: None,
        max_iters: 5,
    };
    let output = run_job(&config).unwrap();

    assert!(output.mean.is_some());
    assert!(output.sigma_clipped.is_none());
    assert!(dir.path().join("output_mean.tif").exists());
    assert!(!dir.path().join("output_sigma_clipped.tif").exists());
}

// ---------------------------------------------------------------------------
// Configuration and terminal errors
// ---------------------------------------------------------------------------

#[test]
fn test_no_mode_enabled_is_config_error() {
    let dir = TempDir::new().unwrap();
    write_scenario(&dir);

    let config = JobConfig {
        folder: dir.path().to_path_buf(),
        threshold: Some(50.0),
        mean_stacking: false,
        sigma_stacking: false,
        sigma: None,
        max_iters: 5,
    };
    assert!(matches!(run_job(&config), Err(StrataError::Config(_))));
    // Aborted before any I/O: nothing written
    assert!(!dir.path().join("output_mean.tif").exists());
}

#[test]
fn test_sigma_stacking_without_sigma_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = JobConfig {
        folder: dir.path().to_path_buf(),
        threshold: Some(50.0),
        mean_stacking: false,
        sigma_stacking: true,
        sigma: None,
        max_iters: 5,
    };
    assert!(matches!(run_job(&config), Err(StrataError::Config(_))));
}

#[test]
fn test_empty_folder_is_empty_stack() {
    let dir = TempDir::new().unwrap();
    let mut config = scenario_config(&dir);
    config.sigma_stacking = false;
    config.sigma = None;
    assert!(matches!(run_job(&config), Err(StrataError::EmptyStack)));
}

#[test]
fn test_unreadable_input_aborts_run() {
    let dir = TempDir::new().unwrap();
    write_scenario(&dir);
    std::fs::write(dir.path().join("epoch_0_bad.tif"), b"not a tiff").unwrap();

    assert!(matches!(
        run_job(&scenario_config(&dir)),
        Err(StrataError::UnreadableFile { .. })
    ));
    // Aborted before aggregation: no partial outputs
    assert!(!dir.path().join("output_mean.tif").exists());
}

// ---------------------------------------------------------------------------
// Config deserialization
// ---------------------------------------------------------------------------

#[test]
fn test_job_config_from_toml() {
    let config: JobConfig = toml::from_str(
        r#"
        folder = "/data/captures"
        threshold = 50.0
        mean_stacking = true
        sigma_stacking = true
        sigma = 2.5
        "#,
    )
    .unwrap();

    assert_eq!(config.folder, std::path::Path::new("/data/captures"));
    assert_eq!(config.threshold, Some(50.0));
    assert_eq!(config.sigma, Some(2.5));
    // max_iters falls back to the default budget
    assert_eq!(config.max_iters, 5);
    config.validate().unwrap();
}

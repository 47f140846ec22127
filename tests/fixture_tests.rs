//! End-to-end fixture tests for rssi-locate.
//!
//! Each fixture holds a pipeline configuration and a sequence of scan cycles
//! with the expected outputs of every cycle.
//!
//! Run with: cargo test fixture

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use rssi_locate::{Pipeline, PipelineConfig, Sample};

// ============================================================================
// Fixture JSON Schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct Fixture {
    description: String,
    config: PipelineConfig,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    samples: Vec<Sample>,
    expected: Expected,
}

#[derive(Debug, Deserialize)]
struct Expected {
    cycle: u64,
    tracked: usize,
    access_points: usize,
    position: Option<[f64; 2]>,
    #[serde(default)]
    trilaterated: Option<[f64; 2]>,
    #[serde(default)]
    distances: Option<[f64; 3]>,
    #[serde(default)]
    ekf_variance: Option<f64>,
}

// ============================================================================
// Test Helpers
// ============================================================================

fn find_testdata_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("testdata/fixtures"),
        PathBuf::from("../testdata/fixtures"),
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/fixtures")),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }
    panic!("Could not find testdata/fixtures directory");
}

fn load_fixture(scenario: &str) -> Fixture {
    let path = find_testdata_dir().join(format!("fixture_{}.json", scenario));

    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));

    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

fn check_close(step: usize, label: &str, expected: f64, actual: f64, tolerance: f64) {
    let diff = (expected - actual).abs();
    assert!(
        diff <= tolerance,
        "Step {}: {} mismatch: expected {}, got {} (diff={})",
        step,
        label,
        expected,
        actual,
        diff
    );
}

// ============================================================================
// Fixture Test Runner
// ============================================================================

fn run_fixture_test(scenario: &str) {
    let fixture = load_fixture(scenario);
    let mut pipeline = Pipeline::new(fixture.config.clone())
        .unwrap_or_else(|e| panic!("Fixture '{}' config rejected: {}", scenario, e));

    let tolerance = 1e-6;

    for (step_idx, step) in fixture.steps.iter().enumerate() {
        let output = pipeline
            .process_cycle(&step.samples)
            .unwrap_or_else(|e| panic!("Step {}: cycle failed: {}", step_idx, e));
        let expected = &step.expected;

        assert_eq!(output.cycle, expected.cycle, "Step {}: cycle", step_idx);
        assert_eq!(output.variant, fixture.config.filter_variant);
        assert_eq!(output.anchors.len(), expected.tracked, "Step {}: tracked", step_idx);
        assert_eq!(
            output.access_points.len(),
            expected.access_points,
            "Step {}: access points",
            step_idx
        );

        match (expected.position, output.position) {
            (None, None) => {}
            (Some([x, y]), Some(actual)) => {
                check_close(step_idx, "position.x", x, actual.x, tolerance);
                check_close(step_idx, "position.y", y, actual.y, tolerance);
            }
            (exp, act) => panic!(
                "Step {}: position presence mismatch: expected {:?}, got {:?}",
                step_idx, exp, act
            ),
        }

        if let Some([x, y]) = expected.trilaterated {
            let actual = output.trilaterated.expect("trilaterated point");
            check_close(step_idx, "trilaterated.x", x, actual.x, tolerance);
            check_close(step_idx, "trilaterated.y", y, actual.y, tolerance);
        }

        if let Some(distances) = expected.distances {
            let actual = output.distances.expect("distances");
            for (i, (exp, act)) in distances.iter().zip(actual.iter()).enumerate() {
                check_close(step_idx, &format!("distances[{}]", i), *exp, *act, tolerance);
            }
        }

        if let Some(variance) = expected.ekf_variance {
            let state = output.ekf_state.expect("ekf state");
            check_close(step_idx, "ekf variance x", variance, state.covariance[(0, 0)], 1e-9);
            check_close(step_idx, "ekf variance y", variance, state.covariance[(1, 1)], 1e-9);
        }
    }

    println!(
        "Fixture test '{}' passed: {} steps verified ({})",
        scenario,
        fixture.steps.len(),
        fixture.description
    );
}

// ============================================================================
// Test Cases
// ============================================================================

#[test]
fn test_fixture_constant() {
    run_fixture_test("constant");
}

#[test]
fn test_fixture_kalman_b_noisy() {
    run_fixture_test("kalman_b_noisy");
}

#[test]
fn test_fixture_feedback_coupled() {
    run_fixture_test("feedback_coupled");
}

#[test]
fn test_fixture_ekf_position() {
    run_fixture_test("ekf_position");
}

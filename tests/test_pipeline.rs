//! Integration tests for the end-to-end analysis pipeline

use loglens::prelude::*;
use loglens::sequence::windows_of_length;
use ndarray::Array2;

// ============================================================================
// Fixtures
// ============================================================================

const OUTLIER_ROW: usize = 5;

/// 12 rows of one numeric column, all 1 except a single 10000
fn outlier_records(outlier_row: usize) -> Vec<RawRecord> {
    (0..12)
        .map(|i| {
            let value = if i == outlier_row { "10000" } else { "1" };
            RawRecord::new().with("value", value)
        })
        .collect()
}

/// Mixed-type log rows with one burst of traffic
fn log_records(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            let bytes = if i == n / 2 { 250_000 } else { 900 + (i % 7) * 13 };
            RawRecord::new()
                .with("timestamp", format!("2024-03-01 12:{:02}:{:02}", i / 60, i % 60))
                .with("user", ["alice", "bob", "carol"][i % 3])
                .with("action", if i % 5 == 0 { "logout" } else { "login" })
                .with("bytes", bytes.to_string())
        })
        .collect()
}

fn quick_config() -> AnalysisConfig {
    AnalysisConfig::new().with_max_window(4).with_epochs(5)
}

// ============================================================================
// Outlier scenario
// ============================================================================

/// Default analysis of the outlier records and its flagged window starts
fn default_outcome(outlier_row: usize) -> (Report, Vec<usize>) {
    let report = analyze(&outlier_records(outlier_row)).unwrap();
    let flagged = report.anomalies.iter().map(|a| a.index).collect();
    (report, flagged)
}

#[test]
fn test_default_analyze_flags_trailing_outlier() {
    let (report, flagged) = default_outcome(11);

    // W = min(10, 12 - 1); only the last window covers row 11
    assert_eq!(report.window_length, 10);
    assert_eq!(report.total_sequences, 3);
    assert_eq!(flagged, vec![2]);

    let outlier_confidence = report.confidence_scores[2];
    assert!(outlier_confidence > report.confidence_scores[0]);
    assert!(outlier_confidence > report.confidence_scores[1]);
}

#[test]
fn test_default_analyze_flags_leading_outlier() {
    let (report, flagged) = default_outcome(0);

    assert_eq!(flagged, vec![0]);
    assert_eq!(report.anomalies[0].context["value"], "10000");
    for start in 1..report.total_sequences {
        assert!(report.confidence_scores[0] > report.confidence_scores[start]);
    }
}

#[test]
fn test_default_analyze_flags_highest_error_window() {
    // every window covers row 5; the worst reconstructed one is flagged
    let (report, flagged) = default_outcome(OUTLIER_ROW);
    assert_eq!(flagged.len(), 1);

    let best = (0..report.total_sequences)
        .max_by(|&a, &b| report.anomaly_scores[a].total_cmp(&report.anomaly_scores[b]))
        .unwrap();
    assert_eq!(flagged, vec![best]);
}

#[test]
fn test_outlier_window_is_flagged() {
    let config = AnalysisConfig::new().with_max_window(1);
    let (_, report) = Analyzer::new(config).fit(&outlier_records(OUTLIER_ROW)).unwrap();

    assert_eq!(report.window_length, 1);
    assert_eq!(report.total_sequences, 12);
    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(report.anomalies[0].index, OUTLIER_ROW);
}

#[test]
fn test_outlier_confidence_exceeds_normal_windows() {
    let config = AnalysisConfig::new().with_max_window(1);
    let (model, _) = Analyzer::new(config).fit(&outlier_records(OUTLIER_ROW)).unwrap();
    let scores = model.score_records(&outlier_records(OUTLIER_ROW)).unwrap();

    let outlier = scores.iter().find(|s| s.start == OUTLIER_ROW).unwrap();
    assert!(outlier.is_anomaly);
    assert!(outlier.error > model.threshold());

    for normal in scores.iter().filter(|s| !s.is_anomaly) {
        assert!(outlier.confidence > normal.confidence);
    }
}

// ============================================================================
// Report invariants
// ============================================================================

#[test]
fn test_report_invariants() {
    let records = log_records(40);
    let report = Analyzer::new(quick_config()).analyze(&records).unwrap();

    assert_eq!(report.total_records, 40);
    assert_eq!(report.window_length, 4);
    assert_eq!(report.total_sequences, 40 - 4 + 1);
    assert_eq!(report.anomalies_detected, report.anomalies.len());
    assert_eq!(report.anomaly_scores.len(), report.total_sequences);
    assert_eq!(report.confidence_scores.len(), report.total_sequences);

    for anomaly in &report.anomalies {
        assert!(anomaly.index < records.len());
        assert!(matches!(anomaly.severity, Severity::High | Severity::Medium));
        assert!(anomaly.score > 0.0 && anomaly.score < 1.0);
        assert!((0.0..=1.0).contains(&anomaly.confidence));
        assert_eq!(anomaly.context.len(), 4);
    }
    assert!(report.anomaly_scores.iter().all(|s| *s > 0.0 && *s < 1.0));
}

#[test]
fn test_report_profiles_and_extras() {
    let report = Analyzer::new(quick_config()).analyze(&log_records(30)).unwrap();

    let types: Vec<ColumnType> = report.columns.iter().map(|c| c.column_type).collect();
    assert_eq!(
        types,
        vec![
            ColumnType::Timestamp,
            ColumnType::Categorical,
            ColumnType::Categorical,
            ColumnType::Numeric
        ]
    );
    let range = report.time_range.as_ref().unwrap();
    assert_eq!(range.column, "timestamp");
    assert_eq!(range.start, "2024-03-01T12:00:00+00:00");

    let training = report.training.as_ref().unwrap();
    assert_eq!(training.epochs, 5);
    assert!(training.final_train_loss.is_finite());

    // the burst makes bytes highly variable relative to its mean
    assert!(report.recommendations.iter().any(|r| r.contains("bytes")));
}

#[test]
fn test_report_serializes_to_json() {
    let report = Analyzer::new(quick_config()).analyze(&log_records(20)).unwrap();
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["total_records"], 20);
    assert!(value["anomalies"].is_array());
}

#[test]
fn test_identical_rows_flag_nothing() {
    let records: Vec<RawRecord> = (0..10).map(|_| RawRecord::new().with("x", "3")).collect();
    let report = Analyzer::new(quick_config()).analyze(&records).unwrap();

    assert_eq!(report.anomalies_detected, 0);
    assert!(report.recommendations.is_empty());
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_seeded_analysis_is_reproducible() {
    let records = log_records(25);
    let first = Analyzer::new(quick_config()).analyze(&records).unwrap();
    let second = Analyzer::new(quick_config()).analyze(&records).unwrap();

    assert_eq!(first.threshold, second.threshold);
    assert_eq!(first.anomaly_scores, second.anomaly_scores);
    assert_eq!(first.anomalies, second.anomalies);
}

#[test]
fn test_reencoding_is_bit_identical() {
    let records = log_records(15);
    let (encoder, first) = FeatureEncoder::fit_transform(&records).unwrap();
    let second = encoder.transform(&records).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Boundaries and failures
// ============================================================================

#[test]
fn test_one_more_row_than_window() {
    let config = AnalysisConfig::new().with_max_window(3).with_epochs(2);
    let report = Analyzer::new(config).analyze(&log_records(4)).unwrap();

    assert_eq!(report.window_length, 3);
    assert_eq!(report.total_sequences, 2);
}

#[test]
fn test_rows_not_exceeding_window_fail() {
    let values = Array2::<f64>::zeros((3, 2));
    assert!(matches!(
        windows_of_length(&values, 3),
        Err(LensError::InsufficientData { .. })
    ));
}

#[test]
fn test_single_row_is_insufficient() {
    let result = Analyzer::new(quick_config()).analyze(&log_records(1));
    assert!(matches!(result, Err(LensError::InsufficientData { rows: 1, .. })));
}

#[test]
fn test_empty_dataset() {
    assert!(matches!(analyze(&[]), Err(LensError::EmptyDataset)));
}

#[test]
fn test_invalid_config_rejected() {
    let config = AnalysisConfig::new().with_epochs(0);
    let result = Analyzer::new(config).analyze(&log_records(10));
    assert!(matches!(result, Err(LensError::InvalidParameter { .. })));
}

#[test]
fn test_default_analyze() {
    let report = analyze(&log_records(12)).unwrap();
    assert_eq!(report.window_length, 10);
    assert_eq!(report.total_sequences, 3);
}

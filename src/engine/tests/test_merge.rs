use super::common::{make_clips, read_output, rms_between, write_tone, TEST_RATE};
use crate::config::MergeConfig;
use crate::engine::merge::{merge_segments, merge_with_layout};
use crate::error::MergeError;
use crate::log_sink::CollectingLog;
use crate::segment::{segments_from_pairs, select_segments, ClipLayout};

fn no_padding() -> MergeConfig {
    MergeConfig {
        correct_cosyvoice_padding: false,
        ..MergeConfig::default()
    }
}

#[test]
fn test_round_trip_keeps_original_length() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "talk", &[Some(1000), Some(1000)]);
    let output = root.path().join("out").join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 1000), (1000, 2000)]);
    let report = merge_segments(&segments, 2000, &clips, &output, &no_padding(), &log).unwrap();

    assert_eq!(report.realized_duration_ms, 2000);
    assert_eq!(report.delta_ms, 0);
    assert_eq!(report.segments_loaded, 2);
    assert_eq!(report.segments_placed, 2);
    assert_eq!(report.overlaps, 0);
    assert!(!log.contains("затухание"));
    assert!(!log.contains("нарастание"));

    let merged = read_output(&output);
    assert_eq!(merged.sample_rate, TEST_RATE);
    assert_eq!(merged.duration_ms(), 2000);
    // Сигнал без изменений: уровень синуса с амплитудой 0.5
    assert!((rms_between(&merged, 0, 1000) - 0.3535).abs() < 0.01);
    assert!((rms_between(&merged, 1000, 2000) - 0.3535).abs() < 0.01);
}

#[test]
fn test_missing_clip_leaves_silence() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(
        root.path(),
        "movie",
        &[Some(1000), Some(1000), None, Some(1000), Some(1000)],
    );
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 1000), (1000, 2000), (2000, 3000), (3000, 4000), (4000, 5000)]);
    let report = merge_segments(&segments, 5000, &clips, &output, &no_padding(), &log).unwrap();

    assert_eq!(report.segments_valid, 5);
    assert_eq!(report.segments_loaded, 4);
    assert_eq!(report.segments_placed, 4);
    assert_eq!(report.realized_duration_ms, 5000);
    assert!(log.contains("файл не найден"));

    let merged = read_output(&output);
    assert_eq!(rms_between(&merged, 2000, 3000), 0.0);
    for (start, end) in [(0, 1000), (1000, 2000), (3000, 4000), (4000, 5000)] {
        assert!(rms_between(&merged, start, end) > 0.3);
    }
}

#[test]
fn test_padding_correction_shifts_segments() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "shift", &[Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(1000, 2000)]);
    let report = merge_segments(&segments, 2000, &clips, &output, &MergeConfig::default(), &log).unwrap();
    assert_eq!(report.realized_duration_ms, 2000);

    let merged = read_output(&output);
    assert_eq!(rms_between(&merged, 0, 790), 0.0);
    assert!(rms_between(&merged, 810, 1000) > 0.3);
    assert_eq!(rms_between(&merged, 1810, 2000), 0.0);
    assert!(log.contains("1000ms → 800ms"));
}

#[test]
fn test_padding_correction_clamped_at_zero() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "early", &[Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(100, 1100)]);
    merge_segments(&segments, 1500, &clips, &output, &MergeConfig::default(), &log).unwrap();

    let merged = read_output(&output);
    assert!(rms_between(&merged, 0, 100) > 0.3);
    assert_eq!(rms_between(&merged, 1010, 1500), 0.0);
}

#[test]
fn test_input_errors_return_original_duration() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "clips", &[Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();
    let config = MergeConfig::default();

    let err = merge_segments(&[], 4000, &clips, &output, &config, &log).unwrap_err();
    assert!(matches!(err, MergeError::NoValidSegments { .. }));
    assert_eq!(err.fallback_duration_ms(), Some(4000));

    let invalid = segments_from_pairs(&[(500, 100), (-10, 20)]);
    let err = merge_segments(&invalid, 4000, &clips, &output, &config, &log).unwrap_err();
    assert_eq!(err.fallback_duration_ms(), Some(4000));

    let segments = segments_from_pairs(&[(0, 1000)]);
    let err = merge_segments(&segments, 0, &clips, &output, &config, &log).unwrap_err();
    assert!(matches!(err, MergeError::InvalidOriginalDuration { .. }));

    let err = merge_segments(&segments, 1000, root.path().join("absent"), &output, &config, &log).unwrap_err();
    assert!(matches!(err, MergeError::ClipDirectoryMissing(_)));
    assert!(err.is_input_error());

    assert!(!output.exists());
}

#[test]
fn test_preserve_caps_runaway_clip() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "long", &[Some(2500)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 1000)]);
    let report = merge_segments(&segments, 1000, &clips, &output, &no_padding(), &log).unwrap();

    assert_eq!(report.realized_duration_ms, 2000);
    assert_eq!(report.delta_ms, 1000);
    assert!((report.extension_percent - 100.0).abs() < 1e-9);
    assert!(log.contains("ограничено"));
}

#[test]
fn test_quiet_clip_is_amplified() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("quiet");
    std::fs::create_dir_all(&dir).unwrap();
    write_tone(&dir.join("quiet_001.wav"), 1000, TEST_RATE, 0.01);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 1000)]);
    merge_segments(&segments, 1000, &dir, &output, &no_padding(), &log).unwrap();

    let merged = read_output(&output);
    assert!(merged.dbfs() > -25.0);
    assert!(merged.peak() <= 1.0);
    assert!(log.contains("усиление"));
}

#[test]
fn test_subset_keeps_clip_numbering() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "part", &[None, Some(1000), None, Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let all = segments_from_pairs(&[(0, 1000), (1000, 2000), (2000, 3000), (3000, 4000)]);
    let subset = select_segments(&all, &[2, 4]);
    let report = merge_segments(&subset, 4000, &clips, &output, &no_padding(), &log).unwrap();

    assert_eq!(report.segments_total, 2);
    assert_eq!(report.segments_placed, 2);
    let merged = read_output(&output);
    assert_eq!(rms_between(&merged, 0, 1000), 0.0);
    assert!(rms_between(&merged, 1000, 2000) > 0.3);
    assert!(rms_between(&merged, 3000, 4000) > 0.3);
}

#[test]
fn test_corrupt_clip_is_skipped() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "broken", &[Some(1000)]);
    std::fs::write(clips.join("broken_002.wav"), b"not a wav file").unwrap();
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 1000), (1000, 2000)]);
    let report = merge_segments(&segments, 2000, &clips, &output, &no_padding(), &log).unwrap();

    assert_eq!(report.segments_loaded, 1);
    assert_eq!(report.realized_duration_ms, 2000);
    assert!(log.contains("ошибка загрузки"));
}

#[test]
fn test_explicit_base_name() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("whatever");
    std::fs::create_dir_all(&dir).unwrap();
    write_tone(&dir.join("lesson_001.wav"), 1000, TEST_RATE, 0.5);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();
    let config = no_padding();

    let layout = ClipLayout::new(&dir, Some("lesson"), &config);
    let segments = segments_from_pairs(&[(0, 1000)]);
    let report = merge_with_layout(&segments, 1000, &layout, &output, &config, &log).unwrap();
    assert_eq!(report.segments_placed, 1);
}

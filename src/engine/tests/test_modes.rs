use super::common::{make_clips, read_output, rms_between, write_tone, TEST_RATE};
use crate::config::{LengthHandling, MergeConfig, OverlapHandling};
use crate::engine::merge::merge_segments;
use crate::log_sink::CollectingLog;
use crate::segment::segments_from_pairs;

fn fit_config(max_extension_percent: u32, enable_smart_compression: bool) -> MergeConfig {
    MergeConfig {
        length_handling: LengthHandling::Fit,
        max_extension_percent,
        enable_smart_compression,
        correct_cosyvoice_padding: false,
        ..MergeConfig::default()
    }
}

#[test]
fn test_fit_extension_is_capped() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "ext", &[Some(15_000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 10_000)]);
    let report = merge_segments(&segments, 10_000, &clips, &output, &fit_config(20, false), &log).unwrap();

    assert_eq!(report.realized_duration_ms, 12_000);
    assert_eq!(report.delta_ms, 2000);
    assert!((report.extension_percent - 20.0).abs() < 1e-9);
    assert_eq!(read_output(&output).duration_ms(), 12_000);
}

#[test]
fn test_fit_compresses_long_clip() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "fast", &[Some(1500)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 1000)]);
    let report = merge_segments(&segments, 1000, &clips, &output, &fit_config(0, true), &log).unwrap();

    assert_eq!(report.realized_duration_ms, 1000);
    assert!(log.contains("Темп x1.50"));
    assert!(rms_between(&read_output(&output), 100, 900) > 0.2);
}

#[test]
fn test_fit_pads_short_clip() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "short", &[Some(1000), Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();

    let segments = segments_from_pairs(&[(0, 2000), (2000, 3000)]);
    let report = merge_segments(&segments, 3000, &clips, &output, &fit_config(50, true), &log).unwrap();

    assert_eq!(report.realized_duration_ms, 3000);
    assert_eq!(report.overlaps, 0);
    let merged = read_output(&output);
    assert_eq!(rms_between(&merged, 1000, 2000), 0.0);
    assert!(rms_between(&merged, 2000, 3000) > 0.3);
}

#[test]
fn test_cut_mode_truncates_earlier_segment() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "cut", &[Some(1500), Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();
    let config = MergeConfig {
        overlap_handling: OverlapHandling::Cut,
        correct_cosyvoice_padding: false,
        ..MergeConfig::default()
    };

    let segments = segments_from_pairs(&[(0, 1000), (1000, 2000)]);
    let report = merge_segments(&segments, 2000, &clips, &output, &config, &log).unwrap();

    assert_eq!(report.overlaps, 1);
    assert_eq!(report.realized_duration_ms, 2000);
    assert!(log.contains("обрезка 1500ms → 1000ms"));

    // Во втором окне звучит только второй сегмент
    let merged = read_output(&output);
    assert!((rms_between(&merged, 1000, 2000) - 0.3535).abs() < 0.01);
}

#[test]
fn test_fade_mode_crossfades_overlap() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "fade", &[Some(1300), Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();
    let config = MergeConfig {
        correct_cosyvoice_padding: false,
        ..MergeConfig::default()
    };

    let segments = segments_from_pairs(&[(0, 1000), (1000, 2000)]);
    let report = merge_segments(&segments, 2000, &clips, &output, &config, &log).unwrap();

    assert_eq!(report.overlaps, 1);
    assert_eq!(report.realized_duration_ms, 2000);
    assert!(log.contains("Сегмент 1: затухание 240ms"));
    assert!(log.contains("Сегмент 2: нарастание 240ms"));
}

#[test]
fn test_clip_rates_are_aligned_to_canvas() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("rates");
    std::fs::create_dir_all(&dir).unwrap();
    write_tone(&dir.join("rates_001.wav"), 1000, TEST_RATE, 0.5);
    write_tone(&dir.join("rates_002.wav"), 1000, 8000, 0.5);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();
    let config = MergeConfig {
        correct_cosyvoice_padding: false,
        ..MergeConfig::default()
    };

    let segments = segments_from_pairs(&[(0, 1000), (1000, 2000)]);
    let report = merge_segments(&segments, 2000, &dir, &output, &config, &log).unwrap();

    assert_eq!(report.segments_placed, 2);
    let merged = read_output(&output);
    assert_eq!(merged.sample_rate, TEST_RATE);
    assert_eq!(merged.duration_ms(), 2000);
    assert!(rms_between(&merged, 1100, 1900) > 0.3);
}

#[test]
fn test_output_sample_rate_override() {
    let root = tempfile::tempdir().unwrap();
    let clips = make_clips(root.path(), "rate", &[Some(1000)]);
    let output = root.path().join("merged.wav");
    let log = CollectingLog::new();
    let config = MergeConfig {
        output_sample_rate: Some(8000),
        correct_cosyvoice_padding: false,
        ..MergeConfig::default()
    };

    let segments = segments_from_pairs(&[(0, 1000)]);
    merge_segments(&segments, 1000, &clips, &output, &config, &log).unwrap();

    let merged = read_output(&output);
    assert_eq!(merged.sample_rate, 8000);
    assert_eq!(merged.duration_ms(), 1000);
}

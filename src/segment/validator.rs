//! # Segment Validator
//!
//! Отбрасывает некорректные окна субтитров и проверяет исходную
//! длительность. Сегменты никогда не придумываются: если после фильтрации
//! ничего не осталось, слияние прекращается с ошибкой входных данных.

use crate::error::{MergeError, Result};
use crate::log_sink::MergeLog;
use crate::segment::types::SourceSegment;

/// Предел разумной длительности (1 час)
pub const MAX_REASONABLE_DURATION_MS: i64 = 3_600_000;
/// Предел длительности одного сегмента (10 минут)
pub const MAX_SEGMENT_DURATION_MS: i64 = 600_000;

/// Результат валидации
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    /// Корректные сегменты в исходном порядке
    pub segments: Vec<SourceSegment>,
    /// Исходная длительность (ограниченная 1 часом)
    pub original_duration_ms: i64,
    /// Количество отброшенных сегментов
    pub dropped: usize,
}

/// Причина отбраковки сегмента
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NegativeTimestamp,
    EmptyRange,
    BeyondCeiling,
    TooLong,
}

/// Проверяет один сегмент
pub fn check_segment(segment: &SourceSegment) -> std::result::Result<(), Rejection> {
    if segment.start_ms < 0 || segment.end_ms < 0 {
        return Err(Rejection::NegativeTimestamp);
    }
    if segment.end_ms <= segment.start_ms {
        return Err(Rejection::EmptyRange);
    }
    if segment.start_ms > MAX_REASONABLE_DURATION_MS || segment.end_ms > MAX_REASONABLE_DURATION_MS {
        return Err(Rejection::BeyondCeiling);
    }
    if segment.duration_ms() > MAX_SEGMENT_DURATION_MS {
        return Err(Rejection::TooLong);
    }
    Ok(())
}

/// Валидирует список сегментов и исходную длительность
pub fn validate_segments(
    segments: &[SourceSegment],
    original_duration_ms: i64,
    sink: &dyn MergeLog,
) -> Result<ValidatedInput> {
    if original_duration_ms <= 0 {
        sink.error(&format!("❌ Исходная длительность некорректна: {}ms", original_duration_ms));
        return Err(MergeError::InvalidOriginalDuration { original_duration_ms });
    }

    if segments.is_empty() {
        sink.error("❌ Нет данных о сегментах");
        return Err(MergeError::NoValidSegments { original_duration_ms });
    }

    let mut duration = original_duration_ms;
    if duration > MAX_REASONABLE_DURATION_MS {
        sink.warn(&format!(
            "⚠️ Исходная длительность слишком велика: {}ms ({:.1} мин), ограничена до {}ms",
            duration,
            duration as f64 / 60000.0,
            MAX_REASONABLE_DURATION_MS
        ));
        duration = MAX_REASONABLE_DURATION_MS;
    }

    let mut valid = Vec::with_capacity(segments.len());
    for segment in segments {
        match check_segment(segment) {
            Ok(()) => valid.push(*segment),
            Err(reason) => {
                let what = match reason {
                    Rejection::NegativeTimestamp => "отрицательная метка",
                    Rejection::EmptyRange => "пустой интервал",
                    Rejection::BeyondCeiling => "метка за пределом 1 часа",
                    Rejection::TooLong => "сегмент длиннее 10 минут",
                };
                sink.warn(&format!(
                    "⚠️ Сегмент {}: {} ({}, {}), пропущен",
                    segment.index, what, segment.start_ms, segment.end_ms
                ));
            }
        }
    }

    if valid.is_empty() {
        sink.error("❌ Не осталось ни одного корректного сегмента");
        return Err(MergeError::NoValidSegments {
            original_duration_ms,
        });
    }

    sink.info(&format!("✅ Корректных сегментов: {}/{}", valid.len(), segments.len()));

    Ok(ValidatedInput {
        dropped: segments.len() - valid.len(),
        segments: valid,
        original_duration_ms: duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::CollectingLog;
    use crate::segment::types::segments_from_pairs;

    #[test]
    fn test_filters_invalid_segments() {
        let log = CollectingLog::new();
        let segments = segments_from_pairs(&[
            (0, 1000),
            (-5, 100),
            (2000, 2000),
            (3000, 2500),
            (3_599_000, 3_700_000),
            (10_000, 700_000),
            (5000, 6000),
        ]);

        let validated = validate_segments(&segments, 10_000, &log).unwrap();
        assert_eq!(validated.segments.len(), 2);
        assert_eq!(validated.dropped, 5);
        assert_eq!(validated.segments[0].index, 1);
        assert_eq!(validated.segments[1].index, 7);

        for seg in &validated.segments {
            assert!(seg.end_ms > seg.start_ms);
            assert!(seg.end_ms <= MAX_REASONABLE_DURATION_MS);
        }
        assert_eq!(log.count_at_least(log::Level::Warn), 5);
    }

    #[test]
    fn test_empty_after_filtering_is_input_error() {
        let log = CollectingLog::new();
        let segments = segments_from_pairs(&[(100, 50)]);
        let err = validate_segments(&segments, 4000, &log).unwrap_err();
        assert_eq!(err.fallback_duration_ms(), Some(4000));
    }

    #[test]
    fn test_non_positive_duration() {
        let log = CollectingLog::new();
        let segments = segments_from_pairs(&[(0, 1000)]);
        let err = validate_segments(&segments, 0, &log).unwrap_err();
        assert!(matches!(err, MergeError::InvalidOriginalDuration { original_duration_ms: 0 }));
    }

    #[test]
    fn test_duration_clamped_to_ceiling() {
        let log = CollectingLog::new();
        let segments = segments_from_pairs(&[(0, 1000)]);
        let validated = validate_segments(&segments, 5_000_000, &log).unwrap();
        assert_eq!(validated.original_duration_ms, MAX_REASONABLE_DURATION_MS);
        assert!(log.count_at_least(log::Level::Warn) >= 1);
    }
}

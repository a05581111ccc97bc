//! Оценка приоритета сегмента
//!
//! Эвристика показывает, насколько содержательна речь сегмента: законченные
//! предложения сжимаются меньше, междометия и пустые фрагменты сильнее.

use crate::config::ScoringLexicon;

/// Нижняя граница оценки (также оценка сегмента без текста)
pub const MIN_PRIORITY: f32 = 0.1;
/// Верхняя граница оценки
pub const MAX_PRIORITY: f32 = 1.0;

const BASE_PRIORITY: f32 = 0.5;
const SHORT_SEGMENT_MS: i64 = 500;
const LONG_SEGMENT_MS: i64 = 10_000;
const FILLER_MAX_CHARS: usize = 3;

/// Вычисляет приоритет сегмента в диапазоне [0.1, 1.0].
///
/// # Аргументы
///
/// * `text` - текст сегмента (может быть пустым)
/// * `duration_ms` - длительность аудио сегмента
/// * `lexicon` - признаки законченных предложений и список междометий
pub fn score(text: &str, duration_ms: i64, lexicon: &ScoringLexicon) -> f32 {
    let text = text.trim();
    if text.is_empty() {
        return MIN_PRIORITY;
    }

    let mut priority = BASE_PRIORITY;

    if duration_ms < SHORT_SEGMENT_MS {
        priority *= 0.7;
    } else if duration_ms > LONG_SEGMENT_MS {
        priority *= 0.8;
    }

    if lexicon
        .terminal_markers
        .iter()
        .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
    {
        priority *= 1.2;
    }

    if text.chars().count() <= FILLER_MAX_CHARS && lexicon.fillers.iter().any(|f| f == text) {
        priority *= 0.6;
    }

    priority.clamp(MIN_PRIORITY, MAX_PRIORITY)
}

//! # Overlap Resolver
//!
//! Поиск и разрешение перекрытий между размещёнными сегментами.
//! Разрешение выполняется над буферами сегментов до смешивания, иначе в
//! общей области энергия сигнала удваивается.

use crate::config::OverlapHandling;
use crate::log_sink::MergeLog;
use crate::segment::types::ProcessedSegment;

/// Перекрытия не длиннее этого значения игнорируются
pub const MIN_OVERLAP_MS: i64 = 50;
/// Максимальная длина кроссфейда
pub const MAX_CROSSFADE_MS: i64 = 500;
/// Доля перекрытия, занимаемая кроссфейдом
pub const CROSSFADE_RATIO: f64 = 0.8;
/// Затухание в точке обрезки
pub const CUT_FADE_MS: i64 = 100;

/// Пара перекрывающихся сегментов (индексы в срезе сегментов)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapPair {
    /// Сегмент, начинающийся раньше
    pub earlier: usize,
    /// Сегмент, начинающийся позже
    pub later: usize,
    pub overlap_start: i64,
    pub overlap_end: i64,
    pub overlap_duration: i64,
}

/// Длина кроссфейда для перекрытия: `min(0.8 * overlap, 500)`
pub fn crossfade_ms(overlap_duration: i64) -> i64 {
    ((overlap_duration as f64 * CROSSFADE_RATIO) as i64).min(MAX_CROSSFADE_MS)
}

fn is_placed(segment: &ProcessedSegment) -> bool {
    segment.exists && segment.audio.is_some()
}

/// Находит все пары сегментов с перекрытием больше 50 мс
pub fn detect_overlaps(segments: &[ProcessedSegment], sink: &dyn MergeLog) -> Vec<OverlapPair> {
    let mut pairs = Vec::new();

    for (i, first) in segments.iter().enumerate() {
        if !is_placed(first) {
            continue;
        }
        for (j, second) in segments.iter().enumerate().skip(i + 1) {
            if !is_placed(second) {
                continue;
            }

            let overlap_start = first.corrected_start.max(second.corrected_start);
            let overlap_end = first.placed_end().min(second.placed_end());
            let overlap_duration = overlap_end - overlap_start;
            if overlap_duration <= MIN_OVERLAP_MS {
                continue;
            }

            let (earlier, later) = if second.corrected_start < first.corrected_start {
                (j, i)
            } else {
                (i, j)
            };

            sink.warn(&format!(
                "⚠️ Перекрытие сегментов {}-{}: {}ms ({}~{}ms)",
                segments[earlier].index, segments[later].index, overlap_duration, overlap_start, overlap_end
            ));

            pairs.push(OverlapPair {
                earlier,
                later,
                overlap_start,
                overlap_end,
                overlap_duration,
            });
        }
    }

    pairs
}

fn fade_pair(segments: &mut [ProcessedSegment], pair: &OverlapPair, sink: &dyn MergeLog) -> bool {
    let fade = crossfade_ms(pair.overlap_duration);
    let mut applied = false;

    let earlier = &mut segments[pair.earlier];
    if let Some(audio) = earlier.audio.as_mut() {
        if audio.duration_ms() > fade {
            audio.fade_out(fade);
            applied = true;
            sink.info(&format!("🔧 Сегмент {}: затухание {}ms", earlier.index, fade));
        }
    }

    let later = &mut segments[pair.later];
    if let Some(audio) = later.audio.as_mut() {
        if audio.duration_ms() > fade {
            audio.fade_in(fade);
            applied = true;
            sink.info(&format!("🔧 Сегмент {}: нарастание {}ms", later.index, fade));
        }
    }

    applied
}

fn cut_pair(segments: &mut [ProcessedSegment], pair: &OverlapPair, sink: &dyn MergeLog) -> bool {
    let later_start = segments[pair.later].corrected_start;
    let earlier = &mut segments[pair.earlier];

    // Интервал мог уже сократиться при разрешении предыдущей пары
    if earlier.placed_end() <= later_start {
        return false;
    }

    let cut_point = later_start - earlier.corrected_start;
    if cut_point <= 0 {
        sink.warn(&format!(
            "⚠️ Сегмент {}: точка обрезки {}ms, сегмент оставлен без изменений",
            earlier.index, cut_point
        ));
        return false;
    }

    let Some(audio) = earlier.audio.as_mut() else {
        return false;
    };
    let before = audio.duration_ms();
    audio.truncate_ms(cut_point);
    audio.fade_out(CUT_FADE_MS);
    earlier.final_duration = audio.duration_ms();

    sink.info(&format!(
        "✂️ Сегмент {}: обрезка {}ms → {}ms",
        earlier.index, before, earlier.final_duration
    ));
    true
}

/// Разрешает перекрытия выбранным способом.
///
/// Возвращает количество пар, для которых буферы были изменены.
pub fn resolve_overlaps(
    segments: &mut [ProcessedSegment],
    pairs: &[OverlapPair],
    mode: OverlapHandling,
    sink: &dyn MergeLog,
) -> usize {
    let mut resolved = 0;
    for pair in pairs {
        let changed = match mode {
            OverlapHandling::Fade => fade_pair(segments, pair, sink),
            OverlapHandling::Cut => cut_pair(segments, pair, sink),
        };
        if changed {
            resolved += 1;
        }
    }
    resolved
}

//! # Timeline Assembler
//!
//! Вычисление длины итогового холста и позиций сегментов.
//!
//! Сегменты размещаются по абсолютным позициям `corrected_start`, без
//! каскадного сдвига последующих сегментов. Столкновения разрешаются
//! отдельно, в модуле перекрытий.

use crate::config::{LengthHandling, MergeConfig};
use crate::log_sink::MergeLog;
use crate::segment::types::ProcessedSegment;
use crate::segment::validator::MAX_REASONABLE_DURATION_MS;

/// Длина холста при превышении бюджета памяти (10 минут)
pub const MEMORY_SAFE_LENGTH_MS: i64 = 600_000;
/// Длина холста при неудачном выделении памяти (5 минут)
pub const ALLOCATION_FALLBACK_MS: i64 = 300_000;

/// Частота, стерео и разрядность, по которым оценивается объём памяти
const ESTIMATE_SAMPLE_RATE: f64 = 44_100.0;
const ESTIMATE_BYTES_PER_SAMPLE: f64 = 2.0;
const ESTIMATE_CHANNELS: f64 = 2.0;

/// Позиция сегмента с учётом компенсации паддинга синтезатора
pub fn corrected_start(original_start: i64, padding_correction_ms: i64) -> i64 {
    (original_start - padding_correction_ms).max(0)
}

/// Допустимое расширение таймлайна в режиме fit
pub fn max_allowed_extension(original_duration_ms: i64, max_extension_percent: u32) -> i64 {
    original_duration_ms * max_extension_percent as i64 / 100
}

/// Оценка объёма памяти холста в мегабайтах (44.1 кГц, 16 бит, стерео)
pub fn estimated_memory_mb(length_ms: i64) -> f64 {
    let seconds = length_ms.max(0) as f64 / 1000.0;
    seconds * ESTIMATE_SAMPLE_RATE * ESTIMATE_BYTES_PER_SAMPLE * ESTIMATE_CHANNELS / (1024.0 * 1024.0)
}

/// Длина холста в режиме preserve: до конца самого дальнего сегмента
pub fn preserve_length(original_duration_ms: i64, segments: &[ProcessedSegment]) -> i64 {
    segments
        .iter()
        .filter(|s| s.exists)
        .map(|s| s.placed_end())
        .fold(original_duration_ms, i64::max)
}

/// Суммарное расширение сегментов относительно исходных окон
pub fn total_extension(segments: &[ProcessedSegment]) -> i64 {
    segments.iter().filter(|s| s.exists).map(|s| s.extension_ms()).sum()
}

/// Длина холста в режиме fit: исходная длина плюс ограниченное расширение
pub fn fit_length(original_duration_ms: i64, segments: &[ProcessedSegment], max_extension_percent: u32) -> i64 {
    let allowed = max_allowed_extension(original_duration_ms, max_extension_percent);
    original_duration_ms + total_extension(segments).min(allowed)
}

/// Итоговый план таймлайна
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePlan {
    /// Длина до применения ограничений
    pub requested_ms: i64,
    /// Итоговая длина холста
    pub length_ms: i64,
    /// Ограничено абсолютным пределом (1 час)
    pub capped_by_ceiling: bool,
    /// Ограничено бюджетом памяти
    pub capped_by_memory: bool,
}

/// Рассчитывает длину холста для режима и применяет ограничения.
///
/// Результат не меньше исходной длительности, если она сама не превышает
/// предел безопасности.
pub fn plan_timeline(
    original_duration_ms: i64,
    segments: &[ProcessedSegment],
    config: &MergeConfig,
    sink: &dyn MergeLog,
) -> TimelinePlan {
    let requested = match config.length_handling {
        LengthHandling::Preserve => preserve_length(original_duration_ms, segments),
        LengthHandling::Fit => {
            let allowed = max_allowed_extension(original_duration_ms, config.max_extension_percent);
            let extension = total_extension(segments);
            if extension > allowed {
                sink.info(&format!(
                    "📐 Расширение {}ms ограничено до {}ms ({}%)",
                    extension, allowed, config.max_extension_percent
                ));
            }
            fit_length(original_duration_ms, segments, config.max_extension_percent)
        }
    };

    let mut plan = TimelinePlan {
        requested_ms: requested,
        length_ms: requested,
        capped_by_ceiling: false,
        capped_by_memory: false,
    };

    if plan.length_ms > MAX_REASONABLE_DURATION_MS {
        sink.warn(&format!(
            "⚠️ Таймлайн слишком длинный: {}ms, ограничен до {}ms",
            plan.length_ms, MAX_REASONABLE_DURATION_MS
        ));
        plan.length_ms = MAX_REASONABLE_DURATION_MS;
        plan.capped_by_ceiling = true;
    }

    let memory_mb = estimated_memory_mb(plan.length_ms);
    if memory_mb > config.max_canvas_memory_mb as f64 {
        let safe = plan.length_ms.min(MEMORY_SAFE_LENGTH_MS);
        sink.warn(&format!(
            "⚠️ Оценка памяти {:.1}MB превышает {}MB, длина холста ограничена до {}ms",
            memory_mb, config.max_canvas_memory_mb, safe
        ));
        plan.length_ms = safe;
        plan.capped_by_memory = true;
    }

    sink.info(&format!(
        "📏 Длина таймлайна: {}ms ({:.1} мин)",
        plan.length_ms,
        plan.length_ms as f64 / 60000.0
    ));
    if plan.length_ms < plan.requested_ms {
        sink.warn(&format!(
            "⚠️ Запрошено {}ms, холст короче на {}ms",
            plan.requested_ms,
            plan.requested_ms - plan.length_ms
        ));
    }

    plan
}

//! # Merge
//!
//! Сборка итоговой дорожки из синтезированных фрагментов по исходному
//! таймлайну.
//!
//! Порядок обработки строго последовательный: валидация, загрузка и
//! формирование каждого сегмента, расчёт длины холста, разрешение
//! перекрытий, размещение и экспорт. Прерывают слияние только ошибки
//! входных данных; сбой отдельного сегмента записывается в журнал и
//! учитывается в отчёте.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::audio::{decode_audio_file, resample, AudioBuffer};
use crate::config::{LengthHandling, MergeConfig};
use crate::engine::compressor::{limit_clip_length, shape_fit, shape_preserve, MAX_CLIP_MS};
use crate::engine::overlap::{detect_overlaps, resolve_overlaps};
use crate::engine::placement::Canvas;
use crate::engine::timeline::{corrected_start, plan_timeline};
use crate::error::{MergeError, Result};
use crate::log_sink::MergeLog;
use crate::segment::layout::ClipLayout;
use crate::segment::types::{ProcessedSegment, SourceSegment, SynthesizedClip};
use crate::segment::validator::validate_segments;

/// Частота холста, если ни один фрагмент не загружен
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Итог слияния
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// Путь к записанному файлу
    pub output_path: PathBuf,
    /// Исходная длительность (после ограничения сверху)
    pub original_duration_ms: i64,
    /// Фактическая длительность результата
    pub realized_duration_ms: i64,
    /// Разница с исходной длительностью
    pub delta_ms: i64,
    /// Сегментов на входе
    pub segments_total: usize,
    /// Сегментов после валидации
    pub segments_valid: usize,
    /// Сегментов с загруженным аудио
    pub segments_loaded: usize,
    /// Сегментов, размещённых на холсте
    pub segments_placed: usize,
    /// Найдено перекрытий
    pub overlaps: usize,
    /// Режим обработки длины
    pub length_handling: LengthHandling,
    /// Изменение длины в процентах от исходной
    pub extension_percent: f64,
}

/// Сливает фрагменты из директории `clips_dir` в один файл.
///
/// Базовое имя файлов выводится из пути директории. Возвращает отчёт с
/// фактической длительностью результата.
pub fn merge_segments<P: AsRef<Path>, Q: AsRef<Path>>(
    segments: &[SourceSegment],
    original_duration_ms: i64,
    clips_dir: P,
    output_path: Q,
    config: &MergeConfig,
    sink: &dyn MergeLog,
) -> Result<MergeReport> {
    let layout = ClipLayout::new(clips_dir, None, config);
    merge_with_layout(segments, original_duration_ms, &layout, output_path, config, sink)
}

/// Асинхронная обёртка: слияние выполняется в пуле блокирующих задач tokio
pub async fn merge_segments_async(
    segments: Vec<SourceSegment>,
    original_duration_ms: i64,
    layout: ClipLayout,
    output_path: PathBuf,
    config: MergeConfig,
    sink: Arc<dyn MergeLog>,
) -> Result<MergeReport> {
    tokio::task::spawn_blocking(move || {
        merge_with_layout(&segments, original_duration_ms, &layout, &output_path, &config, sink.as_ref())
    })
    .await
    .map_err(|e| MergeError::Other(anyhow::anyhow!("Merge task failed: {}", e)))?
}

/// Сливает фрагменты по заданной раскладке файлов
pub fn merge_with_layout<Q: AsRef<Path>>(
    segments: &[SourceSegment],
    original_duration_ms: i64,
    layout: &ClipLayout,
    output_path: Q,
    config: &MergeConfig,
    sink: &dyn MergeLog,
) -> Result<MergeReport> {
    let output_path = output_path.as_ref();
    config.validate()?;

    let validated = validate_segments(segments, original_duration_ms, sink)?;
    let original_duration_ms = validated.original_duration_ms;

    if let Err(e) = layout.ensure_dir() {
        sink.error(&format!("❌ Директория фрагментов не найдена: {}", layout.dir.display()));
        return Err(e);
    }

    let padding = config.effective_padding_ms();
    sink.info("🎯 Слияние по абсолютным позициям");
    sink.info(&format!("База: {}, исходная длина: {}ms", layout.base, original_duration_ms));
    sink.info(&format!(
        "Настройки: длина={}, перекрытия={}, расширение={}%",
        config.length_handling.as_str(),
        config.overlap_handling.as_str(),
        config.max_extension_percent
    ));
    if padding > 0 {
        sink.info(&format!("🔧 Компенсация паддинга: сегменты сдвигаются на {}ms раньше", padding));
    }
    sink.info(&format!("Доступно файлов: {}", layout.count_available()));

    // Загрузка и формирование сегментов
    let mut canvas_rate = config.output_sample_rate;
    let mut processed = Vec::with_capacity(validated.segments.len());
    for source in &validated.segments {
        let mut segment = ProcessedSegment::missing(source, corrected_start(source.start_ms, padding));

        if let Some(clip) = load_clip(layout, source, sink) {
            let rate = *canvas_rate.get_or_insert(clip.sample_rate());
            let audio = align_rate(clip, rate, sink);

            if config.enable_smart_compression {
                segment.text = layout.load_transcript(source.index);
            }

            let shaped = shape_segment(audio, source, &segment.text, config, sink);
            segment.set_audio(shaped);

            if padding > 0 {
                sink.info(&format!(
                    "✅ Сегмент {}: {}ms → {}ms (позиция {}ms → {}ms)",
                    segment.index,
                    segment.original_duration,
                    segment.final_duration,
                    segment.original_start,
                    segment.corrected_start
                ));
            } else {
                sink.info(&format!(
                    "✅ Сегмент {}: {}ms → {}ms",
                    segment.index, segment.original_duration, segment.final_duration
                ));
            }
        }

        processed.push(segment);
    }
    let segments_loaded = processed.iter().filter(|s| s.exists).count();
    let canvas_rate = canvas_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

    let plan = plan_timeline(original_duration_ms, &processed, config, sink);

    let pairs = detect_overlaps(&processed, sink);
    if !pairs.is_empty() {
        let resolved = resolve_overlaps(&mut processed, &pairs, config.overlap_handling, sink);
        sink.info(&format!(
            "🔧 Перекрытий: {}, обработано ({}): {}",
            pairs.len(),
            config.overlap_handling.as_str(),
            resolved
        ));
    }

    let mut canvas = Canvas::allocate(plan.length_ms, canvas_rate, sink)?;
    sink.info("🎯 Размещение сегментов...");
    let segments_placed = processed
        .iter()
        .filter(|segment| canvas.place_segment(segment, sink))
        .count();
    sink.info(&format!("📊 Размещено: {}/{} сегментов", segments_placed, segments_loaded));

    canvas.apply_output_guard(sink);

    let realized_duration_ms = canvas.export(output_path)?;
    let delta_ms = realized_duration_ms - original_duration_ms;
    let extension_percent = delta_ms as f64 / original_duration_ms as f64 * 100.0;

    sink.info("🎵 Слияние завершено");
    sink.info(&format!(
        "📊 Итоговая длина: {}ms (исходная: {}ms), изменение: {:+}ms",
        realized_duration_ms, original_duration_ms, delta_ms
    ));
    sink.info(&format!("💾 Сохранено: {}", output_path.display()));

    Ok(MergeReport {
        output_path: output_path.to_path_buf(),
        original_duration_ms,
        realized_duration_ms,
        delta_ms,
        segments_total: segments.len(),
        segments_valid: validated.segments.len(),
        segments_loaded,
        segments_placed,
        overlaps: pairs.len(),
        length_handling: config.length_handling,
        extension_percent,
    })
}

/// Загружает фрагмент сегмента; отсутствующий или повреждённый файл даёт `None`
fn load_clip(layout: &ClipLayout, source: &SourceSegment, sink: &dyn MergeLog) -> Option<SynthesizedClip> {
    let path = layout.clip_path(source.index);
    if !path.is_file() {
        sink.warn(&format!("⚠️ Сегмент {}: файл не найден ({}), окно останется тишиной", source.index, path.display()));
        return None;
    }

    match decode_audio_file(&path) {
        Ok(audio) if audio.is_empty() => {
            sink.warn(&format!("⚠️ Сегмент {}: пустой файл {}", source.index, path.display()));
            None
        }
        Ok(audio) => Some(SynthesizedClip {
            index: source.index,
            audio,
        }),
        Err(e) => {
            sink.error(&format!("❌ Сегмент {}: ошибка загрузки: {}", source.index, e));
            None
        }
    }
}

/// Приводит фрагмент к частоте холста. При ошибке фрагмент остаётся как
/// есть, и размещение уйдёт в ручное смешивание.
fn align_rate(clip: SynthesizedClip, canvas_rate: u32, sink: &dyn MergeLog) -> AudioBuffer {
    if clip.sample_rate() == canvas_rate {
        return clip.audio;
    }
    match resample(&clip.audio, canvas_rate) {
        Ok(audio) => {
            sink.debug(&format!(
                "Сегмент {}: ресемплинг {} Гц → {} Гц",
                clip.index,
                clip.sample_rate(),
                canvas_rate
            ));
            audio
        }
        Err(e) => {
            sink.warn(&format!("⚠️ Сегмент {}: ресемплинг не удался: {}", clip.index, e));
            clip.audio
        }
    }
}

/// Подгоняет длину фрагмента согласно режиму
fn shape_segment(
    mut audio: AudioBuffer,
    source: &SourceSegment,
    text: &str,
    config: &MergeConfig,
    sink: &dyn MergeLog,
) -> AudioBuffer {
    let window_ms = source.duration_ms();

    let before = audio.duration_ms();
    if limit_clip_length(&mut audio) {
        sink.warn(&format!(
            "⚠️ Сегмент {}: фрагмент слишком длинный ({}ms), обрезан до {}ms",
            source.index, before, MAX_CLIP_MS
        ));
    }

    match config.length_handling {
        LengthHandling::Preserve => {
            let before = audio.duration_ms();
            if shape_preserve(&mut audio, window_ms) {
                sink.warn(&format!(
                    "⚠️ Сегмент {}: чрезмерное расширение ограничено ({}ms → {}ms)",
                    source.index,
                    before,
                    audio.duration_ms()
                ));
            }
            audio
        }
        LengthHandling::Fit => shape_fit(&audio, window_ms, text, config, sink),
    }
}

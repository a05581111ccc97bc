//! # Smart Compressor
//!
//! Подгонка затянутого фрагмента под целевую длительность. Сначала
//! сокращаются паузы, затем темп меняется с сохранением высоты тона.
//! Допустимое ускорение зависит от приоритета сегмента: содержательная
//! речь почти не ускоряется, междометия ускоряются сильнее.

use crate::audio::{buffer::AudioBuffer, remove_excessive_silence, time_stretch, trim_leading_silence};
use crate::config::MergeConfig;
use crate::engine::priority;
use crate::error::Result;
use crate::log_sink::MergeLog;

/// Порог высокого приоритета
pub const HIGH_PRIORITY: f32 = 0.8;
/// Порог среднего приоритета
pub const MEDIUM_PRIORITY: f32 = 0.5;

/// Предел ускорения для высокого приоритета
pub const HIGH_MAX_SPEED: f32 = 1.05;
/// Предел ускорения первого прохода для среднего приоритета
pub const MEDIUM_MAX_SPEED: f32 = 1.2;
/// Предел ускорения для низкого приоритета
pub const LOW_MAX_SPEED: f32 = 1.5;
/// Абсолютный предел ускорения, в том числе суммарного
pub const ABSOLUTE_MAX_SPEED: f32 = 2.0;
/// Длина текста, после которой низкоприоритетный сегмент ускоряется дополнительно
pub const LONG_TEXT_CHARS: usize = 50;

/// Длительность, после которой фрагмент считается повреждённым (10 минут)
pub const MAX_CLIP_MS: i64 = 600_000;
/// Затухание при обрезке повреждённого фрагмента
pub const MAX_CLIP_FADE_MS: i64 = 1000;
/// Затухание при обрезке в режиме preserve
pub const PRESERVE_FADE_MS: i64 = 200;
/// Пауза, до которой сокращается тишина в режиме fit
pub const FIT_SILENCE_CAP_MS: i64 = 300;

/// Уровень приоритета
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTier {
    /// Почти без изменений
    High,
    /// Умеренное ускорение с корректирующим вторым проходом
    Medium,
    /// Агрессивное ускорение
    Low,
}

impl PriorityTier {
    pub fn from_priority(priority: f32) -> Self {
        if priority >= HIGH_PRIORITY {
            Self::High
        } else if priority >= MEDIUM_PRIORITY {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// План изменения темпа
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedPlan {
    pub tier: PriorityTier,
    /// Коэффициент ускорения первого прохода
    pub speed: f32,
    /// Предел суммарного ускорения с учётом второго прохода
    pub cumulative_limit: f32,
}

/// Рассчитывает коэффициент ускорения для сегмента.
///
/// # Аргументы
///
/// * `priority` - приоритет сегмента
/// * `current_ms` - текущая длительность фрагмента
/// * `target_ms` - целевая длительность
/// * `text_chars` - длина текста сегмента в символах
pub fn plan_speed(priority: f32, current_ms: i64, target_ms: i64, text_chars: usize) -> SpeedPlan {
    let tier = PriorityTier::from_priority(priority);
    let required = if target_ms > 0 {
        (current_ms as f32 / target_ms as f32).max(1.0)
    } else {
        ABSOLUTE_MAX_SPEED
    };

    let (speed, cumulative_limit) = match tier {
        PriorityTier::High => (required.min(HIGH_MAX_SPEED), HIGH_MAX_SPEED),
        PriorityTier::Medium => (required.min(MEDIUM_MAX_SPEED), ABSOLUTE_MAX_SPEED),
        PriorityTier::Low => {
            let mut speed = required.min(LOW_MAX_SPEED);
            if text_chars > LONG_TEXT_CHARS {
                speed = (speed * 1.1).min(ABSOLUTE_MAX_SPEED);
            }
            (speed, speed)
        }
    };

    SpeedPlan {
        tier,
        speed,
        cumulative_limit,
    }
}

fn stretch_buffer(audio: &AudioBuffer, speed: f32) -> Result<AudioBuffer> {
    let samples = time_stretch(&audio.samples, audio.sample_rate, speed)?;
    Ok(AudioBuffer::new(samples, audio.sample_rate))
}

/// Меняет темп фрагмента по плану, рассчитанному из приоритета.
pub fn compress_with_priority(
    audio: &AudioBuffer,
    target_ms: i64,
    text: &str,
    config: &MergeConfig,
    sink: &dyn MergeLog,
) -> Result<AudioBuffer> {
    let current_ms = audio.duration_ms();
    if current_ms <= target_ms {
        return Ok(audio.clone());
    }

    let priority = priority::score(text, current_ms, &config.lexicon);
    let plan = plan_speed(priority, current_ms, target_ms, text.chars().count());

    let mut adjusted = stretch_buffer(audio, plan.speed)?;
    let mut total_speed = plan.speed;

    if plan.tier == PriorityTier::Medium && adjusted.duration_ms() > target_ms && target_ms > 0 {
        let remaining = adjusted.duration_ms() as f32 / target_ms as f32;
        let second = remaining.min(plan.cumulative_limit / total_speed);
        if second > 1.0 + 1e-3 {
            adjusted = stretch_buffer(&adjusted, second)?;
            total_speed *= second;
        }
    }

    sink.info(&format!(
        "⚡ Темп x{:.2} (приоритет {:.2}, {}): {}ms → {}ms (цель {}ms)",
        total_speed,
        priority,
        plan.tier.as_str(),
        current_ms,
        adjusted.duration_ms(),
        target_ms
    ));

    Ok(adjusted)
}

fn compress_inner(audio: &AudioBuffer, target_ms: i64, text: &str, config: &MergeConfig, sink: &dyn MergeLog) -> Result<AudioBuffer> {
    let mut current = audio.clone();

    if config.trim_leading_silence {
        let (trimmed, removed) = trim_leading_silence(&current);
        if removed > 0 {
            sink.info(&format!("🔇 Удалена тишина в начале: {}ms", removed));
            current = trimmed;
        }
    }

    let (compacted, report) = remove_excessive_silence(&current, config.silence_cap_ms() as i64);
    if report.spans_shortened > 0 {
        sink.info(&format!(
            "🔇 Сокращено пауз: {} (−{}ms)",
            report.spans_shortened, report.removed_ms
        ));
        current = compacted;
    }

    if current.duration_ms() > target_ms {
        current = compress_with_priority(&current, target_ms, text, config, sink)?;
    }

    Ok(current)
}

/// Сжимает фрагмент до целевой длительности.
///
/// Любая ошибка обработки не фатальна: возвращается исходный фрагмент.
pub fn compress(audio: &AudioBuffer, target_ms: i64, text: &str, config: &MergeConfig, sink: &dyn MergeLog) -> AudioBuffer {
    if audio.duration_ms() <= target_ms {
        return audio.clone();
    }

    match compress_inner(audio, target_ms, text, config, sink) {
        Ok(result) => result,
        Err(e) => {
            sink.warn(&format!("⚠️ Ошибка сжатия, используется исходный фрагмент: {}", e));
            audio.clone()
        }
    }
}

/// Обрезает фрагмент длиннее 10 минут с затуханием 1 секунда
pub fn limit_clip_length(audio: &mut AudioBuffer) -> bool {
    if audio.duration_ms() <= MAX_CLIP_MS {
        return false;
    }
    audio.truncate_ms(MAX_CLIP_MS);
    audio.fade_out(MAX_CLIP_FADE_MS);
    true
}

/// Режим preserve: фрагмент используется как есть, если он не длиннее
/// удвоенного окна. Иначе обрезается до 2x с затуханием.
pub fn shape_preserve(audio: &mut AudioBuffer, window_ms: i64) -> bool {
    let cap = window_ms * 2;
    if audio.duration_ms() <= cap {
        return false;
    }
    audio.truncate_ms(cap);
    audio.fade_out(PRESERVE_FADE_MS);
    true
}

/// Предел длительности сегмента в режиме fit: окно плюс его доля расширения
pub fn fit_segment_cap(window_ms: i64, max_extension_percent: u32) -> i64 {
    window_ms + window_ms * max_extension_percent as i64 / 100
}

/// Режим fit: сжатие (если включено), обрезка до предела и дополнение
/// тишиной до длины окна.
pub fn shape_fit(audio: &AudioBuffer, window_ms: i64, text: &str, config: &MergeConfig, sink: &dyn MergeLog) -> AudioBuffer {
    let mut shaped = if config.enable_smart_compression && audio.duration_ms() > window_ms {
        compress(audio, window_ms, text, config, sink)
    } else {
        audio.clone()
    };

    let cap = fit_segment_cap(window_ms, config.max_extension_percent);
    let current = shaped.duration_ms();
    if current > cap {
        shaped.truncate_ms(cap);
        shaped.fade_out((window_ms / 10).min(200));
        sink.info(&format!("✂️ Обрезка до предела: {}ms → {}ms", current, cap));
    } else if current < window_ms {
        shaped.pad_to_ms(window_ms);
        sink.debug(&format!("Дополнение тишиной: {}ms → {}ms", current, window_ms));
    }

    shaped
}

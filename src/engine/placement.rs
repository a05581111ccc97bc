//! # Placement & Export
//!
//! Холст итоговой дорожки и смешивание сегментов. Наложение выполняется
//! простым сложением без ослабления, с ограничением клиппинга. Если
//! наложение не удалось, сегмент смешивается вручную в 16-битном домене.

use std::collections::TryReserveError;
use std::path::Path;

use crate::audio::buffer::{ms_to_samples, samples_to_ms, AudioBuffer};
use crate::audio::format::{encode_wav, to_i16};
use crate::audio::stretch::resample_linear;
use crate::engine::timeline::ALLOCATION_FALLBACK_MS;
use crate::error::{MergeError, Result};
use crate::log_sink::MergeLog;
use crate::segment::types::ProcessedSegment;

/// Ниже этого уровня сегмент усиливается перед размещением
pub const SEGMENT_GUARD_DBFS: f32 = -30.0;
/// Целевой уровень усиления сегмента
pub const SEGMENT_TARGET_DBFS: f32 = -20.0;
/// Ниже этого уровня усиливается весь результат
pub const CANVAS_GUARD_DBFS: f32 = -50.0;
/// Целевой уровень усиления результата
pub const CANVAS_TARGET_DBFS: f32 = -10.0;
/// Затухание сегмента, обрезанного по концу холста
pub const CANVAS_EDGE_FADE_MS: i64 = 100;

/// Усиление для тихого сегмента (None, если усиление не нужно)
pub fn segment_guard_gain(audio: &AudioBuffer) -> Option<f32> {
    let level = audio.dbfs();
    if !level.is_finite() || level >= SEGMENT_GUARD_DBFS {
        return None;
    }
    let gain = (SEGMENT_TARGET_DBFS - level).min(audio.headroom_db());
    (gain > 0.0).then_some(gain)
}

/// Усиление для почти беззвучного результата (None, если усиление не нужно)
pub fn canvas_guard_gain(audio: &AudioBuffer) -> Option<f32> {
    let level = audio.dbfs();
    if !level.is_finite() || level >= CANVAS_GUARD_DBFS {
        return None;
    }
    let gain = (CANVAS_TARGET_DBFS - level).max(-20.0).min(audio.headroom_db());
    (gain > 0.0).then_some(gain)
}

/// Холст итоговой дорожки
#[derive(Debug)]
pub struct Canvas {
    buffer: AudioBuffer,
}

type Reservation = std::result::Result<Vec<f32>, TryReserveError>;

fn try_silent(length_ms: i64, sample_rate: u32) -> Reservation {
    // Округление вверх: длина холста в мс не меньше запрошенной
    let len = (length_ms.max(0) as u64 * sample_rate as u64).div_ceil(1000) as usize;
    let mut samples = Vec::new();
    samples.try_reserve_exact(len)?;
    samples.resize(len, 0.0);
    Ok(samples)
}

impl Canvas {
    /// Выделяет беззвучный холст. При нехватке памяти повторяет попытку
    /// с холстом на 5 минут.
    pub fn allocate(length_ms: i64, sample_rate: u32, sink: &dyn MergeLog) -> Result<Self> {
        if sample_rate == 0 {
            return Err(MergeError::Placement("Canvas sample rate must be positive".to_string()));
        }

        sink.info(&format!("💾 Создание холста {}ms ({} Гц)", length_ms, sample_rate));
        Self::from_reservation(try_silent(length_ms, sample_rate), length_ms, sample_rate, sink)
    }

    /// Холст из результата первой попытки выделения. При ошибке выделяется
    /// холст не длиннее 5 минут.
    fn from_reservation(first: Reservation, length_ms: i64, sample_rate: u32, sink: &dyn MergeLog) -> Result<Self> {
        let samples = match first {
            Ok(samples) => samples,
            Err(e) => {
                let fallback = length_ms.min(ALLOCATION_FALLBACK_MS);
                sink.warn(&format!(
                    "❌ Не удалось выделить холст ({}), повтор с {}ms",
                    e, fallback
                ));
                try_silent(fallback, sample_rate)
                    .map_err(|e| MergeError::Placement(format!("Canvas allocation failed: {}", e)))?
            }
        };
        Ok(Self {
            buffer: AudioBuffer::new(samples, sample_rate),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    pub fn duration_ms(&self) -> i64 {
        self.buffer.duration_ms()
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Накладывает фрагмент на позицию, складывая семплы без ослабления
    pub fn overlay(&mut self, clip: &AudioBuffer, position_ms: i64) -> Result<()> {
        if clip.sample_rate != self.buffer.sample_rate {
            return Err(MergeError::Placement(format!(
                "Sample rate mismatch: clip {} Hz, canvas {} Hz",
                clip.sample_rate, self.buffer.sample_rate
            )));
        }
        if clip.samples.iter().any(|s| !s.is_finite()) {
            return Err(MergeError::Placement("Clip contains non-finite samples".to_string()));
        }

        let start = ms_to_samples(position_ms, self.buffer.sample_rate);
        if start >= self.buffer.len() {
            return Err(MergeError::Placement(format!("Position {}ms is past the canvas end", position_ms)));
        }

        for (dst, &src) in self.buffer.samples[start..].iter_mut().zip(clip.samples.iter()) {
            *dst = (*dst + src).clamp(-1.0, 1.0);
        }
        Ok(())
    }

    /// Ручное смешивание в 16-битном домене.
    ///
    /// Фрагмент с другой частотой приводится к частоте холста линейной
    /// интерполяцией, нечисловые семплы считаются тишиной. Возвращает
    /// количество смешанных семплов.
    pub fn mix_manually(&mut self, clip: &AudioBuffer, position_ms: i64) -> usize {
        let rate = self.buffer.sample_rate;
        let aligned;
        let samples: &[f32] = if clip.sample_rate != rate && clip.sample_rate > 0 {
            let target_len = (clip.len() as u64 * rate as u64 / clip.sample_rate as u64) as usize;
            aligned = resample_linear(&clip.samples, target_len);
            &aligned
        } else {
            &clip.samples
        };

        let start = ms_to_samples(position_ms, rate);
        let mut mixed = 0;
        for (dst, &src) in self.buffer.samples.iter_mut().skip(start).zip(samples.iter()) {
            let sum = to_i16(*dst) as i32 + to_i16(src) as i32;
            let clamped = sum.clamp(i16::MIN as i32, i16::MAX as i32);
            *dst = clamped as f32 / 32767.0;
            mixed += 1;
        }
        mixed
    }

    /// Размещает сегмент по его скорректированной позиции.
    ///
    /// Возвращает `true`, если сегмент попал на холст (обычным
    /// наложением или ручным смешиванием).
    pub fn place_segment(&mut self, segment: &ProcessedSegment, sink: &dyn MergeLog) -> bool {
        let Some(audio) = segment.audio.as_ref() else {
            return false;
        };
        if !segment.exists || audio.is_empty() {
            return false;
        }

        let start_ms = segment.corrected_start;
        let canvas_len = self.buffer.len();
        let start = ms_to_samples(start_ms, self.buffer.sample_rate);
        if start >= canvas_len {
            sink.warn(&format!(
                "⚠️ Сегмент {}: позиция {}ms за пределами холста ({}ms), пропущен",
                segment.index,
                start_ms,
                self.duration_ms()
            ));
            return false;
        }

        let mut clip = audio.clone();

        // Длина в семплах холста; для фрагмента с другой частотой пересчитывается
        let available = canvas_len - start;
        let available_clip = if clip.sample_rate == self.buffer.sample_rate || clip.sample_rate == 0 {
            available
        } else {
            (available as u64 * clip.sample_rate as u64 / self.buffer.sample_rate as u64) as usize
        };
        if clip.len() > available_clip {
            clip.samples.truncate(available_clip);
            clip.fade_out(CANVAS_EDGE_FADE_MS);
            sink.info(&format!(
                "✂️ Сегмент {}: обрезан по концу холста до {}ms",
                segment.index,
                samples_to_ms(available_clip, clip.sample_rate)
            ));
        }

        if let Some(gain) = segment_guard_gain(&clip) {
            clip.apply_gain_db(gain);
            sink.info(&format!("🔊 Сегмент {}: усиление {:.1}dB", segment.index, gain));
        }

        let end_ms = start_ms + clip.duration_ms();
        match self.overlay(&clip, start_ms) {
            Ok(()) => {
                let shift = segment.original_start - segment.corrected_start;
                if shift > 0 {
                    sink.info(&format!(
                        "🎯 Сегмент {}: {}ms~{}ms (сдвиг -{}ms, {:.1} dBFS)",
                        segment.index,
                        start_ms,
                        end_ms,
                        shift,
                        clip.dbfs()
                    ));
                } else {
                    sink.info(&format!(
                        "🎯 Сегмент {}: {}ms~{}ms ({:.1} dBFS)",
                        segment.index,
                        start_ms,
                        end_ms,
                        clip.dbfs()
                    ));
                }
                true
            }
            Err(e) => {
                sink.warn(&format!("❌ Сегмент {}: ошибка наложения: {}", segment.index, e));
                let mixed = self.mix_manually(&clip, start_ms);
                if mixed > 0 {
                    sink.info(&format!("🔄 Сегмент {}: размещён ручным смешиванием", segment.index));
                    true
                } else {
                    sink.error(&format!("❌ Сегмент {}: ручное смешивание не удалось", segment.index));
                    false
                }
            }
        }
    }

    /// Усиливает почти беззвучный результат
    pub fn apply_output_guard(&mut self, sink: &dyn MergeLog) -> Option<f32> {
        let gain = canvas_guard_gain(&self.buffer)?;
        sink.warn(&format!(
            "⚠️ Уровень результата слишком низкий ({:.1} dBFS), усиление {:.1}dB",
            self.buffer.dbfs(),
            gain
        ));
        self.buffer.apply_gain_db(gain);
        Some(gain)
    }

    /// Записывает холст в WAV и возвращает его длительность
    pub fn export<P: AsRef<Path>>(&self, output_path: P) -> Result<i64> {
        encode_wav(&self.buffer, output_path)?;
        Ok(self.duration_ms())
    }
}

//! # Silence Handling
//!
//! Сжатие затянутых пауз и удаление тишины в начале фрагмента.
//! Порог тишины задаётся относительно среднего уровня фрагмента:
//! `dBFS(фрагмента) + offset`, по умолчанию offset = -40 дБ.

use crate::audio::buffer::{ms_to_samples, rms_to_dbfs, compute_rms, AudioBuffer};

/// Смещение порога тишины относительно среднего уровня фрагмента
pub const SILENCE_THRESHOLD_OFFSET_DB: f32 = -40.0;
/// Шаг анализа при поиске пауз
pub const SILENCE_PROBE_MS: i64 = 10;
/// Шаг анализа при удалении тишины в начале
pub const LEADING_PROBE_MS: i64 = 50;
/// Максимум удаляемой тишины в начале
pub const MAX_LEADING_TRIM_MS: i64 = 2000;

/// Результат сжатия пауз
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceReport {
    /// Количество сокращённых пауз
    pub spans_shortened: usize,
    /// Удалено миллисекунд
    pub removed_ms: i64,
}

/// Сокращает все паузы длиннее `max_silence_ms` до `max_silence_ms`.
///
/// Пауза - непрерывная цепочка окон, уровень которых ниже порога.
/// От длинной паузы сохраняются её начало и конец (по половине предела),
/// середина вырезается, чтобы не обрывать затухание и атаку речи.
pub fn remove_excessive_silence(buffer: &AudioBuffer, max_silence_ms: i64) -> (AudioBuffer, SilenceReport) {
    let mut report = SilenceReport { spans_shortened: 0, removed_ms: 0 };
    let overall = buffer.dbfs();
    if buffer.is_empty() || !overall.is_finite() {
        return (buffer.clone(), report);
    }

    let threshold = overall + SILENCE_THRESHOLD_OFFSET_DB;
    let probe = ms_to_samples(SILENCE_PROBE_MS, buffer.sample_rate).max(1);
    let cap = ms_to_samples(max_silence_ms, buffer.sample_rate);
    let flags = silent_windows(&buffer.samples, probe, threshold);

    let mut output = Vec::with_capacity(buffer.len());
    let mut pos = 0usize;
    let mut w = 0usize;
    while w < flags.len() {
        if !flags[w] {
            let end = ((w + 1) * probe).min(buffer.len());
            output.extend_from_slice(&buffer.samples[pos..end]);
            pos = end;
            w += 1;
            continue;
        }

        let run_start = w;
        while w < flags.len() && flags[w] {
            w += 1;
        }
        let span_start = run_start * probe;
        let span_end = (w * probe).min(buffer.len());
        let span_len = span_end - span_start;

        if span_len > cap {
            let head = cap / 2;
            let tail = cap - head;
            output.extend_from_slice(&buffer.samples[span_start..span_start + head]);
            output.extend_from_slice(&buffer.samples[span_end - tail..span_end]);
            report.spans_shortened += 1;
            report.removed_ms += crate::audio::buffer::samples_to_ms(span_len - cap, buffer.sample_rate);
        } else {
            output.extend_from_slice(&buffer.samples[span_start..span_end]);
        }
        pos = span_end;
    }

    (AudioBuffer::new(output, buffer.sample_rate), report)
}

/// Удаляет тишину в начале фрагмента, но не более 2 секунд.
///
/// Возвращает буфер и количество удалённых миллисекунд.
pub fn trim_leading_silence(buffer: &AudioBuffer) -> (AudioBuffer, i64) {
    let overall = buffer.dbfs();
    if buffer.is_empty() || !overall.is_finite() {
        return (buffer.clone(), 0);
    }

    let threshold = overall + SILENCE_THRESHOLD_OFFSET_DB;
    let chunk = ms_to_samples(LEADING_PROBE_MS, buffer.sample_rate).max(1);

    let mut trim = 0usize;
    for window in buffer.samples.chunks(chunk) {
        // Слишком короткий хвостовой кусок не оцениваем
        if window.len() < chunk / 2 {
            break;
        }
        if rms_to_dbfs(compute_rms(window)) > threshold {
            break;
        }
        trim += window.len();
    }

    let trim = trim.min(ms_to_samples(MAX_LEADING_TRIM_MS, buffer.sample_rate)).min(buffer.len());
    if trim == 0 {
        return (buffer.clone(), 0);
    }

    let trimmed = AudioBuffer::new(buffer.samples[trim..].to_vec(), buffer.sample_rate);
    (trimmed, crate::audio::buffer::samples_to_ms(trim, buffer.sample_rate))
}

fn silent_windows(samples: &[f32], probe: usize, threshold_db: f32) -> Vec<bool> {
    samples
        .chunks(probe)
        .map(|window| rms_to_dbfs(compute_rms(window)) <= threshold_db)
        .collect()
}

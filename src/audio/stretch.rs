//! # Time Stretching
//!
//! Изменение темпа речи без изменения высоты тона (WSOLA).
//!
//! Входной сигнал режется на перекрывающиеся окна Ханна. Окна выбираются с
//! шагом анализа `hop * tempo`, но каждое окно сдвигается в пределах
//! `tolerance` к позиции, наиболее похожей на естественное продолжение
//! предыдущего окна. Это сохраняет периодичность голоса и убирает
//! «металлический» оттенок простого OLA.

use log::debug;

use crate::error::{MergeError, Result};

/// Длительность окна анализа в миллисекундах
const FRAME_MS: f32 = 30.0;
/// Окно поиска наилучшего сдвига в миллисекундах
const TOLERANCE_MS: f32 = 8.0;
/// Прореживание при вычислении корреляции
const CORRELATION_STEP: usize = 4;

/// Меняет темп аудио, сохраняя высоту тона.
///
/// * `tempo` > 1.0 ускоряет (результат короче), < 1.0 замедляет.
///
/// Длина результата равна `round(input.len() / tempo)`.
pub fn time_stretch(input: &[f32], sample_rate: u32, tempo: f32) -> Result<Vec<f32>> {
    if !tempo.is_finite() || tempo <= 0.0 {
        return Err(MergeError::TimeStretching(format!("Invalid tempo factor: {}", tempo)));
    }
    if sample_rate == 0 {
        return Err(MergeError::TimeStretching("Sample rate must be positive".to_string()));
    }
    if input.is_empty() || (tempo - 1.0).abs() < 1e-3 {
        return Ok(input.to_vec());
    }

    let target_len = (input.len() as f64 / tempo as f64).round() as usize;

    let mut frame = ((sample_rate as f32 * FRAME_MS / 1000.0) as usize).max(64);
    frame += frame % 2;
    if input.len() < frame * 2 {
        debug!("Фрагмент слишком короткий для WSOLA ({} семплов), линейная интерполяция", input.len());
        return Ok(resample_linear(input, target_len));
    }

    let hop = frame / 2;
    let analysis_hop = hop as f64 * tempo as f64;
    let tolerance = (sample_rate as f32 * TOLERANCE_MS / 1000.0) as usize;
    let window = hann_window(frame);
    let max_start = input.len() - frame;

    let mut output = vec![0.0f32; target_len + frame * 2];
    let mut norm = vec![0.0f32; target_len + frame * 2];

    let mut prev_start = 0usize;
    let mut out_pos = 0usize;
    let mut k = 0usize;

    while out_pos < target_len {
        let nominal = (k as f64 * analysis_hop).round() as usize;
        if nominal > max_start {
            break;
        }

        let start = if k == 0 {
            0
        } else {
            let natural = prev_start + hop;
            if natural <= max_start {
                best_offset(input, natural, nominal, tolerance, frame, max_start)
            } else {
                nominal
            }
        };

        for i in 0..frame {
            let w = window[i];
            output[out_pos + i] += input[start + i] * w;
            norm[out_pos + i] += w;
        }

        prev_start = start;
        out_pos += hop;
        k += 1;
    }

    for (sample, &weight) in output.iter_mut().zip(norm.iter()) {
        if weight > 1e-3 {
            *sample /= weight;
        }
    }
    output.resize(target_len, 0.0);

    debug!(
        "WSOLA: темп {:.3}, {} -> {} семплов ({} окон)",
        tempo,
        input.len(),
        output.len(),
        k
    );
    Ok(output)
}

/// Ищет начало окна в `[nominal - tolerance, nominal + tolerance]`,
/// максимально коррелирующее с естественным продолжением предыдущего окна.
fn best_offset(
    input: &[f32],
    natural: usize,
    nominal: usize,
    tolerance: usize,
    frame: usize,
    max_start: usize,
) -> usize {
    let reference = &input[natural..natural + frame];
    let from = nominal.saturating_sub(tolerance);
    let to = (nominal + tolerance).min(max_start);

    let mut best = nominal.min(max_start);
    let mut best_score = f32::NEG_INFINITY;
    for candidate in from..=to {
        let segment = &input[candidate..candidate + frame];
        let score: f32 = reference
            .iter()
            .zip(segment.iter())
            .step_by(CORRELATION_STEP)
            .map(|(a, b)| a * b)
            .sum();
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / len as f32).cos())
        .collect()
}

/// Линейная интерполяция до заданной длины (для очень коротких фрагментов)
pub fn resample_linear(input: &[f32], target_len: usize) -> Vec<f32> {
    if input.is_empty() || target_len == 0 {
        return Vec::new();
    }
    if input.len() == 1 {
        return vec![input[0]; target_len];
    }
    let scale = (input.len() - 1) as f64 / (target_len.max(2) - 1) as f64;
    (0..target_len)
        .map(|i| {
            let pos = i as f64 * scale;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx.min(input.len() - 1)];
            let b = input[(idx + 1).min(input.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    /// Оценка основной частоты по числу пересечений нуля
    fn zero_crossing_freq(samples: &[f32], sample_rate: u32) -> f32 {
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] < 0.0 && w[1] >= 0.0) || (w[0] >= 0.0 && w[1] < 0.0))
            .count();
        crossings as f32 / 2.0 / (samples.len() as f32 / sample_rate as f32)
    }

    #[test]
    fn test_speedup_length_and_pitch() {
        let sample_rate = 16000;
        let input = sine(220.0, 1.0, sample_rate);
        let output = time_stretch(&input, sample_rate, 1.5).unwrap();

        assert_eq!(output.len(), (input.len() as f32 / 1.5).round() as usize);

        // Высота тона сохраняется: частота пересечений нуля почти не меняется
        let core = &output[800..output.len() - 800];
        let freq = zero_crossing_freq(core, sample_rate);
        assert!((freq - 220.0).abs() < 15.0, "частота {}", freq);
    }

    #[test]
    fn test_slowdown_length() {
        let input = sine(300.0, 0.5, 8000);
        let output = time_stretch(&input, 8000, 0.8).unwrap();
        assert_eq!(output.len(), 5000);
    }

    #[test]
    fn test_identity_and_invalid() {
        let input = sine(300.0, 0.2, 8000);
        assert_eq!(time_stretch(&input, 8000, 1.0).unwrap(), input);
        assert!(time_stretch(&input, 8000, 0.0).is_err());
        assert!(time_stretch(&input, 8000, f32::NAN).is_err());
        assert!(time_stretch(&input, 0, 1.2).is_err());
    }

    #[test]
    fn test_short_input_falls_back_to_interpolation() {
        let input = vec![0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5, 0.0, 0.5];
        let output = time_stretch(&input, 8000, 2.0).unwrap();
        assert_eq!(output.len(), 5);
    }
}

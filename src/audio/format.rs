//! # Audio Format Handling
//!
//! Модуль для декодирования синтезированных фрагментов, приведения их к
//! частоте холста и записи результата в WAV.
//!
//! ## Основные возможности
//!
//! - Декодирование WAV (hound) и сжатых форматов MP3, AAC, FLAC, OGG (symphonia)
//! - Сведение многоканального аудио в моно
//! - Ресемплинг через Rubato с Sinc-интерполяцией
//! - Запись 16-битного PCM WAV

use std::fs::File;
use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info, warn};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::buffer::{samples_to_ms, AudioBuffer};
use crate::error::{MergeError, Result};

/// Декодирует аудиофайл в моно PCM-буфер.
///
/// WAV читается через hound, остальные форматы через Symphonia.
/// Формат определяется по расширению файла.
pub fn decode_audio_file<P: AsRef<Path>>(file_path: P) -> Result<AudioBuffer> {
    let file_path = file_path.as_ref();
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" => decode_wav_file(file_path),
        "mp3" | "m4a" | "aac" | "flac" | "ogg" => decode_with_symphonia(file_path, &extension),
        _ => Err(MergeError::AudioDecoding(format!(
            "Unsupported audio format: {} ({})",
            extension,
            file_path.display()
        ))),
    }
}

/// Декодирует WAV-файл в моно PCM-буфер.
///
/// Поддерживаются 8/16/24/32-битные целочисленные и 32-битные float WAV.
pub fn decode_wav_file<P: AsRef<Path>>(file_path: P) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(file_path.as_ref())?;
    let spec = reader.spec();

    let pcm_data: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        _ => {
            return Err(MergeError::AudioDecoding(format!(
                "Unsupported WAV format: {:?}, {} bits",
                spec.sample_format, spec.bits_per_sample
            )));
        }
    };

    let samples = downmix_interleaved(&pcm_data, spec.channels as usize);
    Ok(AudioBuffer::new(samples, spec.sample_rate))
}

fn decode_with_symphonia(file_path: &Path, extension: &str) -> Result<AudioBuffer> {
    let mut buffer = Vec::new();
    File::open(file_path)?.read_to_end(&mut buffer)?;

    let cursor = std::io::Cursor::new(buffer);
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MergeError::AudioDecoding(format!("Failed to probe audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MergeError::AudioDecoding("No audio track found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MergeError::AudioDecoding(format!("Failed to create decoder: {}", e)))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut pcm_data = Vec::new();

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                let channels = spec.channels.count().max(1);

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                pcm_data.extend(downmix_interleaved(sample_buf.samples(), channels));
            }
            Err(e) => {
                warn!("Skipping undecodable packet in {}: {}", file_path.display(), e);
                continue;
            }
        }
    }

    info!(
        "Декодировано {} семплов из файла {} с частотой {}",
        pcm_data.len(),
        file_path.display(),
        sample_rate
    );
    Ok(AudioBuffer::new(pcm_data, sample_rate))
}

/// Сводит чередующиеся каналы в моно усреднением
pub fn downmix_interleaved(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Длительность аудиофайла в миллисекундах.
///
/// Для WAV читается только заголовок, остальные форматы декодируются целиком.
pub fn probe_duration_ms<P: AsRef<Path>>(file_path: P) -> Result<i64> {
    let file_path = file_path.as_ref();
    let is_wav = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    if is_wav {
        let reader = WavReader::open(file_path)?;
        let spec = reader.spec();
        return Ok(samples_to_ms(reader.duration() as usize, spec.sample_rate));
    }

    Ok(decode_audio_file(file_path)?.duration_ms())
}

/// Приводит буфер к целевой частоте дискретизации через Rubato.
///
/// Вход подаётся блоками фиксированного размера, последний блок дополняется
/// нулями. Задержка фильтра компенсируется, длина результата равна
/// `len * target / source`.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if buffer.sample_rate == target_rate || buffer.is_empty() {
        return Ok(AudioBuffer::new(buffer.samples.clone(), target_rate));
    }
    if buffer.sample_rate == 0 || target_rate == 0 {
        return Err(MergeError::AudioProcessing("Sample rate must be positive".to_string()));
    }

    let ratio = target_rate as f64 / buffer.sample_rate as f64;
    let sinc_len = 128;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let block_size = 1024;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, block_size, 1)
        .map_err(|e| MergeError::AudioProcessing(format!("Failed to initialise resampler: {}", e)))?;

    let expected_len = (buffer.len() as f64 * ratio).round() as usize;
    let delay = (sinc_len as f64 / 2.0 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected_len + delay + block_size * 2);

    let mut idx = 0;
    // Лишние нулевые блоки выталкивают хвост, задержанный фильтром
    let flush_blocks = 2;
    let total_blocks = buffer.len().div_ceil(block_size) + flush_blocks;

    for _ in 0..total_blocks {
        let needed = resampler.input_frames_next();
        let mut chunk = vec![0.0f32; needed];
        if idx < buffer.len() {
            let take = needed.min(buffer.len() - idx);
            chunk[..take].copy_from_slice(&buffer.samples[idx..idx + take]);
            idx += take;
        }

        let current_frames = vec![chunk];
        let frames = resampler
            .process(&current_frames, None)
            .map_err(|e| MergeError::AudioProcessing(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);

        if idx >= buffer.len() && output.len() >= expected_len + delay {
            break;
        }
    }

    let mut samples: Vec<f32> = output.into_iter().skip(delay).collect();
    samples.resize(expected_len, 0.0);

    debug!(
        "Ресемплинг {} Гц -> {} Гц: {} -> {} семплов",
        buffer.sample_rate,
        target_rate,
        buffer.len(),
        samples.len()
    );
    Ok(AudioBuffer::new(samples, target_rate))
}

/// Записывает буфер в моно WAV-файл (16 бит PCM).
pub fn encode_wav<P: AsRef<Path>>(buffer: &AudioBuffer, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = WavWriter::create(output_path, spec)?;
    for &sample in &buffer.samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;

    info!(
        "Сохранен WAV-файл: {} ({} семплов, {} Гц)",
        output_path.display(),
        buffer.len(),
        buffer.sample_rate
    );
    Ok(())
}

/// Переводит f32-семпл в 16-битный с ограничением диапазона
pub fn to_i16(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sine(freq: f32, duration_ms: i64, sample_rate: u32) -> AudioBuffer {
        let n = (duration_ms as u64 * sample_rate as u64 / 1000) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    #[test]
    fn test_wav_encode_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("clip.wav");

        let original = sine(440.0, 100, 16000);
        encode_wav(&original, &path).unwrap();

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.samples.iter().zip(decoded.samples.iter()) {
            assert!((a - b).abs() < 0.001);
        }
        assert_eq!(probe_duration_ms(&path).unwrap(), 100);
    }

    #[test]
    fn test_stereo_wav_is_downmixed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..800 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode_wav_file(&path).unwrap();
        assert_eq!(decoded.len(), 800);
        assert!((decoded.samples[10] - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = decode_audio_file("clip.xyz").unwrap_err();
        assert!(matches!(err, MergeError::AudioDecoding(_)));
    }

    #[test]
    fn test_resample_length() {
        let input = sine(440.0, 500, 16000);
        let output = resample(&input, 24000).unwrap();
        assert_eq!(output.sample_rate, 24000);
        assert_eq!(output.len(), 12000);
        assert!(output.rms() > 0.2);

        let same = resample(&input, 16000).unwrap();
        assert_eq!(same, input);
    }

    #[test]
    fn test_to_i16_clamps() {
        assert_eq!(to_i16(2.0), 32767);
        assert_eq!(to_i16(-2.0), -32768);
        assert_eq!(to_i16(f32::NAN), 0);
    }
}

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::{decode_audio_file, AudioBuffer};

pub const TEST_RATE: u32 = 16_000;

/// Записывает синусоидальный фрагмент в 16-битный моно WAV
pub fn write_tone(path: &Path, duration_ms: i64, sample_rate: u32, amplitude: f32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let n = (duration_ms as u64 * sample_rate as u64 / 1000) as usize;
    for i in 0..n {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * std::f32::consts::PI * 220.0 * t).sin() * amplitude;
        writer.write_sample((value * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Создает директорию `base` внутри `root` с фрагментами заданной длины.
///
/// `None` в списке означает отсутствующий файл.
pub fn make_clips(root: &Path, base: &str, durations: &[Option<i64>]) -> PathBuf {
    let dir = root.join(base);
    std::fs::create_dir_all(&dir).unwrap();
    for (i, duration) in durations.iter().enumerate() {
        if let Some(ms) = duration {
            write_tone(&dir.join(format!("{}_{:03}.wav", base, i + 1)), *ms, TEST_RATE, 0.5);
        }
    }
    dir
}

pub fn read_output(path: &Path) -> AudioBuffer {
    decode_audio_file(path).unwrap()
}

pub fn rms_between(audio: &AudioBuffer, start_ms: i64, end_ms: i64) -> f32 {
    audio.slice_ms(start_ms, end_ms).rms()
}

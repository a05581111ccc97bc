//! # Audio
//!
//! Примитивы работы с PCM: буфер, форматы файлов, изменение темпа и
//! обработка тишины.

pub mod buffer;
pub mod format;
pub mod silence;
pub mod stretch;

pub use buffer::{ms_to_samples, samples_to_ms, AudioBuffer};
pub use format::{decode_audio_file, encode_wav, probe_duration_ms, resample};
pub use silence::{remove_excessive_silence, trim_leading_silence};
pub use stretch::time_stretch;

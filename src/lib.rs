//! Основной файл библиотеки tts-merge
//!
//! Библиотека собирает независимо синтезированные фрагменты речи в одну
//! дорожку, сохраняя тайминг исходного аудио. Исходное аудио разбито на
//! окна субтитров, речь каждого окна синтезирована отдельно (обычно с другой
//! длительностью) и должна быть возвращена на исходный таймлайн без потери
//! общей синхронности.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod log_sink;
pub mod logger;
pub mod segment;
pub mod subtitle;

pub use audio::AudioBuffer;
pub use config::{LengthHandling, MergeConfig, OverlapHandling, ScoringLexicon};
pub use engine::{merge_segments, merge_segments_async, merge_with_layout, MergeReport};
pub use error::{MergeError, Result};
pub use log_sink::{CollectingLog, LogEntry, LogForwarder, MergeLog};
pub use segment::{select_segments, ClipLayout, ProcessedSegment, SourceSegment, SynthesizedClip};
pub use subtitle::{parse_segments_file, parse_segments_str};

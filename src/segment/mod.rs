//! Модуль сегментов: типы, валидация и раскладка файлов фрагментов

pub mod layout;
pub mod types;
pub mod validator;

pub use layout::{derive_base_name, ClipLayout};
pub use types::{segments_from_pairs, select_segments, ProcessedSegment, SourceSegment, SynthesizedClip};
pub use validator::{validate_segments, ValidatedInput, MAX_REASONABLE_DURATION_MS, MAX_SEGMENT_DURATION_MS};

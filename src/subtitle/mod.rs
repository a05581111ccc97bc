//! Модуль для работы с субтитрами

pub mod parser;

pub use parser::{parse_segments_file, parse_segments_str, timestamp_to_ms};

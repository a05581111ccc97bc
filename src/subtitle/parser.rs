//! Модуль для парсинга субтитров
//!
//! Из SRT/VTT-файла извлекаются только строки с временными метками
//! `HH:MM:SS,mmm --> HH:MM:SS,mmm` (допускается точка вместо запятой).
//! Индексы сегментов назначаются по порядку, начиная с 1.

use std::path::Path;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::error::{MergeError, Result};
use crate::segment::SourceSegment;

lazy_static! {
    static ref TIME_RANGE_RE: Regex =
        Regex::new(r"(\d{2}:\d{2}:\d{2}[.,]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[.,]\d{3})").unwrap();
}

/// Переводит метку `HH:MM:SS,mmm` в миллисекунды
pub fn timestamp_to_ms(timestamp: &str) -> Result<i64> {
    let normalized = timestamp.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return Err(MergeError::SubtitleParsing(format!("Invalid timestamp: {}", timestamp)));
    }

    let (seconds, millis) = parts[2]
        .split_once('.')
        .ok_or_else(|| MergeError::SubtitleParsing(format!("Missing milliseconds: {}", timestamp)))?;

    let field = |value: &str, name: &str| -> Result<i64> {
        value
            .parse::<i64>()
            .map_err(|_| MergeError::SubtitleParsing(format!("Invalid {} in timestamp: {}", name, timestamp)))
    };

    let hours = field(parts[0], "hours")?;
    let minutes = field(parts[1], "minutes")?;
    let seconds = field(seconds, "seconds")?;
    let millis = field(millis, "milliseconds")?;

    Ok((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

/// Парсинг содержимого субтитров из строки
pub fn parse_segments_str(content: &str) -> Result<Vec<SourceSegment>> {
    let mut segments = Vec::new();

    for line in content.lines() {
        if let Some(caps) = TIME_RANGE_RE.captures(line) {
            let (start_ms, end_ms) = match (timestamp_to_ms(&caps[1]), timestamp_to_ms(&caps[2])) {
                (Ok(start), Ok(end)) => (start, end),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Пропуск строки с поврежденной меткой '{}': {}", line.trim(), e);
                    continue;
                }
            };
            let index = segments.len() + 1;
            debug!("Сегмент {}: {} → {} ({}~{}ms)", index, &caps[1], &caps[2], start_ms, end_ms);
            segments.push(SourceSegment::new(index, start_ms, end_ms));
        }
    }

    Ok(segments)
}

/// Парсинг файла субтитров
pub fn parse_segments_file<P: AsRef<Path>>(path: P) -> Result<Vec<SourceSegment>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| MergeError::SubtitleParsing(format!("Failed to read {}: {}", path.display(), e)))?;
    let content = String::from_utf8_lossy(&bytes);

    let segments = parse_segments_str(&content)?;
    info!("Парсинг субтитров завершен: {} ({} сегментов)", path.display(), segments.len());
    Ok(segments)
}

//! # Segment Types
//!
//! Типы данных сегментов на всех стадиях слияния: исходное окно субтитра,
//! синтезированный фрагмент и подготовленный к размещению сегмент.

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;

/// Окно исходного аудио, ограниченное субтитром
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSegment {
    /// Порядковый номер (с 1)
    pub index: usize,
    /// Начало в миллисекундах
    pub start_ms: i64,
    /// Конец в миллисекундах
    pub end_ms: i64,
}

impl SourceSegment {
    pub fn new(index: usize, start_ms: i64, end_ms: i64) -> Self {
        Self { index, start_ms, end_ms }
    }

    /// Длительность окна
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Строит сегменты из пар (start, end), нумеруя их с 1
pub fn segments_from_pairs(pairs: &[(i64, i64)]) -> Vec<SourceSegment> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| SourceSegment::new(i + 1, start, end))
        .collect()
}

/// Оставляет только сегменты с указанными номерами (с 1).
///
/// Номер сегмента сохраняется, поэтому поиск файлов фрагментов остаётся
/// согласованным с исходной нумерацией. Порядок следует списку `indices`,
/// неизвестные номера пропускаются.
pub fn select_segments(segments: &[SourceSegment], indices: &[usize]) -> Vec<SourceSegment> {
    indices
        .iter()
        .filter_map(|&idx| segments.iter().find(|s| s.index == idx).copied())
        .collect()
}

/// Синтезированный фрагмент речи для одного сегмента
#[derive(Debug, Clone)]
pub struct SynthesizedClip {
    /// Номер сегмента
    pub index: usize,
    /// Декодированное аудио
    pub audio: AudioBuffer,
}

impl SynthesizedClip {
    pub fn duration_ms(&self) -> i64 {
        self.audio.duration_ms()
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }
}

/// Сегмент, подготовленный к размещению на холсте
#[derive(Debug, Clone)]
pub struct ProcessedSegment {
    /// Номер сегмента
    pub index: usize,
    /// Исходное начало окна
    pub original_start: i64,
    /// Начало с учётом компенсации паддинга: `max(0, original_start - padding)`
    pub corrected_start: i64,
    /// Исходная длительность окна
    pub original_duration: i64,
    /// Длительность после обработки
    pub final_duration: i64,
    /// Аудио сегмента (отсутствует, если файл не найден или не декодирован)
    pub audio: Option<AudioBuffer>,
    /// Текст сегмента для оценки приоритета
    pub text: String,
    /// Есть ли синтезированное аудио
    pub exists: bool,
}

impl ProcessedSegment {
    /// Пустой сегмент без аудио: его окно останется тишиной
    pub fn missing(source: &SourceSegment, corrected_start: i64) -> Self {
        Self {
            index: source.index,
            original_start: source.start_ms,
            corrected_start,
            original_duration: source.duration_ms(),
            final_duration: source.duration_ms(),
            audio: None,
            text: String::new(),
            exists: false,
        }
    }

    /// Устанавливает аудио и синхронизирует длительность
    pub fn set_audio(&mut self, audio: AudioBuffer) {
        self.final_duration = audio.duration_ms();
        self.audio = Some(audio);
        self.exists = true;
    }

    /// Конец сегмента на холсте
    pub fn placed_end(&self) -> i64 {
        self.corrected_start + self.final_duration
    }

    /// Превышение длительности над исходным окном
    pub fn extension_ms(&self) -> i64 {
        (self.final_duration - self.original_duration).max(0)
    }
}

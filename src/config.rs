//! Модуль конфигурации библиотеки tts-merge
//!
//! Этот модуль содержит структуры и перечисления для настройки слияния.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// Стратегия обработки длины синтезированных фрагментов
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthHandling {
    /// Сохранять синтез почти как есть, холст растёт под самый длинный сегмент
    #[default]
    Preserve,
    /// Подгонять под исходную длину с ограниченным расширением
    Fit,
}

impl LengthHandling {
    /// Получить строковое представление режима
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::Fit => "fit",
        }
    }
}

impl std::str::FromStr for LengthHandling {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "fit" => Ok(Self::Fit),
            other => Err(MergeError::Configuration(format!("Unknown length handling: {}", other))),
        }
    }
}

/// Способ разрешения перекрытий соседних сегментов
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlapHandling {
    /// Кроссфейд: ранний сегмент затухает, поздний нарастает
    #[default]
    Fade,
    /// Обрезка раннего сегмента по началу позднего
    Cut,
}

impl OverlapHandling {
    /// Получить строковое представление режима
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Cut => "cut",
        }
    }
}

impl std::str::FromStr for OverlapHandling {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fade" => Ok(Self::Fade),
            "cut" => Ok(Self::Cut),
            other => Err(MergeError::Configuration(format!("Unknown overlap handling: {}", other))),
        }
    }
}

/// Словарь для оценки приоритета сегмента
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScoringLexicon {
    /// Признаки законченного предложения (пунктуация и окончания)
    pub terminal_markers: Vec<String>,
    /// Короткие междометия и односложные ответы
    pub fillers: Vec<String>,
}

impl Default for ScoringLexicon {
    fn default() -> Self {
        Self {
            terminal_markers: [".", "!", "?", "。", "！", "？", "다", "요", "니다"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fillers: ["네", "예", "아", "오", "응", "음", "uh", "um", "ah", "oh", "hm", "mm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Конфигурация слияния
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Режим обработки длины
    pub length_handling: LengthHandling,
    /// Режим обработки перекрытий
    pub overlap_handling: OverlapHandling,
    /// Максимальное расширение таймлайна в режиме fit, в процентах
    pub max_extension_percent: u32,
    /// Включить умное сжатие (тишина + темп по приоритету)
    pub enable_smart_compression: bool,
    /// Компенсировать паддинг, который добавляет синтезатор перед речью
    pub correct_cosyvoice_padding: bool,
    /// Величина компенсации паддинга в миллисекундах
    pub padding_correction_ms: i64,
    /// Максимальная длина паузы после сжатия тишины (300-500 мс)
    pub max_silence_ms: u32,
    /// Удалять тишину в начале фрагмента перед сжатием
    pub trim_leading_silence: bool,
    /// Частота дискретизации результата (по умолчанию берется у первого фрагмента)
    pub output_sample_rate: Option<u32>,
    /// Предельный оценочный объём памяти холста в мегабайтах
    pub max_canvas_memory_mb: u64,
    /// Расширение файлов синтезированных фрагментов
    pub clip_extension: String,
    /// Язык файлов с текстом сегментов
    pub transcript_language: String,
    /// Словарь для оценки приоритета
    pub lexicon: ScoringLexicon,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            length_handling: LengthHandling::default(),
            overlap_handling: OverlapHandling::default(),
            max_extension_percent: 50,
            enable_smart_compression: true,
            correct_cosyvoice_padding: true,
            padding_correction_ms: 200,
            max_silence_ms: 300,
            trim_leading_silence: false,
            output_sample_rate: None,
            max_canvas_memory_mb: 1000,
            clip_extension: "wav".to_string(),
            transcript_language: "ko".to_string(),
            lexicon: ScoringLexicon::default(),
        }
    }
}

impl MergeConfig {
    /// Загрузить конфигурацию из JSON-строки
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить конфигурацию из JSON-файла
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Проверить согласованность настроек
    pub fn validate(&self) -> Result<()> {
        if self.output_sample_rate == Some(0) {
            return Err(MergeError::Configuration("output_sample_rate must be positive".to_string()));
        }
        if self.padding_correction_ms < 0 {
            return Err(MergeError::Configuration("padding_correction_ms must not be negative".to_string()));
        }
        if self.clip_extension.trim().is_empty() {
            return Err(MergeError::Configuration("clip_extension must not be empty".to_string()));
        }
        if self.max_canvas_memory_mb == 0 {
            return Err(MergeError::Configuration("max_canvas_memory_mb must be positive".to_string()));
        }
        Ok(())
    }

    /// Фактическая компенсация паддинга с учётом флага
    pub fn effective_padding_ms(&self) -> i64 {
        if self.correct_cosyvoice_padding {
            self.padding_correction_ms
        } else {
            0
        }
    }

    /// Предел паузы для сжатия тишины, приведённый к диапазону 300-500 мс
    pub fn silence_cap_ms(&self) -> u32 {
        self.max_silence_ms.clamp(300, 500)
    }
}

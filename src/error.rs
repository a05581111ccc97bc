//! Модуль обработки ошибок библиотеки tts-merge
//!
//! Глобальные ошибки (нет сегментов, неверная длительность) прерывают слияние.
//! Ошибки отдельных сегментов наружу не выходят: они логируются и
//! учитываются в отчёте.

use thiserror::Error;

/// Ошибки библиотеки tts-merge
#[derive(Debug, Error)]
pub enum MergeError {
    /// После валидации не осталось ни одного сегмента
    #[error("No valid segments (original duration {original_duration_ms}ms left unchanged)")]
    NoValidSegments {
        /// Исходная длительность, возвращаемая вызывающему без изменений
        original_duration_ms: i64,
    },

    /// Неположительная исходная длительность
    #[error("Invalid original duration: {original_duration_ms}ms")]
    InvalidOriginalDuration {
        original_duration_ms: i64,
    },

    /// Директория с синтезированными фрагментами не найдена
    #[error("Clip directory not found: {0}")]
    ClipDirectoryMissing(String),

    /// Ошибка парсинга субтитров
    #[error("Subtitle parsing error: {0}")]
    SubtitleParsing(String),

    /// Ошибка декодирования аудио
    #[error("Audio decoding error: {0}")]
    AudioDecoding(String),

    /// Ошибка обработки аудио
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка изменения темпа
    #[error("Time-stretching error: {0}")]
    TimeStretching(String),

    /// Ошибка размещения сегмента на холсте
    #[error("Placement error: {0}")]
    Placement(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка WAV-кодирования
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl MergeError {
    /// Длительность, которую следует считать результатом при ошибке входных данных.
    ///
    /// Для ошибок входа возвращается исходная длительность без изменений,
    /// для остальных ошибок результата нет.
    pub fn fallback_duration_ms(&self) -> Option<i64> {
        match self {
            Self::NoValidSegments { original_duration_ms }
            | Self::InvalidOriginalDuration { original_duration_ms } => Some(*original_duration_ms),
            _ => None,
        }
    }

    /// Является ли ошибка нарушением глобальных предусловий
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoValidSegments { .. } | Self::InvalidOriginalDuration { .. } | Self::ClipDirectoryMissing(_)
        )
    }
}

impl From<&str> for MergeError {
    fn from(s: &str) -> Self {
        MergeError::Other(anyhow::anyhow!(s.to_string()))
    }
}

impl From<String> for MergeError {
    fn from(s: String) -> Self {
        MergeError::Other(anyhow::anyhow!(s))
    }
}

/// Тип Result для библиотеки tts-merge
pub type Result<T> = std::result::Result<T, MergeError>;

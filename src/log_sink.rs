//! Модуль журнала решений слияния
//!
//! Каждое решение о сжатии, перекрытии и длине таймлайна записывается в
//! приёмник, который передаёт вызывающий код. Глобального состояния нет:
//! приёмник живёт столько, сколько нужно вызывающему.

use std::sync::Arc;

use chrono::{DateTime, Local};
use log::Level;
use parking_lot::Mutex;

/// Приёмник сообщений журнала слияния
pub trait MergeLog: Send + Sync {
    /// Записать сообщение с указанным уровнем
    fn record(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }

    fn debug(&self, message: &str) {
        self.record(Level::Debug, message);
    }
}

impl<T: MergeLog + ?Sized> MergeLog for &T {
    fn record(&self, level: Level, message: &str) {
        (**self).record(level, message);
    }
}

impl<T: MergeLog + ?Sized> MergeLog for Arc<T> {
    fn record(&self, level: Level, message: &str) {
        (**self).record(level, message);
    }
}

/// Приёмник, перенаправляющий сообщения в фасад `log`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogForwarder;

impl MergeLog for LogForwarder {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: "tts_merge::merge", level, "{}", message);
    }
}

/// Одна запись журнала
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Время записи
    pub timestamp: DateTime<Local>,
    /// Уровень
    pub level: Level,
    /// Текст сообщения
    pub message: String,
}

/// Приёмник, накапливающий сообщения в памяти
///
/// Если задан `forward`, сообщения дополнительно уходят в фасад `log`.
#[derive(Debug, Default)]
pub struct CollectingLog {
    entries: Mutex<Vec<LogEntry>>,
    forward: bool,
}

impl CollectingLog {
    /// Создать пустой накопитель
    pub fn new() -> Self {
        Self::default()
    }

    /// Создать накопитель, который также пишет в фасад `log`
    pub fn forwarding() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            forward: true,
        }
    }

    /// Снимок всех записей
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Только тексты сообщений
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Есть ли сообщение, содержащее подстроку
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Количество записей с уровнем не ниже указанного
    pub fn count_at_least(&self, level: Level) -> usize {
        self.entries.lock().iter().filter(|e| e.level <= level).count()
    }

    /// Очистить журнал
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl MergeLog for CollectingLog {
    fn record(&self, level: Level, message: &str) {
        if self.forward {
            LogForwarder.record(level, message);
        }
        self.entries.lock().push(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_log() {
        let log = CollectingLog::new();
        log.info("first");
        log.warn("second warning");
        log.debug("details");

        assert_eq!(log.messages(), vec!["first", "second warning", "details"]);
        assert!(log.contains("warning"));
        assert_eq!(log.count_at_least(Level::Warn), 1);
        assert_eq!(log.count_at_least(Level::Info), 2);

        log.clear();
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_forwarding_log_still_collects() {
        crate::logger::init_logger();
        let log = CollectingLog::forwarding();
        log.warn("forwarded");
        assert_eq!(log.messages(), vec!["forwarded"]);
        assert_eq!(log.count_at_least(Level::Warn), 1);
    }

    #[test]
    fn test_shared_sink_forwards() {
        let shared = Arc::new(CollectingLog::new());
        let as_trait: Arc<dyn MergeLog> = shared.clone();
        as_trait.error("boom");
        (&*shared).info("by reference");
        assert_eq!(shared.messages(), vec!["boom", "by reference"]);
    }
}

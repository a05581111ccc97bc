//! # Clip Layout
//!
//! Раскладка файлов синтезированных фрагментов в директории:
//! `{base}_{index:03}.{ext}` и тексты в `txt/{lang}/{base}_{index:03}.{lang}.txt`.

use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::config::MergeConfig;
use crate::error::{MergeError, Result};

/// Раскладка файлов фрагментов одного ролика
#[derive(Debug, Clone)]
pub struct ClipLayout {
    /// Директория фрагментов
    pub dir: PathBuf,
    /// Базовое имя файлов
    pub base: String,
    /// Расширение файлов без точки
    pub extension: String,
    /// Язык файлов с текстом
    pub language: String,
}

impl ClipLayout {
    /// Создает раскладку; без явного `base` имя выводится из пути директории
    pub fn new<P: AsRef<Path>>(dir: P, base: Option<&str>, config: &MergeConfig) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let base = match base {
            Some(name) => name.to_string(),
            None => derive_base_name(&dir),
        };
        Self {
            dir,
            base,
            extension: config.clip_extension.trim_start_matches('.').to_string(),
            language: config.transcript_language.clone(),
        }
    }

    /// Имя файла без директории
    pub fn clip_file_name(&self, index: usize) -> String {
        format!("{}_{:03}.{}", self.base, index, self.extension)
    }

    /// Путь к фрагменту сегмента
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.dir.join(self.clip_file_name(index))
    }

    /// Путь к тексту сегмента
    pub fn transcript_path(&self, index: usize) -> PathBuf {
        self.dir
            .join("txt")
            .join(&self.language)
            .join(format!("{}_{:03}.{}.txt", self.base, index, self.language))
    }

    /// Читает текст сегмента; отсутствующий или нечитаемый файл даёт пустую строку
    pub fn load_transcript(&self, index: usize) -> String {
        let path = self.transcript_path(index);
        match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Err(e) => {
                debug!("Текст сегмента {} недоступен ({}): {}", index, path.display(), e);
                String::new()
            }
        }
    }

    /// Проверяет, что директория фрагментов существует
    pub fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(MergeError::ClipDirectoryMissing(self.dir.display().to_string()))
        }
    }

    /// Количество файлов с нужным расширением прямо в директории
    pub fn count_available(&self) -> usize {
        let suffix = format!(".{}", self.extension.to_lowercase());
        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_string_lossy().to_lowercase().ends_with(&suffix))
            .count()
    }
}

/// Выводит базовое имя файлов из пути директории фрагментов.
///
/// Для путей вида `.../split_audio/<base>/.../cosy_output/...` берётся
/// компонент после `split_audio`. Для прочих путей с `cosy_output` берётся
/// директория на уровень выше `cosy_output`, иначе имя самой директории.
pub fn derive_base_name(dir: &Path) -> String {
    let parts: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let dir_name = parts.last().cloned().unwrap_or_default();

    let Some(cosy_index) = parts.iter().position(|p| p == "cosy_output") else {
        return dir_name;
    };

    if let Some(split_index) = parts.iter().position(|p| p == "split_audio") {
        if split_index + 1 < parts.len() {
            return parts[split_index + 1].clone();
        }
    }

    if cosy_index >= 1 {
        return parts[cosy_index - 1].clone();
    }

    dir_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_base_name() {
        assert_eq!(
            derive_base_name(Path::new("/data/split_audio/lecture01/cosy_output/instruct")),
            "lecture01"
        );
        assert_eq!(derive_base_name(Path::new("/data/episode7/cosy_output")), "episode7");
        assert_eq!(derive_base_name(Path::new("/tmp/clips/movie")), "movie");
    }

    #[test]
    fn test_paths() {
        let config = MergeConfig::default();
        let layout = ClipLayout::new("/tmp/out", Some("talk"), &config);
        assert_eq!(layout.clip_path(7), PathBuf::from("/tmp/out/talk_007.wav"));
        assert_eq!(
            layout.transcript_path(12),
            PathBuf::from("/tmp/out/txt/ko/talk_012.ko.txt")
        );
    }

    #[test]
    fn test_count_and_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let config = MergeConfig::default();
        let layout = ClipLayout::new(dir.path(), Some("clip"), &config);

        std::fs::write(dir.path().join("clip_001.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("clip_002.WAV"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(layout.count_available(), 2);

        let txt = layout.transcript_path(1);
        std::fs::create_dir_all(txt.parent().unwrap()).unwrap();
        std::fs::write(&txt, "  안녕하세요.\n").unwrap();
        assert_eq!(layout.load_transcript(1), "안녕하세요.");
        assert_eq!(layout.load_transcript(2), "");
    }

    #[test]
    fn test_missing_dir() {
        let config = MergeConfig::default();
        let layout = ClipLayout::new("/nonexistent/clips", None, &config);
        assert!(matches!(layout.ensure_dir(), Err(MergeError::ClipDirectoryMissing(_))));
    }
}

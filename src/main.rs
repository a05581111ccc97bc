use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use tts_merge::audio::probe_duration_ms;
use tts_merge::{
    merge_segments_async, parse_segments_file, select_segments, ClipLayout, LengthHandling, LogForwarder,
    MergeConfig, MergeLog, OverlapHandling,
};

/// Сборка синтезированных фрагментов речи по таймлайну субтитров
#[derive(Parser, Debug)]
#[command(name = "tts-merge", version, about)]
struct Cli {
    /// Файл субтитров (SRT или VTT) с временными метками сегментов
    #[arg(long)]
    srt: PathBuf,

    /// Директория с фрагментами `{base}_{index:03}.{ext}`
    #[arg(long)]
    clips: PathBuf,

    /// Путь к итоговому WAV-файлу
    #[arg(long)]
    output: PathBuf,

    /// Длительность исходного аудио в миллисекундах
    #[arg(long, conflicts_with = "original_audio", required_unless_present = "original_audio")]
    original_duration_ms: Option<i64>,

    /// Исходный аудиофайл, из которого берётся длительность
    #[arg(long)]
    original_audio: Option<PathBuf>,

    /// JSON-файл с настройками слияния
    #[arg(long)]
    config: Option<PathBuf>,

    /// Режим обработки длины: preserve или fit
    #[arg(long)]
    length_handling: Option<LengthHandling>,

    /// Режим обработки перекрытий: fade или cut
    #[arg(long)]
    overlap_handling: Option<OverlapHandling>,

    /// Максимальное расширение таймлайна в режиме fit, %
    #[arg(long)]
    max_extension: Option<u32>,

    /// Отключить умное сжатие
    #[arg(long)]
    no_smart_compression: bool,

    /// Отключить компенсацию паддинга синтезатора
    #[arg(long)]
    no_padding_correction: bool,

    /// Базовое имя файлов фрагментов (по умолчанию выводится из пути)
    #[arg(long)]
    base: Option<String>,

    /// Объединить только указанные сегменты, например `1,3,5`
    #[arg(long, value_delimiter = ',')]
    only: Vec<usize>,
}

impl Cli {
    fn merge_config(&self) -> Result<MergeConfig> {
        let mut config = match &self.config {
            Some(path) => MergeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => MergeConfig::default(),
        };

        if let Some(mode) = self.length_handling {
            config.length_handling = mode;
        }
        if let Some(mode) = self.overlap_handling {
            config.overlap_handling = mode;
        }
        if let Some(percent) = self.max_extension {
            config.max_extension_percent = percent;
        }
        if self.no_smart_compression {
            config.enable_smart_compression = false;
        }
        if self.no_padding_correction {
            config.correct_cosyvoice_padding = false;
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_original_duration(&self) -> Result<i64> {
        match (&self.original_audio, self.original_duration_ms) {
            (_, Some(ms)) => Ok(ms),
            (Some(path), None) => probe_duration_ms(path)
                .with_context(|| format!("Failed to read duration of {}", path.display())),
            (None, None) => bail!("Either --original-duration-ms or --original-audio is required"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tts_merge::logger::init_logger();
    let cli = Cli::parse();

    let config = cli.merge_config()?;
    let original_duration_ms = cli.resolve_original_duration()?;

    let mut segments = parse_segments_file(&cli.srt)
        .with_context(|| format!("Failed to parse subtitles {}", cli.srt.display()))?;
    if !cli.only.is_empty() {
        segments = select_segments(&segments, &cli.only);
        info!("Выбрано сегментов: {} из списка {:?}", segments.len(), cli.only);
    }

    let layout = ClipLayout::new(&cli.clips, cli.base.as_deref(), &config);
    let sink: Arc<dyn MergeLog> = Arc::new(LogForwarder);

    match merge_segments_async(segments, original_duration_ms, layout, cli.output.clone(), config, sink).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            if let Some(duration) = e.fallback_duration_ms() {
                error!("Слияние не выполнено, исходная длительность {}ms без изменений", duration);
            }
            Err(e).context("Merge failed")
        }
    }
}

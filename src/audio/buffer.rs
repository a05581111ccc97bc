//! # Audio Buffer
//!
//! Владеющий моно PCM-буфер (f32, диапазон [-1.0, 1.0]) с операциями,
//! которые нужны движку слияния: срезы по миллисекундам, fade in/out,
//! усиление в децибелах и измерение уровня в dBFS.

/// Моно PCM-буфер с частотой дискретизации
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Семплы PCM (f32)
    pub samples: Vec<f32>,
    /// Частота дискретизации в Гц
    pub sample_rate: u32,
}

/// Переводит миллисекунды в количество семплов
pub fn ms_to_samples(ms: i64, sample_rate: u32) -> usize {
    if ms <= 0 {
        return 0;
    }
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

/// Переводит количество семплов в миллисекунды (с округлением вниз)
pub fn samples_to_ms(samples: usize, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    (samples as u64 * 1000 / sample_rate as u64) as i64
}

/// Переводит децибелы в линейный коэффициент
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

impl AudioBuffer {
    /// Создает буфер из семплов
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Создает буфер тишины заданной длительности
    pub fn silent(duration_ms: i64, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; ms_to_samples(duration_ms, sample_rate)],
            sample_rate,
        }
    }

    /// Длительность в миллисекундах
    pub fn duration_ms(&self) -> i64 {
        samples_to_ms(self.samples.len(), self.sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Копия участка [start_ms, end_ms)
    pub fn slice_ms(&self, start_ms: i64, end_ms: i64) -> AudioBuffer {
        let start = ms_to_samples(start_ms, self.sample_rate).min(self.samples.len());
        let end = ms_to_samples(end_ms, self.sample_rate).min(self.samples.len()).max(start);
        AudioBuffer::new(self.samples[start..end].to_vec(), self.sample_rate)
    }

    /// Обрезает буфер до указанной длительности
    pub fn truncate_ms(&mut self, duration_ms: i64) {
        let len = ms_to_samples(duration_ms, self.sample_rate);
        self.samples.truncate(len);
    }

    /// Дополняет буфер тишиной до указанной длительности
    pub fn pad_to_ms(&mut self, duration_ms: i64) {
        let len = ms_to_samples(duration_ms, self.sample_rate);
        if self.samples.len() < len {
            self.samples.resize(len, 0.0);
        }
    }

    /// Линейное нарастание громкости в начале буфера
    pub fn fade_in(&mut self, fade_ms: i64) {
        let fade = ms_to_samples(fade_ms, self.sample_rate).min(self.samples.len());
        if fade == 0 {
            return;
        }
        for (i, sample) in self.samples[..fade].iter_mut().enumerate() {
            *sample *= i as f32 / fade as f32;
        }
    }

    /// Линейное затухание громкости в конце буфера
    pub fn fade_out(&mut self, fade_ms: i64) {
        let fade = ms_to_samples(fade_ms, self.sample_rate).min(self.samples.len());
        if fade == 0 {
            return;
        }
        let start = self.samples.len() - fade;
        for (i, sample) in self.samples[start..].iter_mut().enumerate() {
            *sample *= 1.0 - (i + 1) as f32 / fade as f32;
        }
    }

    /// Среднеквадратичное значение
    pub fn rms(&self) -> f32 {
        compute_rms(&self.samples)
    }

    /// Максимальная абсолютная амплитуда
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()))
    }

    /// Уровень в dBFS относительно полной шкалы 1.0 (тишина = -inf)
    pub fn dbfs(&self) -> f32 {
        rms_to_dbfs(self.rms())
    }

    /// Усиливает буфер на указанное количество децибел с ограничением клиппинга
    pub fn apply_gain_db(&mut self, db: f32) {
        let gain = db_to_gain(db);
        for sample in self.samples.iter_mut() {
            *sample = (*sample * gain).clamp(-1.0, 1.0);
        }
    }

    /// Максимальное усиление в дБ, при котором пик не превысит 1.0
    pub fn headroom_db(&self) -> f32 {
        let peak = self.peak();
        if peak <= 0.0 {
            return f32::INFINITY;
        }
        -20.0 * peak.log10()
    }
}

/// Вычисляет среднеквадратичное значение (RMS) для массива семплов.
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Переводит RMS в dBFS
pub fn rms_to_dbfs(rms: f32) -> f32 {
    if rms <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * rms.log10()
}

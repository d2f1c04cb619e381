//! Configuration for the mastering pipeline.
//!
//! [`Config`] collects every tunable of the engine with builder-style
//! setters; [`Config::validate`] is called once at the pipeline entry and
//! rejects inconsistent setups with error 4202. [`ResultSpec`] describes one
//! requested output file.

use std::path::{Path, PathBuf};

use crate::error::MasterError;

/// The near-unity ceiling used for reference pre-normalization, the default
/// limiter threshold, and "normalize" outputs: `(2^15 - 61) / 2^15`.
pub const LIMITED_MAXIMUM_POINT: f32 = 32707.0 / 32768.0;

/// Output sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Pcm16,
    Pcm24,
    Float32,
}

/// One requested output of the pipeline.
#[derive(Debug, Clone)]
pub struct ResultSpec {
    /// Output file path.
    pub path: PathBuf,
    /// Sample format to write.
    pub bit_depth: BitDepth,
    /// Apply the brickwall limiter to this output.
    pub use_limiter: bool,
    /// Scale the (non-limited) output so its peak hits the ceiling.
    pub normalize: bool,
    /// Write a short excerpt of the loudest region instead of the full track.
    pub preview: bool,
}

impl ResultSpec {
    /// 16-bit PCM output with the limiter engaged.
    pub fn pcm16(path: impl AsRef<Path>) -> Self {
        Self::new(path, BitDepth::Pcm16)
    }

    /// 24-bit PCM output with the limiter engaged.
    pub fn pcm24(path: impl AsRef<Path>) -> Self {
        Self::new(path, BitDepth::Pcm24)
    }

    /// 32-bit float output with the limiter engaged.
    pub fn float32(path: impl AsRef<Path>) -> Self {
        Self::new(path, BitDepth::Float32)
    }

    pub fn new(path: impl AsRef<Path>, bit_depth: BitDepth) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            bit_depth,
            use_limiter: true,
            normalize: false,
            preview: false,
        }
    }

    /// Skip the limiter for this output.
    pub fn without_limiter(mut self) -> Self {
        self.use_limiter = false;
        self
    }

    /// Peak-normalize this output (only meaningful without the limiter).
    pub fn with_normalize(mut self) -> Self {
        self.normalize = true;
        self
    }

    /// Produce a loudest-region excerpt instead of the full signal.
    pub fn with_preview(mut self) -> Self {
        self.preview = true;
        self
    }
}

/// Hyrax limiter parameters.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Brickwall ceiling in linear amplitude.
    pub threshold: f32,
    /// Attack time constant in milliseconds.
    pub attack_ms: f32,
    /// Hold duration in milliseconds.
    pub hold_ms: f32,
    /// Release time constant in milliseconds.
    pub release_ms: f32,
    /// Look-ahead in milliseconds; rounded up to a power-of-two sample count.
    pub lookahead_ms: f32,
    /// Time constants of the cascaded envelope smoothers, in milliseconds.
    /// Ascent is smoothed per stage; descent passes through instantly.
    pub smoothing_stages_ms: Vec<f32>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: LIMITED_MAXIMUM_POINT,
            attack_ms: 1.0,
            hold_ms: 1.0,
            release_ms: 60.0,
            lookahead_ms: 1.0,
            smoothing_stages_ms: vec![0.5, 2.0],
        }
    }
}

impl LimiterConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_attack_ms(mut self, ms: f32) -> Self {
        self.attack_ms = ms;
        self
    }

    pub fn with_hold_ms(mut self, ms: f32) -> Self {
        self.hold_ms = ms;
        self
    }

    pub fn with_release_ms(mut self, ms: f32) -> Self {
        self.release_ms = ms;
        self
    }

    pub fn with_lookahead_ms(mut self, ms: f32) -> Self {
        self.lookahead_ms = ms;
        self
    }

    pub fn with_smoothing_stages_ms(mut self, stages: Vec<f32>) -> Self {
        self.smoothing_stages_ms = stages;
        self
    }

    fn validate(&self, min_value: f32) -> Result<(), MasterError> {
        if !(self.threshold > min_value && self.threshold < 1.0) {
            return Err(MasterError::InvalidConfig(format!(
                "limiter threshold must be in ({}, 1.0), got {}",
                min_value, self.threshold
            )));
        }
        for (name, v) in [
            ("attack_ms", self.attack_ms),
            ("hold_ms", self.hold_ms),
            ("release_ms", self.release_ms),
            ("lookahead_ms", self.lookahead_ms),
        ] {
            if !(v > 0.0) {
                return Err(MasterError::InvalidConfig(format!(
                    "limiter {} must be positive, got {}",
                    name, v
                )));
            }
        }
        if self.smoothing_stages_ms.is_empty() {
            return Err(MasterError::InvalidConfig(
                "limiter needs at least one smoothing stage".to_string(),
            ));
        }
        if self.smoothing_stages_ms.iter().any(|&ms| !(ms > 0.0)) {
            return Err(MasterError::InvalidConfig(
                "limiter smoothing stages must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Preview (loudest-excerpt) extraction parameters.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Maximum excerpt duration in seconds.
    pub size_seconds: f32,
    /// Hop between analyzed windows in seconds.
    pub analysis_step_seconds: f32,
    /// Edge fade duration in seconds.
    pub fade_seconds: f32,
    /// The fade never exceeds excerpt length divided by this.
    pub fade_coefficient: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            size_seconds: 30.0,
            analysis_step_seconds: 5.0,
            fade_seconds: 1.0,
            fade_coefficient: 8,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fixed processing sample rate.
    pub internal_sample_rate: u32,
    /// FFT size for analysis and FIR length. Power of two.
    pub fft_size: usize,
    /// Maximum analysis-piece length in seconds.
    pub piece_size_seconds: f32,
    /// Validation cap on input length, in seconds.
    pub max_length_seconds: f32,
    /// Numerical floor substituted for denominators below it.
    pub min_value: f32,
    /// Linear-to-log grid oversampling factor for FIR smoothing.
    pub lin_log_oversampling: usize,
    /// LOESS span as a fraction of the log-grid length.
    pub loess_span: f32,
    /// LOESS skip distance on the unit grid; points closer than this to the
    /// previous exact fit are linearly interpolated.
    pub loess_delta: f32,
    /// Number of RMS correction steps (K).
    pub rms_correction_steps: usize,
    /// Peak-census count above which a full-scale source counts as clipping.
    pub clipping_samples_threshold: usize,
    /// Peak-census count above which a source counts as already limited.
    pub limited_samples_threshold: usize,
    /// Permit TARGET == REFERENCE (useful for self-mastering tests).
    pub allow_equality: bool,
    /// Keep the raw ratio at spectrum bins 1 and N-1 after smoothing.
    pub preserve_edge_bins: bool,
    /// Directory for the reference statistics cache; `None` disables it.
    pub reference_cache_folder: Option<PathBuf>,
    /// Scratch directory hint for savers.
    pub temp_folder: Option<PathBuf>,
    /// Preview extraction parameters.
    pub preview: PreviewConfig,
    /// Limiter parameters.
    pub limiter: LimiterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_sample_rate: 44100,
            fft_size: 32768,
            piece_size_seconds: 15.0,
            max_length_seconds: 15.0 * 60.0,
            min_value: 1e-6,
            lin_log_oversampling: 4,
            loess_span: 0.075,
            loess_delta: 0.001,
            rms_correction_steps: 4,
            clipping_samples_threshold: 8,
            limited_samples_threshold: 128,
            allow_equality: false,
            preserve_edge_bins: true,
            reference_cache_folder: None,
            temp_folder: None,
            preview: PreviewConfig::default(),
            limiter: LimiterConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_internal_sample_rate(mut self, rate: u32) -> Self {
        self.internal_sample_rate = rate;
        self
    }

    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn with_piece_size_seconds(mut self, seconds: f32) -> Self {
        self.piece_size_seconds = seconds;
        self
    }

    pub fn with_max_length_seconds(mut self, seconds: f32) -> Self {
        self.max_length_seconds = seconds;
        self
    }

    pub fn with_lin_log_oversampling(mut self, factor: usize) -> Self {
        self.lin_log_oversampling = factor;
        self
    }

    pub fn with_loess_span(mut self, span: f32) -> Self {
        self.loess_span = span;
        self
    }

    pub fn with_rms_correction_steps(mut self, steps: usize) -> Self {
        self.rms_correction_steps = steps;
        self
    }

    pub fn with_allow_equality(mut self, allow: bool) -> Self {
        self.allow_equality = allow;
        self
    }

    pub fn with_preserve_edge_bins(mut self, preserve: bool) -> Self {
        self.preserve_edge_bins = preserve;
        self
    }

    pub fn with_reference_cache_folder(mut self, dir: impl AsRef<Path>) -> Self {
        self.reference_cache_folder = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_temp_folder(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_folder = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_limiter(mut self, limiter: LimiterConfig) -> Self {
        self.limiter = limiter;
        self
    }

    /// Maximum piece length in samples at the internal rate.
    #[inline]
    pub fn max_piece_size(&self) -> usize {
        (self.piece_size_seconds as f64 * self.internal_sample_rate as f64) as usize
    }

    /// Validation cap on input length in samples.
    #[inline]
    pub fn max_length_samples(&self) -> usize {
        (self.max_length_seconds as f64 * self.internal_sample_rate as f64) as usize
    }

    /// Minimum input length: one FFT window.
    #[inline]
    pub fn min_length_samples(&self) -> usize {
        self.fft_size
    }

    /// Checks cross-field consistency. Called once at the pipeline entry.
    pub fn validate(&self) -> Result<(), MasterError> {
        if self.internal_sample_rate == 0 {
            return Err(MasterError::InvalidConfig(
                "internal_sample_rate must be positive".to_string(),
            ));
        }
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(MasterError::InvalidConfig(format!(
                "fft_size must be a power of two >= 2, got {}",
                self.fft_size
            )));
        }
        if !(self.min_value > 0.0 && self.min_value < 0.1) {
            return Err(MasterError::InvalidConfig(format!(
                "min_value must be in (0, 0.1), got {}",
                self.min_value
            )));
        }
        if !(self.piece_size_seconds > 0.0) || self.max_piece_size() <= self.fft_size {
            return Err(MasterError::InvalidConfig(format!(
                "piece_size_seconds must span more than one FFT window \
                 ({} samples), got {} s",
                self.fft_size, self.piece_size_seconds
            )));
        }
        if self.max_length_seconds <= self.piece_size_seconds {
            return Err(MasterError::InvalidConfig(
                "max_length_seconds must exceed piece_size_seconds".to_string(),
            ));
        }
        if self.lin_log_oversampling == 0 {
            return Err(MasterError::InvalidConfig(
                "lin_log_oversampling must be positive".to_string(),
            ));
        }
        if !(self.loess_span > 0.0 && self.loess_span < 1.0) {
            return Err(MasterError::InvalidConfig(format!(
                "loess_span must be in (0, 1), got {}",
                self.loess_span
            )));
        }
        if !(self.loess_delta >= 0.0) {
            return Err(MasterError::InvalidConfig(
                "loess_delta must be non-negative".to_string(),
            ));
        }
        if self.limited_samples_threshold <= self.clipping_samples_threshold {
            return Err(MasterError::InvalidConfig(
                "limited_samples_threshold must exceed clipping_samples_threshold".to_string(),
            ));
        }
        if self.preview.fade_coefficient < 2 {
            return Err(MasterError::InvalidConfig(
                "preview fade_coefficient must be at least 2".to_string(),
            ));
        }
        if !(self.preview.size_seconds > self.preview.analysis_step_seconds) {
            return Err(MasterError::InvalidConfig(
                "preview size must exceed the analysis step".to_string(),
            ));
        }
        self.limiter.validate(self.min_value)
    }
}

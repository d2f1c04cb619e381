#![allow(dead_code)]

use std::f32::consts::PI;

use refmaster::{AudioBuffer, Config};

/// Deterministic linear congruential generator for reproducible noise.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform sample in [-1, 1).
    pub fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32 / (1 << 23) as f32) - 1.0
    }
}

/// Mono sine wave.
pub fn sine(freq: f32, rate: u32, n: usize, amp: f32) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * PI * freq * i as f32 / rate as f32).sin())
        .collect()
}

/// Pink-ish noise via the Paul Kellet filter over LCG white noise,
/// scaled to the requested RMS.
pub fn pink_noise(n: usize, target_rms: f32, seed: u64) -> Vec<f32> {
    let mut lcg = Lcg::new(seed);
    let (mut b0, mut b1, mut b2) = (0.0f32, 0.0f32, 0.0f32);
    let mut out: Vec<f32> = (0..n)
        .map(|_| {
            let white = lcg.next_f32();
            b0 = 0.99765 * b0 + white * 0.0990460;
            b1 = 0.96300 * b1 + white * 0.2965164;
            b2 = 0.57000 * b2 + white * 1.0526913;
            b0 + b1 + b2 + white * 0.1848
        })
        .collect();

    let current = rms(&out);
    if current > 0.0 {
        let gain = target_rms / current;
        for x in out.iter_mut() {
            *x *= gain;
        }
    }
    out
}

/// RMS with f64 accumulation.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum: f64 = signal.iter().map(|&x| x as f64 * x as f64).sum();
    (sum / signal.len() as f64).sqrt() as f32
}

/// Peak absolute value.
pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

/// Builds a stereo buffer from one channel duplicated to both sides.
pub fn stereo_from_mono(channel: &[f32], rate: u32) -> AudioBuffer {
    AudioBuffer::from_stereo_channels(channel, channel, rate)
}

/// A configuration small enough for fast end-to-end tests.
pub fn fast_config() -> Config {
    Config::default()
        .with_fft_size(4096)
        .with_piece_size_seconds(1.0)
}

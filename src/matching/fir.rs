//! FIR synthesis from the reference/target magnitude ratio.
//!
//! The matching filter is derived per channel (Mid and Side separately):
//! the raw bin-by-bin ratio is resampled onto a logarithmic frequency grid,
//! smoothed with LOESS so that narrow peaks and notches collapse while
//! broadband tilt survives, resampled back, mirrored into a zero-phase
//! spectrum, and turned into a Hann-windowed linear-phase impulse response
//! of exactly `fft_size` taps.

use crate::config::Config;
use crate::core::fft::{half_bins, ifft_shift, inverse_real_symmetric};
use crate::core::interpolate::CubicSpline;
use crate::core::smoothing::loess;
use crate::core::types::Sample;
use crate::core::window::{apply_window, hann_window};

/// Bin-by-bin `reference / target` ratio with the target floored at
/// `epsilon`.
pub fn ratio_spectrum(target: &[f32], reference: &[f32], epsilon: f32) -> Vec<f32> {
    debug_assert_eq!(target.len(), reference.len());
    target
        .iter()
        .zip(reference.iter())
        .map(|(&t, &r)| r / t.max(epsilon))
        .collect()
}

/// Linear frequency grid: `rate/2 * k / (N/2)` for `k` in `0..=N/2`.
fn linear_grid(fft_size: usize, sample_rate: u32) -> Vec<f64> {
    let half = fft_size / 2;
    let nyquist = sample_rate as f64 * 0.5;
    (0..=half).map(|k| nyquist * k as f64 / half as f64).collect()
}

/// Logarithmic frequency grid spanning `[4/N * rate/2, rate/2]` with
/// `N/2 * oversampling + 1` points.
fn log_grid(fft_size: usize, sample_rate: u32, oversampling: usize) -> Vec<f64> {
    let nyquist = sample_rate as f64 * 0.5;
    let points = (fft_size / 2) * oversampling + 1;
    let lo = (4.0 / fft_size as f64).log10();
    (0..points)
        .map(|j| {
            let e = lo + (0.0 - lo) * j as f64 / (points - 1) as f64;
            nyquist * 10f64.powf(e)
        })
        .collect()
}

/// Smooths a ratio curve through the log-domain LOESS round trip.
///
/// Returns the smoothed half spectrum with the DC bin stripped and,
/// when `preserve_edge_bins` is set, the raw ratio restored at bin 1
/// (the Hermitian mirror restores its twin at `N-1`).
pub fn smooth_ratio(ratio: &[f32], config: &Config) -> Vec<f32> {
    let fft_size = config.fft_size;
    debug_assert_eq!(ratio.len(), half_bins(fft_size));

    let grid_lin = linear_grid(fft_size, config.internal_sample_rate);
    let grid_log = log_grid(
        fft_size,
        config.internal_sample_rate,
        config.lin_log_oversampling,
    );

    let ratio_f64: Vec<f64> = ratio.iter().map(|&v| v as f64).collect();
    let to_log = CubicSpline::new(&grid_lin, &ratio_f64);
    let on_log: Vec<f32> = grid_log
        .iter()
        .map(|&f| to_log.evaluate(f) as f32)
        .collect();

    let smoothed_log = loess(&on_log, config.loess_span, config.loess_delta);

    let smoothed_f64: Vec<f64> = smoothed_log.iter().map(|&v| v as f64).collect();
    let to_lin = CubicSpline::new(&grid_log, &smoothed_f64);
    let mut smoothed: Vec<f32> = grid_lin
        .iter()
        .map(|&f| to_lin.evaluate(f) as f32)
        .collect();

    smoothed[0] = 0.0;
    if config.preserve_edge_bins {
        smoothed[1] = ratio[1];
    }
    smoothed
}

/// Builds the linear-phase matching FIR from target and reference average
/// spectra. The result has exactly `fft_size` taps and a group delay of
/// `fft_size / 2`.
pub fn synthesize_fir(
    target_spectrum: &[f32],
    reference_spectrum: &[f32],
    config: &Config,
) -> Vec<Sample> {
    let ratio = ratio_spectrum(target_spectrum, reference_spectrum, config.min_value);
    let smoothed = smooth_ratio(&ratio, config);

    let mut fir = inverse_real_symmetric(&smoothed, config.fft_size);
    ifft_shift(&mut fir);
    let window = hann_window(config.fft_size);
    apply_window(&mut fir, &window);
    fir
}

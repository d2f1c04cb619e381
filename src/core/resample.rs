//! Sample-rate conversion to the engine's internal rate.
//!
//! Stage 0 converts arbitrary-rate inputs to the internal rate with the
//! windowed-sinc path; linear and cubic interpolation exist as fallbacks for
//! very short signals and as cheap building blocks.

use crate::core::types::Sample;

/// Linear interpolation resampling to an explicit output length.
pub fn resample_linear(input: &[Sample], output_len: usize) -> Vec<Sample> {
    if input.is_empty() || output_len == 0 {
        return vec![];
    }
    if input.len() == 1 {
        return vec![input[0]; output_len];
    }

    let ratio = (input.len() - 1) as f64 / (output_len.max(2) - 1) as f64;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;

        if idx + 1 < input.len() {
            output.push(input[idx] * (1.0 - frac) + input[idx + 1] * frac);
        } else {
            output.push(input[input.len() - 1]);
        }
    }

    output
}

/// Cubic (4-point Hermite) interpolation resampling.
pub fn resample_cubic(input: &[Sample], output_len: usize) -> Vec<Sample> {
    if input.is_empty() || output_len == 0 {
        return vec![];
    }
    if input.len() < 4 {
        return resample_linear(input, output_len);
    }

    let ratio = (input.len() - 1) as f64 / (output_len.max(2) - 1) as f64;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;

        let s0 = input[idx.saturating_sub(1)];
        let s1 = input[idx];
        let s2 = input[(idx + 1).min(input.len() - 1)];
        let s3 = input[(idx + 2).min(input.len() - 1)];

        let c0 = s1;
        let c1 = 0.5 * (s2 - s0);
        let c2 = s0 - 2.5 * s1 + 2.0 * s2 - 0.5 * s3;
        let c3 = 0.5 * (s3 - s0) + 1.5 * (s1 - s2);

        output.push(((c3 * frac + c2) * frac + c1) * frac + c0);
    }

    output
}

/// Sinc lobes used for rate conversion; 8 balances sharpness and cost.
const SINC_LOBES: usize = 8;
/// Kaiser window beta for the sinc kernel.
const KAISER_BETA: f64 = 8.0;

/// Maximum number of series terms for Bessel I0 convergence.
const BESSEL_MAX_TERMS: usize = 30;
/// Relative convergence threshold for the Bessel I0 series.
const BESSEL_CONVERGENCE: f64 = 1e-15;

/// Zeroth-order modified Bessel function of the first kind, via series
/// expansion.
#[inline]
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let x_half = x / 2.0;
    for k in 1..BESSEL_MAX_TERMS {
        term *= (x_half / k as f64) * (x_half / k as f64);
        sum += term;
        if term < BESSEL_CONVERGENCE * sum {
            break;
        }
    }
    sum
}

/// Windowed-sinc resampling to an explicit output length.
///
/// Kaiser-windowed sinc kernel; when downsampling, the kernel is widened by
/// the rate ratio to act as the anti-aliasing low-pass. Falls back to cubic
/// interpolation for inputs shorter than the kernel support.
pub fn resample_sinc(input: &[Sample], output_len: usize) -> Vec<Sample> {
    if input.is_empty() || output_len == 0 {
        return vec![];
    }
    if input.len() < 2 * SINC_LOBES {
        return resample_cubic(input, output_len);
    }

    let ratio = (input.len() - 1) as f64 / (output_len.max(2) - 1) as f64;
    // Cutoff scale: widen the kernel when decimating
    let scale = if ratio > 1.0 { 1.0 / ratio } else { 1.0 };
    let support = (SINC_LOBES as f64 / scale).ceil() as isize;
    let i0_beta = bessel_i0(KAISER_BETA);

    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let center = pos.floor() as isize;

        let mut acc = 0.0f64;
        let mut norm = 0.0f64;
        for tap in (center - support)..=(center + support) {
            if tap < 0 || tap as usize >= input.len() {
                continue;
            }
            let d = (pos - tap as f64) * scale;
            let sinc = if d.abs() < 1e-12 {
                1.0
            } else {
                let pd = std::f64::consts::PI * d;
                pd.sin() / pd
            };
            let t = d / SINC_LOBES as f64;
            if t.abs() >= 1.0 {
                continue;
            }
            let window = bessel_i0(KAISER_BETA * (1.0 - t * t).sqrt()) / i0_beta;
            let w = sinc * window;
            acc += input[tap as usize] as f64 * w;
            norm += w;
        }

        output.push(if norm.abs() > 1e-12 {
            (acc / norm) as f32
        } else {
            0.0
        });
    }

    output
}

/// Resamples a channel between sample rates with the windowed-sinc path.
pub fn resample_channel(input: &[Sample], from_rate: u32, to_rate: u32) -> Vec<Sample> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }
    let output_len =
        ((input.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize).max(1);
    resample_sinc(input, output_len)
}

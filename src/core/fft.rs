//! FFT helpers built on rustfft: block magnitude spectra, frequency-domain
//! convolution, and the symmetric inverse transform used for FIR synthesis.
//!
//! Spectra are carried in half form (`fft_size / 2 + 1` bins, DC through
//! Nyquist); Hermitian symmetry is reconstructed explicitly where a full
//! transform is needed.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::core::types::Sample;

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Number of bins in the half spectrum for a given FFT size.
#[inline]
pub fn half_bins(fft_size: usize) -> usize {
    fft_size / 2 + 1
}

/// Smallest power of two not below `n`.
#[inline]
pub fn next_power_of_two(n: usize) -> usize {
    n.next_power_of_two()
}

/// Average magnitude spectrum of a signal over non-overlapping rectangular
/// blocks of `fft_size` samples.
///
/// Trailing samples that do not fill a block are ignored. A signal shorter
/// than one block is zero-padded into a single block. Returns the half
/// spectrum. Blocks are accumulated in index order so the reduction is
/// deterministic.
pub fn block_magnitude_spectrum(signal: &[Sample], fft_size: usize) -> Vec<f32> {
    let bins = half_bins(fft_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);

    let blocks = signal.len() / fft_size;
    let mut accum = vec![0.0f64; bins];
    let mut buffer = vec![COMPLEX_ZERO; fft_size];

    if blocks == 0 {
        for (slot, &x) in buffer.iter_mut().zip(signal.iter()) {
            *slot = Complex::new(x, 0.0);
        }
        fft.process(&mut buffer);
        return buffer[..bins].iter().map(|c| c.norm()).collect();
    }

    for b in 0..blocks {
        let start = b * fft_size;
        for (slot, &x) in buffer.iter_mut().zip(signal[start..start + fft_size].iter()) {
            *slot = Complex::new(x, 0.0);
        }
        fft.process(&mut buffer);
        for (acc, c) in accum.iter_mut().zip(buffer.iter().take(bins)) {
            *acc += c.norm() as f64;
        }
    }

    let inv = 1.0 / blocks as f64;
    accum.iter().map(|&a| (a * inv) as f32).collect()
}

/// Linear convolution of `x` with `h` via the FFT, trimmed to "same"
/// alignment: the output has the length of `x` and is centered on the
/// filter, so a symmetric `h` introduces no net delay.
pub fn fconv_same(x: &[Sample], h: &[Sample]) -> Vec<Sample> {
    if x.is_empty() || h.is_empty() {
        return vec![0.0; x.len()];
    }
    let full_len = x.len() + h.len() - 1;
    let n = next_power_of_two(full_len);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut xf = vec![COMPLEX_ZERO; n];
    for (slot, &v) in xf.iter_mut().zip(x.iter()) {
        *slot = Complex::new(v, 0.0);
    }
    let mut hf = vec![COMPLEX_ZERO; n];
    for (slot, &v) in hf.iter_mut().zip(h.iter()) {
        *slot = Complex::new(v, 0.0);
    }

    fft.process(&mut xf);
    fft.process(&mut hf);
    for (a, b) in xf.iter_mut().zip(hf.iter()) {
        *a *= *b;
    }
    ifft.process(&mut xf);

    // rustfft leaves the inverse unscaled
    let scale = 1.0 / n as f32;
    let offset = (h.len() - 1) / 2;
    xf[offset..offset + x.len()]
        .iter()
        .map(|c| c.re * scale)
        .collect()
}

/// Inverse transform of a real, even half spectrum.
///
/// Mirrors `half` into the full Hermitian-symmetric spectrum (all-real bins,
/// `H[n-k] = H[k]`), runs the inverse FFT, and returns the real part scaled
/// by `1/n`. The result is the zero-phase impulse response of the spectrum.
pub fn inverse_real_symmetric(half: &[f32], fft_size: usize) -> Vec<Sample> {
    assert_eq!(half.len(), half_bins(fft_size), "half spectrum length");
    let mut full = vec![COMPLEX_ZERO; fft_size];
    for (k, &v) in half.iter().enumerate() {
        full[k] = Complex::new(v, 0.0);
    }
    for k in 1..fft_size / 2 {
        full[fft_size - k] = Complex::new(half[k], 0.0);
    }

    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut full);

    let scale = 1.0 / fft_size as f32;
    full.iter().map(|c| c.re * scale).collect()
}

/// Rotates a zero-phase impulse response so its center of symmetry moves to
/// `len/2`, producing the linear-phase form.
pub fn ifft_shift(signal: &mut Vec<Sample>) {
    let half = signal.len() / 2;
    signal.rotate_right(half);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_bins() {
        assert_eq!(half_bins(8), 5);
        assert_eq!(half_bins(4096), 2049);
    }

    #[test]
    fn test_block_spectrum_of_dc() {
        // A constant signal concentrates all energy in bin 0: |sum| = n
        let signal = vec![1.0f32; 64];
        let spectrum = block_magnitude_spectrum(&signal, 64);
        assert_eq!(spectrum.len(), 33);
        assert!((spectrum[0] - 64.0).abs() < 1e-3);
        for &bin in &spectrum[1..] {
            assert!(bin < 1e-3);
        }
    }

    #[test]
    fn test_block_spectrum_of_sine_peaks_at_bin() {
        let n = 256;
        // Exactly 8 cycles in the window -> bin 8
        let signal: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / n as f32).sin())
            .collect();
        let spectrum = block_magnitude_spectrum(&signal, n);
        let max_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(max_bin, 8);
    }

    #[test]
    fn test_block_spectrum_averages_blocks() {
        // Two identical blocks average to the single-block spectrum
        let block: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut doubled = block.clone();
        doubled.extend_from_slice(&block);
        let one = block_magnitude_spectrum(&block, 64);
        let two = block_magnitude_spectrum(&doubled, 64);
        for (a, b) in one.iter().zip(two.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_block_spectrum_zero_pads_short_signal() {
        let signal = vec![1.0f32; 10];
        let spectrum = block_magnitude_spectrum(&signal, 64);
        assert_eq!(spectrum.len(), 33);
        // DC bin holds the sum of the padded block
        assert!((spectrum[0] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_fconv_same_identity() {
        // Convolving with a centered unit impulse reproduces the input
        let x: Vec<f32> = (0..50).map(|i| (i as f32 * 0.17).sin()).collect();
        let mut h = vec![0.0f32; 9];
        h[4] = 1.0; // center of a length-9 kernel
        let y = fconv_same(&x, &h);
        assert_eq!(y.len(), x.len());
        for (a, b) in x.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fconv_same_matches_direct() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let h = vec![0.5, 1.0, 0.5];
        // direct "same" convolution, kernel centered
        let expect = [
            0.5 * 0.0 + 1.0 * 1.0 + 0.5 * 2.0,
            0.5 * 1.0 + 1.0 * 2.0 + 0.5 * 3.0,
            0.5 * 2.0 + 1.0 * 3.0 + 0.5 * 4.0,
            0.5 * 3.0 + 1.0 * 4.0 + 0.5 * 5.0,
            0.5 * 4.0 + 1.0 * 5.0 + 0.5 * 0.0,
        ];
        let y = fconv_same(&x, &h);
        for (a, b) in y.iter().zip(expect.iter()) {
            assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_inverse_real_symmetric_flat_is_impulse() {
        // A flat spectrum inverts to a unit impulse at sample 0
        let n = 64;
        let half = vec![1.0f32; half_bins(n)];
        let h = inverse_real_symmetric(&half, n);
        assert_eq!(h.len(), n);
        assert!((h[0] - 1.0).abs() < 1e-4);
        for &v in &h[1..] {
            assert!(v.abs() < 1e-4);
        }
    }

    #[test]
    fn test_inverse_is_real_and_even() {
        let n = 128;
        let half: Vec<f32> = (0..half_bins(n)).map(|k| 1.0 / (1.0 + k as f32)).collect();
        let h = inverse_real_symmetric(&half, n);
        // Even symmetry: h[k] == h[n-k]
        for k in 1..n / 2 {
            assert!((h[k] - h[n - k]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ifft_shift_centers_impulse() {
        let mut h = vec![0.0f32; 8];
        h[0] = 1.0;
        ifft_shift(&mut h);
        assert_eq!(h[4], 1.0);
        assert_eq!(h.iter().filter(|&&x| x != 0.0).count(), 1);
    }
}

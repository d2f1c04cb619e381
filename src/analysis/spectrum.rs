//! Average magnitude spectrum of a channel over its loud pieces.
//!
//! Each loud piece is split into non-overlapping rectangular blocks of
//! `fft_size` samples; block magnitudes are averaged within the piece, and
//! per-piece spectra are averaged across pieces. Both reductions run in
//! index order, so the result is bit-stable for a given input.

use crate::analysis::segment::PieceLayout;
use crate::core::fft::{block_magnitude_spectrum, half_bins};
use crate::core::types::Sample;

/// Average half spectrum (`fft_size/2 + 1` bins) of `channel` over the
/// pieces listed in `loud`.
pub fn average_spectrum(
    channel: &[Sample],
    layout: PieceLayout,
    loud: &[usize],
    fft_size: usize,
) -> Vec<f32> {
    assert!(!loud.is_empty(), "loud piece set is never empty");
    let bins = half_bins(fft_size);
    let mut accum = vec![0.0f64; bins];

    for &index in loud {
        let piece = layout.piece(channel, index);
        let spectrum = block_magnitude_spectrum(piece, fft_size);
        for (acc, &m) in accum.iter_mut().zip(spectrum.iter()) {
            *acc += m as f64;
        }
    }

    let inv = 1.0 / loud.len() as f64;
    accum.iter().map(|&a| (a * inv) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_tone_concentrates_in_its_bin() {
        let rate = 44100;
        let fft_size = 1024;
        // Pick a frequency centered on bin 32
        let freq = 32.0 * rate as f32 / fft_size as f32;
        let channel = sine(freq, rate, 8 * fft_size, 0.5);
        let layout = PieceLayout::for_length(channel.len(), 4 * fft_size);
        let loud: Vec<usize> = (0..layout.divisions).collect();

        let spectrum = average_spectrum(&channel, layout, &loud, fft_size);
        assert_eq!(spectrum.len(), half_bins(fft_size));

        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(peak_bin, 32);
    }

    #[test]
    fn test_amplitude_scales_spectrum_linearly() {
        let rate = 44100;
        let fft_size = 512;
        let quiet = sine(1000.0, rate, 4 * fft_size, 0.1);
        let loud_sig = sine(1000.0, rate, 4 * fft_size, 0.4);
        let layout = PieceLayout::for_length(quiet.len(), 2 * fft_size);
        let indices: Vec<usize> = (0..layout.divisions).collect();

        let s1 = average_spectrum(&quiet, layout, &indices, fft_size);
        let s2 = average_spectrum(&loud_sig, layout, &indices, fft_size);

        let b1: f32 = s1.iter().sum();
        let b2: f32 = s2.iter().sum();
        assert!((b2 / b1 - 4.0).abs() < 0.05, "ratio {}", b2 / b1);
    }

    #[test]
    fn test_subset_selection_changes_average() {
        // One loud piece, one quiet piece: averaging only the loud piece
        // yields a hotter spectrum than averaging both
        let fft_size = 256;
        let mut channel = sine(2000.0, 44100, 2 * fft_size, 0.5);
        for x in channel[fft_size..].iter_mut() {
            *x *= 0.1;
        }
        let layout = PieceLayout::for_length(channel.len(), fft_size);
        assert!(layout.divisions >= 2);

        let all: Vec<usize> = (0..layout.divisions).collect();
        let s_all: f32 = average_spectrum(&channel, layout, &all, fft_size)
            .iter()
            .sum();
        let s_loud: f32 = average_spectrum(&channel, layout, &[0], fft_size)
            .iter()
            .sum();
        assert!(s_loud > s_all);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let channel = sine(777.0, 44100, 4096, 0.3);
        let layout = PieceLayout::for_length(channel.len(), 2048);
        let loud: Vec<usize> = (0..layout.divisions).collect();
        let a = average_spectrum(&channel, layout, &loud, 1024);
        let b = average_spectrum(&channel, layout, &loud, 1024);
        assert_eq!(a, b);
    }
}

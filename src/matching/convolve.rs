//! Application of the matching FIRs to the Mid and Side channels.

use crate::core::dsp::ms_to_lr;
use crate::core::fft::fconv_same;
use crate::core::types::Sample;

/// Output of the frequency-matching convolution.
#[derive(Debug)]
pub struct ConvolvedSignal {
    /// Left channel after M/S recombination.
    pub left: Vec<Sample>,
    /// Right channel after M/S recombination.
    pub right: Vec<Sample>,
    /// Filtered Mid channel, kept for the correction loop.
    pub mid: Vec<Sample>,
}

/// Filters Mid with `mid_fir` and Side with `side_fir`, recombining to L/R.
///
/// Convolution uses "same" alignment: each output channel has the length of
/// its input, with the filters' `fft_size/2` group delay compensated. The
/// correction loop and finalizer consume exactly this convention.
pub fn convolve_ms(
    mid: &[Sample],
    mid_fir: &[Sample],
    side: &[Sample],
    side_fir: &[Sample],
) -> ConvolvedSignal {
    let result_mid = fconv_same(mid, mid_fir);
    let result_side = fconv_same(side, side_fir);
    let (left, right) = ms_to_lr(&result_mid, &result_side);
    ConvolvedSignal {
        left,
        right,
        mid: result_mid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dsp::lr_to_ms;

    /// A centered unit impulse of odd length behaves as an identity filter.
    fn identity_fir(len: usize) -> Vec<f32> {
        let mut fir = vec![0.0; len];
        fir[(len - 1) / 2] = 1.0;
        fir
    }

    #[test]
    fn test_identity_firs_preserve_signal() {
        let left: Vec<f32> = (0..300).map(|i| (i as f32 * 0.11).sin() * 0.4).collect();
        let right: Vec<f32> = (0..300).map(|i| (i as f32 * 0.23).cos() * 0.3).collect();
        let (mid, side) = lr_to_ms(&left, &right);

        let fir = identity_fir(65);
        let out = convolve_ms(&mid, &fir, &side, &fir);

        assert_eq!(out.left.len(), left.len());
        assert_eq!(out.right.len(), right.len());
        for i in 0..left.len() {
            assert!((out.left[i] - left[i]).abs() < 1e-4);
            assert!((out.right[i] - right[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_mid_output_matches_recombination() {
        let left: Vec<f32> = (0..200).map(|i| (i as f32 * 0.05).sin()).collect();
        let right = vec![0.0f32; 200];
        let (mid, side) = lr_to_ms(&left, &right);

        let fir = identity_fir(33);
        let out = convolve_ms(&mid, &fir, &side, &fir);

        // L = M + S must hold for the returned channels
        for i in 0..200 {
            let side_i = (out.left[i] - out.right[i]) * 0.5;
            let mid_i = (out.left[i] + out.right[i]) * 0.5;
            assert!((mid_i - out.mid[i]).abs() < 1e-5);
            let _ = side_i;
        }
    }

    #[test]
    fn test_independent_channel_gains() {
        // A 2x Mid filter with identity Side doubles M only
        let left = vec![0.5f32; 100];
        let right = vec![0.1f32; 100];
        let (mid, side) = lr_to_ms(&left, &right);

        let mut mid_fir = identity_fir(17);
        mid_fir[8] = 2.0;
        let side_fir = identity_fir(17);

        let out = convolve_ms(&mid, &mid_fir, &side, &side_fir);
        let mid_in = 0.3f32; // (0.5 + 0.1) / 2
        let side_in = 0.2f32; // (0.5 - 0.1) / 2
        // Interior samples (away from convolution edges)
        for i in 20..80 {
            assert!((out.mid[i] - 2.0 * mid_in).abs() < 1e-4);
            assert!((out.left[i] - (2.0 * mid_in + side_in)).abs() < 1e-4);
            assert!((out.right[i] - (2.0 * mid_in - side_in)).abs() < 1e-4);
        }
    }
}

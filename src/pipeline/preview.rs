//! Loudest-window excerpt extraction for preview outputs.

use crate::config::Config;
use crate::core::dsp::fade_edges;
use crate::core::types::Sample;

/// Joint RMS of a stereo window, accumulated in f64.
fn window_rms(left: &[Sample], right: &[Sample]) -> f64 {
    let n = left.len() + right.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = left
        .iter()
        .chain(right.iter())
        .map(|&x| x as f64 * x as f64)
        .sum();
    (sum / n as f64).sqrt()
}

/// Extracts the loudest excerpt of a stereo signal.
///
/// Windows of `preview.size_seconds` are scanned at
/// `preview.analysis_step_seconds` hops; the window with the highest joint
/// RMS wins and gets linear edge fades. A signal no longer than one window
/// is returned whole, without fades.
pub fn extract_preview(
    left: &[Sample],
    right: &[Sample],
    config: &Config,
) -> (Vec<Sample>, Vec<Sample>) {
    let rate = config.internal_sample_rate as f64;
    let window = (config.preview.size_seconds as f64 * rate) as usize;
    let step = ((config.preview.analysis_step_seconds as f64 * rate) as usize).max(1);
    let len = left.len().min(right.len());

    if len <= window {
        return (left[..len].to_vec(), right[..len].to_vec());
    }

    let count = (len - window) / step + 1;
    let mut best_index = 0usize;
    let mut best_rms = -1.0f64;
    for i in 0..count {
        let start = i * step;
        let r = window_rms(&left[start..start + window], &right[start..start + window]);
        if r > best_rms {
            best_rms = r;
            best_index = i;
        }
    }

    let start = best_index * step;
    let mut excerpt_left = left[start..start + window].to_vec();
    let mut excerpt_right = right[start..start + window].to_vec();

    let fade = ((config.preview.fade_seconds as f64 * rate) as usize)
        .min(window / config.preview.fade_coefficient);
    fade_edges(&mut excerpt_left, &mut excerpt_right, fade);

    (excerpt_left, excerpt_right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview_config() -> Config {
        let mut config = Config::default();
        config.preview.size_seconds = 1.0;
        config.preview.analysis_step_seconds = 0.25;
        config.preview.fade_seconds = 0.1;
        config
    }

    #[test]
    fn test_short_signal_returned_whole() {
        let config = preview_config();
        let left = vec![0.5f32; 22050];
        let right = vec![0.4f32; 22050];
        let (l, r) = extract_preview(&left, &right, &config);
        assert_eq!(l.len(), 22050);
        // No fades on a whole-signal preview
        assert_eq!(l[0], 0.5);
        assert_eq!(r[0], 0.4);
    }

    #[test]
    fn test_picks_loudest_region() {
        let config = preview_config();
        let n = 5 * 44100;
        let mut left = vec![0.01f32; n];
        let mut right = vec![0.01f32; n];
        // Loud burst in the fourth second
        for i in (3 * 44100)..(4 * 44100) {
            left[i] = 0.9;
            right[i] = 0.9;
        }
        let (l, _r) = extract_preview(&left, &right, &config);
        assert_eq!(l.len(), 44100);
        // The middle of the excerpt sits in the burst
        assert!(l[22050] > 0.5);
    }

    #[test]
    fn test_fades_applied() {
        let config = preview_config();
        let n = 5 * 44100;
        let left = vec![0.8f32; n];
        let right = vec![0.8f32; n];
        let (l, r) = extract_preview(&left, &right, &config);
        assert_eq!(l.len(), 44100);
        // Edges faded to silence, interior untouched
        assert_eq!(l[0], 0.0);
        assert_eq!(r[r.len() - 1], 0.0);
        assert_eq!(l[22050], 0.8);
    }
}

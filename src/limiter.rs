//! Hyrax: a look-ahead brickwall limiter with a multi-stage smoothed gain
//! envelope.
//!
//! The limiter guarantees that no output sample exceeds the configured
//! threshold while keeping the gain envelope smooth enough to avoid audible
//! zipper artifacts. The envelope is built in four passes over the whole
//! buffer:
//!
//! 1. a look-ahead window maximum turns per-frame peaks into the
//!    instantaneous reduction requirement, so the gain dips before a peak
//!    arrives;
//! 2. an attack/hold/release follower walks the requirement with fast
//!    descent, a hold plateau at each new minimum, and exponential release;
//! 3. a cascade of asymmetric one-pole smoothers (instant descent, smoothed
//!    ascent) removes the follower's corners;
//! 4. the envelope is re-floored at the instantaneous requirement so the
//!    smoothers can never lift the gain above what the current frame
//!    permits, then applied with a final safety clamp at the threshold.
//!
//! Look-ahead latency is compensated internally: output length equals input
//! length, and a signal already under the threshold passes through
//! untouched.

use crate::config::LimiterConfig;
use crate::core::types::Sample;
use std::collections::VecDeque;

/// Milliseconds to a sample count at the given rate, at least one sample.
#[inline]
fn ms_to_samples(ms: f32, sample_rate: u32) -> usize {
    ((sample_rate as f64 * ms as f64 * 1e-3) as usize).max(1)
}

/// Look-ahead length in samples: the configured duration rounded up to a
/// power of two.
#[inline]
fn lookahead_len(config: &LimiterConfig, sample_rate: u32) -> usize {
    ms_to_samples(config.lookahead_ms, sample_rate).next_power_of_two()
}

/// Forward sliding-window maximum: `out[i] = max(peaks[i..=min(i+window, n-1)])`.
///
/// Monotonic-deque implementation, O(n).
fn forward_window_max(peaks: &[f32], window: usize) -> Vec<f32> {
    let n = peaks.len();
    let mut out = vec![0.0f32; n];
    let mut deque: VecDeque<usize> = VecDeque::new();
    let mut next = 0usize;

    for (i, slot) in out.iter_mut().enumerate() {
        let right = (i + window).min(n - 1);
        while next <= right {
            while let Some(&back) = deque.back() {
                if peaks[back] <= peaks[next] {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(next);
            next += 1;
        }
        while let Some(&front) = deque.front() {
            if front < i {
                deque.pop_front();
            } else {
                break;
            }
        }
        *slot = peaks[*deque.front().expect("window is never empty")];
    }

    out
}

/// Attack/hold/release follower over the reduction requirement.
///
/// Per sample: when the requirement drops below the current gain the
/// follower attacks toward it; on reaching a new minimum it holds for the
/// configured duration; once the hold expires it releases toward unity.
fn follow_ahr(requirement: &[f32], config: &LimiterConfig, sample_rate: u32) -> Vec<f32> {
    let tau_attack = ms_to_samples(config.attack_ms, sample_rate) as f32;
    let tau_release = ms_to_samples(config.release_ms, sample_rate) as f32;
    let hold_samples = ms_to_samples(config.hold_ms, sample_rate);

    let mut envelope = Vec::with_capacity(requirement.len());
    let mut gain = 1.0f32;
    let mut hold_left = 0usize;

    for &req in requirement {
        if req < gain {
            // Attacking
            gain -= (gain - req) / tau_attack;
            if gain <= req {
                gain = req;
            }
            hold_left = hold_samples;
        } else if hold_left > 0 {
            // Holding at the last minimum
            hold_left -= 1;
        } else {
            // Tracking back toward unity
            gain += (1.0 - gain) / tau_release;
            if gain > 1.0 {
                gain = 1.0;
            }
        }
        envelope.push(gain);
    }

    envelope
}

/// One asymmetric smoothing stage: descent is instant, ascent follows a
/// one-pole low-pass with the given time constant.
fn smooth_stage(envelope: &mut [f32], tau_ms: f32, sample_rate: u32) {
    let tau = ms_to_samples(tau_ms, sample_rate) as f32;
    let coef = (-1.0 / tau).exp();
    let mut state = 1.0f32;
    for g in envelope.iter_mut() {
        state = if *g < state {
            *g
        } else {
            coef * state + (1.0 - coef) * *g
        };
        *g = state;
    }
}

/// Computes the gain envelope for a sequence of per-frame peaks.
///
/// Returns `None` when every peak already satisfies the threshold (the
/// limiter is not needed). The envelope never exceeds the instantaneous
/// requirement, so applying it brings every frame at or under the
/// threshold.
pub fn gain_envelope(
    peaks: &[f32],
    config: &LimiterConfig,
    sample_rate: u32,
) -> Option<Vec<f32>> {
    if peaks.is_empty() {
        return None;
    }
    let threshold = config.threshold;
    if peaks.iter().all(|&p| p <= threshold) {
        return None;
    }

    let lookahead = lookahead_len(config, sample_rate);
    let windowed = forward_window_max(peaks, lookahead);

    // Instantaneous requirement from the look-ahead window
    let requirement: Vec<f32> = windowed
        .iter()
        .map(|&p| if p > threshold { threshold / p } else { 1.0 })
        .collect();

    let mut envelope = follow_ahr(&requirement, config, sample_rate);
    for &tau_ms in &config.smoothing_stages_ms {
        smooth_stage(&mut envelope, tau_ms, sample_rate);
    }

    // The smoothers may only err downward; re-floor at the per-frame
    // requirement so the ceiling holds exactly at every frame.
    for (g, &p) in envelope.iter_mut().zip(peaks.iter()) {
        let inst = if p > threshold { threshold / p } else { 1.0 };
        if *g > inst {
            *g = inst;
        }
    }

    Some(envelope)
}

/// Limits a stereo pair in place with a shared gain envelope derived from
/// the joint per-frame peak. Returns true when the limiter engaged.
pub fn limit_stereo(
    left: &mut [Sample],
    right: &mut [Sample],
    config: &LimiterConfig,
    sample_rate: u32,
) -> bool {
    debug_assert_eq!(left.len(), right.len());
    let peaks: Vec<f32> = left
        .iter()
        .zip(right.iter())
        .map(|(&l, &r)| l.abs().max(r.abs()))
        .collect();

    let Some(envelope) = gain_envelope(&peaks, config, sample_rate) else {
        return false;
    };

    let t = config.threshold;
    for ((l, r), &g) in left.iter_mut().zip(right.iter_mut()).zip(envelope.iter()) {
        *l = (*l * g).clamp(-t, t);
        *r = (*r * g).clamp(-t, t);
    }
    true
}

/// Limits a mono channel in place. Returns true when the limiter engaged.
pub fn limit_mono(channel: &mut [Sample], config: &LimiterConfig, sample_rate: u32) -> bool {
    let peaks: Vec<f32> = channel.iter().map(|x| x.abs()).collect();

    let Some(envelope) = gain_envelope(&peaks, config, sample_rate) else {
        return false;
    };

    let t = config.threshold;
    for (x, &g) in channel.iter_mut().zip(envelope.iter()) {
        *x = (*x * g).clamp(-t, t);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dsp::peak;

    fn config() -> LimiterConfig {
        LimiterConfig::default()
    }

    fn sine(freq: f32, rate: u32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_forward_window_max() {
        let peaks = vec![1.0, 3.0, 2.0, 5.0, 4.0];
        let out = forward_window_max(&peaks, 2);
        assert_eq!(out, vec![3.0, 5.0, 5.0, 5.0, 4.0]);

        // Window 0 is the identity
        let out = forward_window_max(&peaks, 0);
        assert_eq!(out, peaks);
    }

    #[test]
    fn test_compliant_signal_untouched() {
        let cfg = config();
        let mut left = sine(440.0, 44100, 4410, 0.5);
        let mut right = sine(660.0, 44100, 4410, 0.5);
        let orig_left = left.clone();
        let orig_right = right.clone();

        let engaged = limit_stereo(&mut left, &mut right, &cfg, 44100);
        assert!(!engaged);
        assert_eq!(left, orig_left);
        assert_eq!(right, orig_right);
    }

    #[test]
    fn test_ceiling_holds_for_hot_signal() {
        let cfg = config();
        // Peaks at 1.5, well over the ~0.998 threshold
        let mut left = sine(200.0, 44100, 44100, 1.5);
        let mut right = sine(200.0, 44100, 44100, 1.5);

        let engaged = limit_stereo(&mut left, &mut right, &cfg, 44100);
        assert!(engaged);
        assert!(peak(&left) <= cfg.threshold + 1e-4);
        assert!(peak(&right) <= cfg.threshold + 1e-4);
    }

    #[test]
    fn test_single_spike_is_caught() {
        let cfg = config();
        let mut signal = sine(100.0, 44100, 22050, 0.3);
        signal[11025] = 1.4;
        signal[11026] = -1.4;

        let engaged = limit_mono(&mut signal, &cfg, 44100);
        assert!(engaged);
        assert!(peak(&signal) <= cfg.threshold + 1e-4);
    }

    #[test]
    fn test_gain_dips_before_peak() {
        let cfg = config();
        let n = 8192;
        let mut peaks = vec![0.5f32; n];
        peaks[4096] = 2.0;

        let envelope = gain_envelope(&peaks, &cfg, 44100).unwrap();
        let lookahead = lookahead_len(&cfg, 44100);
        // Reduction starts at least a look-ahead window early
        assert!(envelope[4096 - lookahead] < 1.0);
        // And holds the requirement at the peak itself
        assert!(envelope[4096] <= cfg.threshold / 2.0 + 1e-6);
    }

    #[test]
    fn test_envelope_recovers_after_peak() {
        let cfg = config();
        let n = 44100;
        let mut peaks = vec![0.1f32; n];
        peaks[1000] = 2.0;

        let envelope = gain_envelope(&peaks, &cfg, 44100).unwrap();
        // Within five release constants the gain is essentially unity again
        let recovery = 1000 + 5 * ms_to_samples(cfg.release_ms, 44100);
        assert!(
            envelope[recovery] > 0.99,
            "gain {} at sample {}",
            envelope[recovery],
            recovery
        );
        // Monotone non-decreasing through the release tail
        for w in envelope[recovery..].windows(2) {
            assert!(w[1] >= w[0] - 1e-6);
        }
    }

    #[test]
    fn test_envelope_never_exceeds_instant_requirement() {
        let cfg = config();
        let peaks: Vec<f32> = (0..4096)
            .map(|i| 0.5 + 1.0 * ((i as f32 * 0.01).sin().abs()))
            .collect();
        let envelope = gain_envelope(&peaks, &cfg, 44100).unwrap();
        for (g, &p) in envelope.iter().zip(peaks.iter()) {
            assert!(*g * p <= cfg.threshold + 1e-5);
            assert!(*g > 0.0 && *g <= 1.0);
        }
    }

    #[test]
    fn test_hold_plateau() {
        let cfg = config().with_hold_ms(5.0).with_release_ms(10.0);
        let n = 8192;
        let mut peaks = vec![0.1f32; n];
        peaks[2000] = 2.0;

        let envelope = gain_envelope(&peaks, &cfg, 44100).unwrap();
        let hold = ms_to_samples(5.0, 44100);
        // The minimum reached just after the peak is sustained through the
        // hold window instead of releasing immediately
        let at_min = envelope[2002];
        assert!(at_min < 0.95);
        assert!(envelope[2000 + hold / 2] <= at_min + 1e-3);
    }

    #[test]
    fn test_stereo_channels_share_gain() {
        let cfg = config();
        // Hot left channel forces the shared gain down on both sides
        let mut left = vec![1.5f32; 8192];
        let mut right = vec![0.5f32; 8192];
        limit_stereo(&mut left, &mut right, &cfg, 44100);

        let expected_ratio = 0.5 / 1.5;
        for i in 4000..4100 {
            let ratio = right[i] / left[i];
            assert!(
                (ratio - expected_ratio).abs() < 1e-3,
                "stereo image drifted: {}",
                ratio
            );
        }
    }

    #[test]
    fn test_lookahead_rounding() {
        let cfg = config();
        // 1 ms at 44100 is 44 samples, rounded up to 64
        assert_eq!(lookahead_len(&cfg, 44100), 64);
    }

    #[test]
    fn test_empty_signal() {
        let cfg = config();
        let mut signal: Vec<f32> = vec![];
        assert!(!limit_mono(&mut signal, &cfg, 44100));
    }
}

//! The pipeline orchestrator: stages 0-4 and the RMS correction loop.
//!
//! The orchestrator owns every intermediate buffer and hands each stage
//! exactly what it consumes; buffers die at the first stage boundary that
//! no longer needs them. Events are emitted in stage order; every failure
//! aborts the run and surfaces with its four-digit code.

pub mod check;
pub mod preview;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::analysis::levels::{analyze_levels, rms_coefficient, LevelAnalysis};
use crate::analysis::segment::{
    loud_piece_indices, matching_rms, piece_rmses, PieceLayout,
};
use crate::analysis::spectrum::average_spectrum;
use crate::cache::{fingerprint, ReferenceStats, StatsCache};
use crate::config::{Config, ResultSpec};
use crate::core::dsp::{
    amplify, clip_hard, ensure_finite, normalize_stereo, signals_equal, stereo_peak,
};
use crate::core::types::{AudioBuffer, Sample};
use crate::error::{MasterError, Side};
use crate::events::{emit, EventCode, EventSink};
use crate::limiter::{limit_mono, limit_stereo};
use crate::matching::convolve::{convolve_ms, ConvolvedSignal};
use crate::matching::fir::synthesize_fir;

/// Cooperative cancellation flag, consulted at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the pipeline aborts at the next stage
    /// boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), MasterError> {
        if self.is_cancelled() {
            Err(MasterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Which output variants a run must produce, derived from the requested
/// results so each variant is computed at most once.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputNeeds {
    pub limited: bool,
    pub no_limiter: bool,
    pub no_limiter_normalized: bool,
}

impl OutputNeeds {
    pub fn from_results(results: &[ResultSpec]) -> Self {
        Self {
            limited: results.iter().any(|r| r.use_limiter),
            no_limiter: results.iter().any(|r| !r.use_limiter && !r.normalize),
            no_limiter_normalized: results.iter().any(|r| !r.use_limiter && r.normalize),
        }
    }

    /// Everything, for buffer-level callers who want all variants.
    pub fn all() -> Self {
        Self {
            limited: true,
            no_limiter: true,
            no_limiter_normalized: true,
        }
    }
}

/// Finished output variants plus run diagnostics.
#[derive(Debug)]
pub struct MasterOutput {
    /// Brickwall-limited result, scaled by the final amplitude coefficient.
    pub limited: Option<(Vec<Sample>, Vec<Sample>)>,
    /// Raw EQ- and level-matched result.
    pub no_limiter: Option<(Vec<Sample>, Vec<Sample>)>,
    /// Peak-normalized variant of the raw result.
    pub no_limiter_normalized: Option<(Vec<Sample>, Vec<Sample>)>,
    /// Stage-1 RMS matching coefficient (diagnostic).
    pub rms_coefficient: f32,
    /// Reference pre-normalization coefficient applied to limited output.
    pub final_amp_coef: f32,
}

impl MasterOutput {
    /// The variant a result spec consumes.
    pub fn variant_for(&self, spec: &ResultSpec) -> Option<&(Vec<Sample>, Vec<Sample>)> {
        if spec.use_limiter {
            self.limited.as_ref()
        } else if spec.normalize {
            self.no_limiter_normalized.as_ref()
        } else {
            self.no_limiter.as_ref()
        }
    }
}

/// The coefficient the reference pre-normalization must be undone by.
fn final_amp_coefficient(peak: f32, config: &Config) -> f32 {
    if peak < config.limiter.threshold {
        config.min_value.max(peak / config.limiter.threshold)
    } else {
        1.0
    }
}

/// Analyzes a reference from scratch: pre-normalize, segment, select loud
/// pieces, and average both channel spectra.
fn compute_reference_stats(
    mut left: Vec<Sample>,
    mut right: Vec<Sample>,
    config: &Config,
) -> ReferenceStats {
    let peak = stereo_peak(&left, &right);
    normalize_stereo(
        &mut left,
        &mut right,
        config.limiter.threshold,
        config.min_value,
        false,
    );

    let levels = analyze_levels(&left, &right, config.max_piece_size());
    drop(left);
    drop(right);

    let spectrum_mid = average_spectrum(
        &levels.mid,
        levels.layout,
        &levels.loud_pieces,
        config.fft_size,
    );
    let spectrum_side = average_spectrum(
        &levels.side,
        levels.layout,
        &levels.loud_pieces,
        config.fft_size,
    );

    ReferenceStats {
        matching_rms_mid: levels.matching_rms_mid,
        matching_rms_side: levels.matching_rms_side,
        spectrum_mid,
        spectrum_side,
        peak,
        sample_count: levels.mid.len(),
        sample_rate: config.internal_sample_rate,
        fft_size: config.fft_size,
        piece_size: levels.layout.piece_size,
    }
}

/// Obtains reference statistics, consulting the cache when configured.
fn analyze_reference(
    left: Vec<Sample>,
    right: Vec<Sample>,
    config: &Config,
    cache: Option<&StatsCache>,
) -> Result<(ReferenceStats, f32), MasterError> {
    if let Some(cache) = cache {
        let key = fingerprint(&left, &right, config);
        if let Some(stats) = cache.load(&key, config)? {
            let coef = final_amp_coefficient(stats.peak, config);
            return Ok((stats, coef));
        }
        let stats = compute_reference_stats(left, right, config);
        // Persist failures must not fail the run; the cache is advisory
        let _ = cache.store(&key, &stats);
        let coef = final_amp_coefficient(stats.peak, config);
        return Ok((stats, coef));
    }

    let stats = compute_reference_stats(left, right, config);
    let coef = final_amp_coefficient(stats.peak, config);
    Ok((stats, coef))
}

/// One correction measurement: matching coefficient of a candidate Mid
/// signal against the reference matching RMS.
fn correction_coefficient(
    candidate_mid: &[Sample],
    layout: PieceLayout,
    reference_matching_rms: f32,
    config: &Config,
) -> f32 {
    let rmses = piece_rmses(candidate_mid, layout);
    let (loud, _) = loud_piece_indices(&rmses);
    let candidate_rms = matching_rms(&rmses, &loud);
    rms_coefficient(candidate_rms, reference_matching_rms, config.min_value).0
}

/// Stage 3: iterative peak-compensated RMS correction.
///
/// K-1 rounds simulate limiting with a hard clip at unity; the terminal
/// round measures through the real limiter. Termination is by iteration
/// count.
fn correct_levels(
    conv: ConvolvedSignal,
    layout: PieceLayout,
    reference_matching_rms: f32,
    config: &Config,
) -> (Vec<Sample>, Vec<Sample>) {
    let ConvolvedSignal {
        mut left,
        mut right,
        mid: mut result_mid,
    } = conv;

    let steps = config.rms_correction_steps;
    if steps == 0 {
        return (left, right);
    }

    for _ in 1..steps {
        let mut clipped = result_mid.clone();
        clip_hard(&mut clipped, 1.0);
        let coef = correction_coefficient(&clipped, layout, reference_matching_rms, config);
        amplify(&mut left, coef);
        amplify(&mut right, coef);
        amplify(&mut result_mid, coef);
    }

    let mut limited = result_mid;
    limit_mono(&mut limited, &config.limiter, config.internal_sample_rate);
    let coef = correction_coefficient(&limited, layout, reference_matching_rms, config);
    amplify(&mut left, coef);
    amplify(&mut right, coef);

    (left, right)
}

/// Stage 4: produce the requested output variants.
fn finalize(
    left: Vec<Sample>,
    right: Vec<Sample>,
    final_amp_coef: f32,
    needs: OutputNeeds,
    config: &Config,
) -> MasterOutput {
    let mut output = MasterOutput {
        limited: None,
        no_limiter: None,
        no_limiter_normalized: None,
        rms_coefficient: 1.0,
        final_amp_coef,
    };

    if needs.no_limiter_normalized {
        let mut l = left.clone();
        let mut r = right.clone();
        normalize_stereo(
            &mut l,
            &mut r,
            config.limiter.threshold,
            config.min_value,
            true,
        );
        output.no_limiter_normalized = Some((l, r));
    }

    if needs.limited {
        let mut l = left.clone();
        let mut r = right.clone();
        limit_stereo(&mut l, &mut r, &config.limiter, config.internal_sample_rate);
        if final_amp_coef != 1.0 {
            amplify(&mut l, final_amp_coef);
            amplify(&mut r, final_amp_coef);
        }
        output.limited = Some((l, r));
    }

    if needs.no_limiter {
        output.no_limiter = Some((left, right));
    }

    output
}

/// Runs stages 0-4 on decoded buffers.
///
/// The `Loading` event (2003) is emitted by the callers that actually load;
/// this entry starts with validation and ends after finalization. Saving is
/// likewise the caller's concern.
pub fn run(
    target: AudioBuffer,
    reference: AudioBuffer,
    needs: OutputNeeds,
    config: &Config,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> Result<MasterOutput, MasterError> {
    config.validate()?;
    cancel.check()?;

    // Stage 0: validation and conversion to the internal rate
    let (target_left, target_right) = check::check_stream(target, Side::Target, config, sink)?;
    let (reference_left, reference_right) =
        check::check_stream(reference, Side::Reference, config, sink)?;

    if !config.allow_equality
        && signals_equal(&target_left, &target_right, &reference_left, &reference_right)
    {
        return Err(MasterError::TargetEqualsReference);
    }
    cancel.check()?;

    // Stage 1: level matching (includes reference pre-normalization)
    emit(sink, EventCode::MatchingLevels);
    let cache = config.reference_cache_folder.as_ref().map(StatsCache::new);
    let (reference_stats, final_amp_coef) =
        analyze_reference(reference_left, reference_right, config, cache.as_ref())?;

    let LevelAnalysis {
        mut mid,
        mut side,
        layout,
        loud_pieces,
        matching_rms_mid: target_matching_rms,
        ..
    } = analyze_levels(&target_left, &target_right, config.max_piece_size());
    drop(target_left);
    drop(target_right);

    let (coefficient, clamped) = rms_coefficient(
        target_matching_rms,
        reference_stats.matching_rms_mid,
        config.min_value,
    );
    if clamped {
        emit(sink, EventCode::TargetNearSilent);
    }
    amplify(&mut mid, coefficient);
    amplify(&mut side, coefficient);
    cancel.check()?;

    // Stage 2: frequency matching
    emit(sink, EventCode::MatchingFrequencies);
    let target_spectrum_mid = average_spectrum(&mid, layout, &loud_pieces, config.fft_size);
    let target_spectrum_side = average_spectrum(&side, layout, &loud_pieces, config.fft_size);

    let mid_fir = synthesize_fir(&target_spectrum_mid, &reference_stats.spectrum_mid, config);
    let side_fir = synthesize_fir(&target_spectrum_side, &reference_stats.spectrum_side, config);

    let convolved = convolve_ms(&mid, &mid_fir, &side, &side_fir);
    drop(mid);
    drop(side);
    ensure_finite(&convolved.left, "frequency-matched left channel")?;
    ensure_finite(&convolved.right, "frequency-matched right channel")?;
    cancel.check()?;

    // Stage 3: RMS correction against post-limiting loudness
    emit(sink, EventCode::CorrectingLevels);
    let (left, right) = correct_levels(
        convolved,
        layout,
        reference_stats.matching_rms_mid,
        config,
    );
    cancel.check()?;

    // Stage 4: output variants
    emit(sink, EventCode::Finalizing);
    let mut output = finalize(left, right, final_amp_coef, needs, config);
    output.rms_coefficient = coefficient;
    Ok(output)
}

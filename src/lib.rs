#![forbid(unsafe_code)]
//! Reference-matching audio mastering engine.
//!
//! `refmaster` takes a TARGET (the mix to be mastered) and a REFERENCE (a
//! finished track whose sonic character should be imitated) and produces a
//! mastered TARGET whose loudness, spectral balance, peak level, and stereo
//! width statistically match the REFERENCE. The pipeline runs entirely at a
//! fixed internal sample rate and treats the Mid and Side channels as
//! independent signals with separately derived gains and FIR filters.
//!
//! Processing stages:
//!
//! 1. load, validate, and resample both inputs;
//! 2. match loudness via the RMS statistics of the loudest analysis pieces;
//! 3. match spectra with smoothed linear-phase FIRs applied per M/S channel;
//! 4. iteratively re-correct loudness for the gain the limiter will take;
//! 5. brickwall-limit and write the requested output variants.
//!
//! # Quick start
//!
//! ```no_run
//! use refmaster::{process, Config, ResultSpec};
//! use refmaster::events::NullSink;
//!
//! process(
//!     "my_mix.wav",
//!     "reference_track.wav",
//!     &[ResultSpec::pcm16("my_mix_mastered.wav")],
//!     &Config::default(),
//!     &NullSink,
//! )
//! .expect("mastering failed");
//! ```
//!
//! In-memory callers can use [`process_buffers`] and receive the output
//! variants directly; progress arrives through the [`events::EventSink`]
//! passed in, as stage-ordered `(code, level, message)` events.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod io;
pub mod limiter;
pub mod matching;
pub mod pipeline;

pub use crate::config::{BitDepth, Config, LimiterConfig, ResultSpec, LIMITED_MAXIMUM_POINT};
pub use crate::core::types::{AudioBuffer, Channels, Sample};
pub use crate::error::MasterError;
pub use crate::pipeline::{CancelToken, MasterOutput, OutputNeeds};

use std::path::Path;

use error::Side;
use events::{emit, emit_error, EventCode, EventSink};
use io::{Loader, Saver, WavLoader, WavSaver};

/// Rewrites a loader error so it names the stream it came from.
fn tag_load_error(err: MasterError, side: Side) -> MasterError {
    match err {
        MasterError::TooManyChannels { channels, .. } => {
            MasterError::TooManyChannels { side, channels }
        }
        other => MasterError::Loading {
            side,
            detail: other.to_string(),
        },
    }
}

/// Masters `target` against `reference` and writes every requested result.
///
/// Uses the built-in WAV loader and saver; see [`process_with_io`] to
/// inject other codecs and [`process_buffers`] for in-memory use. Events
/// are delivered to `sink` in stage order; on failure the terminal 4xxx
/// event is emitted and the same error is returned.
pub fn process(
    target: impl AsRef<Path>,
    reference: impl AsRef<Path>,
    results: &[ResultSpec],
    config: &Config,
    sink: &dyn EventSink,
) -> Result<(), MasterError> {
    process_with_io(
        &WavLoader,
        &WavSaver,
        target.as_ref(),
        reference.as_ref(),
        results,
        config,
        sink,
        &CancelToken::new(),
    )
}

/// [`process`] with injected loader/saver and a cancellation token.
#[allow(clippy::too_many_arguments)]
pub fn process_with_io(
    loader: &dyn Loader,
    saver: &dyn Saver,
    target: &Path,
    reference: &Path,
    results: &[ResultSpec],
    config: &Config,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> Result<(), MasterError> {
    let outcome = run_and_save(
        loader, saver, target, reference, results, config, sink, cancel,
    );
    if let Err(err) = &outcome {
        emit_error(sink, err);
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
fn run_and_save(
    loader: &dyn Loader,
    saver: &dyn Saver,
    target: &Path,
    reference: &Path,
    results: &[ResultSpec],
    config: &Config,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> Result<(), MasterError> {
    if results.is_empty() {
        return Err(MasterError::InvalidConfig(
            "the result list is empty".to_string(),
        ));
    }
    config.validate()?;

    emit(sink, EventCode::Loading);
    let target_buffer = loader
        .load(target)
        .map_err(|e| tag_load_error(e, Side::Target))?;
    let reference_buffer = loader
        .load(reference)
        .map_err(|e| tag_load_error(e, Side::Reference))?;

    let needs = OutputNeeds::from_results(results);
    let output = pipeline::run(target_buffer, reference_buffer, needs, config, sink, cancel)?;

    emit(sink, EventCode::Exporting);
    if results.iter().any(|r| r.preview) {
        emit(sink, EventCode::MakingPreviews);
    }
    for spec in results {
        let (left, right) = output
            .variant_for(spec)
            .ok_or_else(|| MasterError::Internal("missing output variant".to_string()))?;

        let buffer = if spec.preview {
            let (l, r) = pipeline::preview::extract_preview(left, right, config);
            AudioBuffer::from_stereo_channels(&l, &r, config.internal_sample_rate)
        } else {
            AudioBuffer::from_stereo_channels(left, right, config.internal_sample_rate)
        };
        saver.save(&spec.path, &buffer, spec.bit_depth)?;
    }

    emit(sink, EventCode::Completed);
    Ok(())
}

/// Masters decoded buffers and returns the output variants in memory.
///
/// All three variants are produced. Emits the same stage events as
/// [`process`], minus exporting.
pub fn process_buffers(
    target: AudioBuffer,
    reference: AudioBuffer,
    config: &Config,
    sink: &dyn EventSink,
) -> Result<MasterOutput, MasterError> {
    let outcome = (|| {
        config.validate()?;
        emit(sink, EventCode::Loading);
        pipeline::run(
            target,
            reference,
            OutputNeeds::all(),
            config,
            sink,
            &CancelToken::new(),
        )
    })();
    match outcome {
        Ok(output) => {
            emit(sink, EventCode::Completed);
            Ok(output)
        }
        Err(err) => {
            emit_error(sink, &err);
            Err(err)
        }
    }
}

//! Stage-0 stream validation: length bounds, channel layout, sample-rate
//! conversion, and the clipped/limited-source census.

use crate::config::Config;
use crate::core::dsp::{count_max_peaks, is_close};
use crate::core::resample::resample_channel;
use crate::core::types::{AudioBuffer, Channels, Sample};
use crate::error::{MasterError, Side};
use crate::events::{emit, EventCode, EventSink};

/// Validates one input stream and brings it to the internal rate as a
/// deinterleaved stereo pair.
pub fn check_stream(
    buffer: AudioBuffer,
    side: Side,
    config: &Config,
    sink: &dyn EventSink,
) -> Result<(Vec<Sample>, Vec<Sample>), MasterError> {
    let frames = buffer.num_frames();
    let native_rate = buffer.sample_rate;
    if native_rate == 0 {
        return Err(MasterError::Loading {
            side,
            detail: "stream reports a zero sample rate".to_string(),
        });
    }

    // Length bounds are checked at the native rate, scaled so they mean the
    // same duration as at the internal rate.
    let scale = native_rate as f64 / config.internal_sample_rate as f64;
    let max_len = (config.max_length_samples() as f64 * scale) as usize;
    let min_len = (config.min_length_samples() as f64 * scale) as usize;
    if frames > max_len {
        return Err(MasterError::TooLong {
            side,
            samples: frames,
            maximum: max_len,
        });
    }
    if frames < min_len {
        return Err(MasterError::TooShort {
            side,
            samples: frames,
            minimum: min_len,
        });
    }

    if buffer.channels == Channels::Mono {
        emit(
            sink,
            match side {
                Side::Target => EventCode::TargetIsMono,
                Side::Reference => EventCode::ReferenceIsMono,
            },
        );
    }
    let (mut left, mut right) = buffer.split_stereo();

    if native_rate != config.internal_sample_rate {
        left = resample_channel(&left, native_rate, config.internal_sample_rate);
        right = resample_channel(&right, native_rate, config.internal_sample_rate);
        emit(
            sink,
            match side {
                Side::Target => EventCode::TargetResampled,
                Side::Reference => EventCode::ReferenceResampled,
            },
        );
    }

    if side == Side::Target {
        census_clipping(&left, &right, config, sink);
    }

    // Rounding in the conversion must not take us under one FFT window
    if left.len() < config.min_length_samples() {
        return Err(MasterError::TooShort {
            side,
            samples: left.len(),
            minimum: config.min_length_samples(),
        });
    }

    Ok((left, right))
}

/// Flags sources that were already clipped or brickwall-limited before they
/// reached us: many samples parked exactly at the global peak.
fn census_clipping(left: &[Sample], right: &[Sample], config: &Config, sink: &dyn EventSink) {
    let (max_value, max_count) = count_max_peaks(left, right);
    if max_count > config.clipping_samples_threshold {
        if is_close(max_value, 1.0) {
            emit(sink, EventCode::TargetClipping);
        } else if max_count > config.limited_samples_threshold {
            emit(sink, EventCode::TargetLimited);
        }
    }
}

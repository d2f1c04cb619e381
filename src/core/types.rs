//! Core types: samples, channel layouts, and the interleaved I/O buffer.
//!
//! Inside the pipeline audio travels as separate `Vec<Sample>` channels
//! (Mid/Side most of the time); [`AudioBuffer`] exists at the I/O boundary
//! where loaders and savers speak interleaved frames.

/// A single audio sample (32-bit float, nominal range -1.0 to 1.0).
pub type Sample = f32;

/// Number of audio channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Returns the number of channels as a usize.
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// An audio buffer holding interleaved sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved sample data.
    pub data: Vec<Sample>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: Channels,
}

impl AudioBuffer {
    /// Creates a new audio buffer.
    pub fn new(data: Vec<Sample>, sample_rate: u32, channels: Channels) -> Self {
        Self {
            data,
            sample_rate,
            channels,
        }
    }

    /// Creates a mono buffer.
    pub fn from_mono(data: Vec<Sample>, sample_rate: u32) -> Self {
        Self::new(data, sample_rate, Channels::Mono)
    }

    /// Interleaves left/right channels into a stereo buffer.
    ///
    /// The shorter channel decides the frame count.
    pub fn from_stereo_channels(left: &[Sample], right: &[Sample], sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        let mut data = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            data.push(left[i]);
            data.push(right[i]);
        }
        Self::new(data, sample_rate, Channels::Stereo)
    }

    /// Returns the number of frames (samples per channel).
    #[inline]
    pub fn num_frames(&self) -> usize {
        if self.data.is_empty() {
            return 0;
        }
        self.data.len() / self.channels.count()
    }

    /// Returns the duration in seconds.
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Extracts a single channel from interleaved data.
    pub fn channel(&self, ch: usize) -> Vec<Sample> {
        let nc = self.channels.count();
        assert!(ch < nc, "channel index out of range");
        self.data.iter().skip(ch).step_by(nc).copied().collect()
    }

    /// Splits a buffer into deinterleaved (left, right) channels.
    ///
    /// Mono buffers are promoted by duplicating the single channel.
    pub fn split_stereo(&self) -> (Vec<Sample>, Vec<Sample>) {
        match self.channels {
            Channels::Mono => {
                let ch = self.data.clone();
                (ch.clone(), ch)
            }
            Channels::Stereo => (self.channel(0), self.channel(1)),
        }
    }
}

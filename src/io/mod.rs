//! Audio I/O boundary: the Loader and Saver contracts plus the built-in
//! WAV implementations.
//!
//! The pipeline core performs no file I/O of its own. Decoding and encoding
//! are injected through these traits so callers can plug in other container
//! formats; the crate ships WAV implementations as the defaults.

pub mod wav;

use std::path::Path;

use crate::config::BitDepth;
use crate::core::types::AudioBuffer;
use crate::error::MasterError;

/// Decodes an audio file into PCM at its native sample rate.
pub trait Loader {
    fn load(&self, path: &Path) -> Result<AudioBuffer, MasterError>;
}

/// Encodes PCM into an audio file.
pub trait Saver {
    fn save(
        &self,
        path: &Path,
        buffer: &AudioBuffer,
        bit_depth: BitDepth,
    ) -> Result<(), MasterError>;
}

/// The built-in WAV loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavLoader;

impl Loader for WavLoader {
    fn load(&self, path: &Path) -> Result<AudioBuffer, MasterError> {
        wav::read_wav_file(path)
    }
}

/// The built-in WAV saver.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavSaver;

impl Saver for WavSaver {
    fn save(
        &self,
        path: &Path,
        buffer: &AudioBuffer,
        bit_depth: BitDepth,
    ) -> Result<(), MasterError> {
        wav::write_wav_file(path, buffer, bit_depth)
    }
}

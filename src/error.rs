//! Error types for the refmaster crate.
//!
//! Every failure surfaces as a [`MasterError`] carrying the engine's frozen
//! four-digit code (4xxx). Numerical soft failures are not errors; they are
//! clamped locally and reported through the event sink as 3xxx warnings.

use std::fmt;

/// Which input stream an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Target,
    Reference,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Target => write!(f, "TARGET"),
            Side::Reference => write!(f, "REFERENCE"),
        }
    }
}

/// Errors that can abort the mastering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum MasterError {
    /// The stream could not be loaded or decoded.
    Loading { side: Side, detail: String },
    /// The stream exceeds the configured maximum length.
    TooLong { side: Side, samples: usize, maximum: usize },
    /// The stream is shorter than one FFT window.
    TooShort { side: Side, samples: usize, minimum: usize },
    /// The stream has more than two channels.
    TooManyChannels { side: Side, channels: usize },
    /// TARGET and REFERENCE are the same audio.
    TargetEqualsReference,
    /// A configuration value failed validation.
    InvalidConfig(String),
    /// An internal invariant was violated (corrupt cache bundle,
    /// non-finite intermediate buffer).
    Internal(String),
    /// The caller cancelled processing at a stage boundary.
    Cancelled,
    /// I/O failure outside of stream decoding (saving, cache persist).
    Io(String),
}

impl MasterError {
    /// The frozen four-digit code for this error.
    ///
    /// Code 4203 (cancelled) extends the frozen table; see DESIGN.md.
    pub fn code(&self) -> u16 {
        match self {
            MasterError::Loading { side: Side::Target, .. } => 4001,
            MasterError::TooLong { side: Side::Target, .. } => 4002,
            MasterError::TooShort { side: Side::Target, .. } => 4003,
            MasterError::TooManyChannels { side: Side::Target, .. } => 4004,
            MasterError::TargetEqualsReference => 4005,
            MasterError::Loading { side: Side::Reference, .. } => 4101,
            MasterError::TooLong { side: Side::Reference, .. } => 4102,
            MasterError::TooShort { side: Side::Reference, .. } => 4103,
            MasterError::TooManyChannels { side: Side::Reference, .. } => 4104,
            MasterError::Io(_) => 4201,
            MasterError::InvalidConfig(_) => 4202,
            MasterError::Internal(_) => 4202,
            MasterError::Cancelled => 4203,
        }
    }
}

impl fmt::Display for MasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterError::Loading { side, detail } => {
                write!(f, "{} stream error: {}", side, detail)
            }
            MasterError::TooLong { side, samples, maximum } => write!(
                f,
                "{} is too long: {} samples, maximum {}",
                side, samples, maximum
            ),
            MasterError::TooShort { side, samples, minimum } => write!(
                f,
                "{} is too short: {} samples, at least one FFT window ({}) required",
                side, samples, minimum
            ),
            MasterError::TooManyChannels { side, channels } => write!(
                f,
                "{} has {} channels, only mono and stereo are supported",
                side, channels
            ),
            MasterError::TargetEqualsReference => {
                write!(f, "TARGET and REFERENCE are the same audio")
            }
            MasterError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            MasterError::Internal(msg) => write!(f, "internal validation failed: {}", msg),
            MasterError::Cancelled => write!(f, "processing was cancelled"),
            MasterError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for MasterError {}

impl From<std::io::Error> for MasterError {
    fn from(err: std::io::Error) -> Self {
        MasterError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_table() {
        let too_short = MasterError::TooShort {
            side: Side::Target,
            samples: 100,
            minimum: 4096,
        };
        assert_eq!(too_short.code(), 4003);

        let ref_short = MasterError::TooShort {
            side: Side::Reference,
            samples: 100,
            minimum: 4096,
        };
        assert_eq!(ref_short.code(), 4103);

        assert_eq!(MasterError::TargetEqualsReference.code(), 4005);
        assert_eq!(MasterError::Internal("x".into()).code(), 4202);
        assert_eq!(MasterError::Cancelled.code(), 4203);
    }

    #[test]
    fn test_display_names_side() {
        let err = MasterError::TooManyChannels {
            side: Side::Reference,
            channels: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("REFERENCE"));
        assert!(msg.contains('6'));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MasterError = io.into();
        assert_eq!(err.code(), 4201);
    }
}

//! Segmentation of a channel into analysis pieces and selection of the
//! loud subset.
//!
//! Analysis statistics are computed over "loud pieces" only, so quiet
//! intros and outros do not drag the matching RMS down. The admission
//! threshold is the RMS of the per-piece RMSes (not their mean); the
//! loudest piece always meets it, so the loud set is never empty.

use crate::core::dsp::rms;
use crate::core::types::Sample;

/// Piece layout of a channel: `divisions` contiguous pieces of
/// `piece_size` samples each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceLayout {
    /// Samples per piece.
    pub piece_size: usize,
    /// Number of pieces.
    pub divisions: usize,
}

impl PieceLayout {
    /// Splits `len` samples into pieces no longer than `max_piece_size`.
    ///
    /// The piece count is `len / max_piece_size + 1` and the piece length
    /// shrinks to fit, so a channel of exactly one FFT window still yields
    /// one piece. Samples beyond `piece_size * divisions` are excluded from
    /// analysis.
    pub fn for_length(len: usize, max_piece_size: usize) -> Self {
        assert!(len > 0, "cannot segment an empty channel");
        assert!(max_piece_size > 0, "piece size must be positive");
        let divisions = len / max_piece_size + 1;
        let piece_size = len / divisions;
        Self {
            piece_size,
            divisions,
        }
    }

    /// Samples covered by the analysis pieces.
    #[inline]
    pub fn analyzed_len(&self) -> usize {
        self.piece_size * self.divisions
    }

    /// Boundaries `(start, end)` of piece `index`.
    #[inline]
    pub fn bounds(&self, index: usize) -> (usize, usize) {
        let start = index * self.piece_size;
        (start, start + self.piece_size)
    }

    /// The slice of `channel` covered by piece `index`.
    #[inline]
    pub fn piece<'a>(&self, channel: &'a [Sample], index: usize) -> &'a [Sample] {
        let (start, end) = self.bounds(index);
        &channel[start..end]
    }
}

/// Per-piece RMS values of a channel under a layout.
pub fn piece_rmses(channel: &[Sample], layout: PieceLayout) -> Vec<f32> {
    (0..layout.divisions)
        .map(|i| rms(layout.piece(channel, i)))
        .collect()
}

/// Indices of the loud pieces and the admission threshold.
///
/// The threshold is the RMS of the piece RMSes; a piece is loud when its
/// RMS is `>=` the threshold (ties admitted). The returned set is never
/// empty.
pub fn loud_piece_indices(rmses: &[f32]) -> (Vec<usize>, f32) {
    let threshold = rms(rmses);
    let loud: Vec<usize> = rmses
        .iter()
        .enumerate()
        .filter(|(_, &r)| r >= threshold)
        .map(|(i, _)| i)
        .collect();
    debug_assert!(!loud.is_empty(), "threshold cannot exceed the maximum");
    (loud, threshold)
}

/// Matching RMS: the RMS of the RMSes of the selected pieces.
pub fn matching_rms(rmses: &[f32], loud: &[usize]) -> f32 {
    let selected: Vec<f32> = loud.iter().map(|&i| rmses[i]).collect();
    rms(&selected)
}

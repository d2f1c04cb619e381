//! Level analysis: Mid/Side decomposition, loud-piece statistics, and the
//! RMS matching coefficient.

use crate::analysis::segment::{loud_piece_indices, matching_rms, piece_rmses, PieceLayout};
use crate::core::dsp::lr_to_ms;
use crate::core::types::Sample;

/// Level statistics of one stereo signal.
///
/// Owns the Mid and Side channels so downstream stages can consume them
/// without re-deriving the decomposition. Loud pieces are selected on the
/// Mid channel; the same index set addresses Side pieces.
#[derive(Debug)]
pub struct LevelAnalysis {
    /// Mid channel.
    pub mid: Vec<Sample>,
    /// Side channel.
    pub side: Vec<Sample>,
    /// Piece layout shared by both channels.
    pub layout: PieceLayout,
    /// Indices of the loud pieces (selected on Mid).
    pub loud_pieces: Vec<usize>,
    /// Matching RMS of the Mid channel over the loud pieces.
    pub matching_rms_mid: f32,
    /// Matching RMS of the Side channel over the same piece set.
    pub matching_rms_side: f32,
}

/// Analyzes a stereo signal's levels.
pub fn analyze_levels(left: &[Sample], right: &[Sample], max_piece_size: usize) -> LevelAnalysis {
    let (mid, side) = lr_to_ms(left, right);
    let layout = PieceLayout::for_length(mid.len(), max_piece_size);

    let mid_rmses = piece_rmses(&mid, layout);
    let (loud_pieces, _threshold) = loud_piece_indices(&mid_rmses);
    let matching_rms_mid = matching_rms(&mid_rmses, &loud_pieces);

    let side_rmses = piece_rmses(&side, layout);
    let matching_rms_side = matching_rms(&side_rmses, &loud_pieces);

    LevelAnalysis {
        mid,
        side,
        layout,
        loud_pieces,
        matching_rms_mid,
        matching_rms_side,
    }
}

/// Gain that brings a signal's matching RMS to the reference's:
/// `reference / max(epsilon, own)`.
///
/// Returns the coefficient and whether the epsilon clamp engaged (the
/// caller emits a warning event when it did).
pub fn rms_coefficient(own_matching_rms: f32, reference_matching_rms: f32, epsilon: f32) -> (f32, bool) {
    let clamped = own_matching_rms < epsilon;
    let denom = if clamped { epsilon } else { own_matching_rms };
    (reference_matching_rms / denom, clamped)
}

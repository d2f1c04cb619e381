//! Signal analysis: segmentation, level statistics, and average spectra.

pub mod levels;
pub mod segment;
pub mod spectrum;

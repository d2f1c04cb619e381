//! Reference statistics cache.
//!
//! Analyzing a REFERENCE (segmentation, loud-piece selection, two average
//! spectra) is the most expensive part of a run that does not depend on the
//! TARGET. The cache persists that analysis keyed by a fingerprint of the
//! decoded PCM and every parameter that shapes the result, so mastering
//! many tracks against the same reference pays the cost once.
//!
//! Entries are JSON files in a content-addressed directory. The cache is
//! advisory: a missing entry is an ordinary miss and the directory is safe
//! to delete wholesale. A present-but-corrupt entry, however, violates an
//! internal invariant and fails the run.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::core::fft::half_bins;
use crate::core::types::Sample;
use crate::error::MasterError;

/// Cached analysis of one reference, taken after pre-normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    /// Matching RMS of the Mid channel over the loud pieces.
    pub matching_rms_mid: f32,
    /// Matching RMS of the Side channel over the same piece set.
    pub matching_rms_side: f32,
    /// Average Mid half spectrum over the loud pieces.
    pub spectrum_mid: Vec<f32>,
    /// Average Side half spectrum over the loud pieces.
    pub spectrum_side: Vec<f32>,
    /// Peak absolute value before pre-normalization.
    pub peak: f32,
    /// Reference length in frames at the internal rate.
    pub sample_count: usize,
    /// Internal sample rate the analysis ran at.
    pub sample_rate: u32,
    /// FFT size the spectra were computed with.
    pub fft_size: usize,
    /// Piece size the segmentation used.
    pub piece_size: usize,
}

impl ReferenceStats {
    /// Checks the bundle against the config it claims to match.
    fn is_consistent_with(&self, config: &Config) -> bool {
        let bins = half_bins(config.fft_size);
        self.sample_rate == config.internal_sample_rate
            && self.fft_size == config.fft_size
            && self.spectrum_mid.len() == bins
            && self.spectrum_side.len() == bins
            && self.matching_rms_mid.is_finite()
            && self.matching_rms_side.is_finite()
            && self.peak.is_finite()
            && self.spectrum_mid.iter().all(|v| v.is_finite())
            && self.spectrum_side.iter().all(|v| v.is_finite())
    }
}

/// Content fingerprint of a reference under a parameter set.
///
/// SHA-256 over the interleaved f32 little-endian PCM followed by every
/// parameter that changes the analysis. Any parameter change yields a new
/// key, which is how stale entries are invalidated.
pub fn fingerprint(left: &[Sample], right: &[Sample], config: &Config) -> String {
    let mut hasher = Sha256::new();
    let frames = left.len().min(right.len());
    for i in 0..frames {
        hasher.update(left[i].to_le_bytes());
        hasher.update(right[i].to_le_bytes());
    }
    hasher.update(config.internal_sample_rate.to_le_bytes());
    hasher.update((config.fft_size as u64).to_le_bytes());
    hasher.update(config.piece_size_seconds.to_le_bytes());
    hasher.update(config.loess_span.to_le_bytes());
    hasher.update((config.lin_log_oversampling as u64).to_le_bytes());

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// A content-addressed directory of reference statistics bundles.
#[derive(Debug, Clone)]
pub struct StatsCache {
    dir: PathBuf,
}

impl StatsCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint))
    }

    /// Looks up a bundle.
    ///
    /// `Ok(None)` on a miss; an entry that exists but cannot be parsed or
    /// does not match the config is a fatal internal error.
    pub fn load(
        &self,
        fingerprint: &str,
        config: &Config,
    ) -> Result<Option<ReferenceStats>, MasterError> {
        let path = self.entry_path(fingerprint);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MasterError::Internal(format!(
                    "cache entry {} is unreadable: {}",
                    path.display(),
                    e
                )))
            }
        };

        let stats: ReferenceStats = serde_json::from_str(&data).map_err(|e| {
            MasterError::Internal(format!(
                "cache entry {} is corrupt: {}",
                path.display(),
                e
            ))
        })?;

        if !stats.is_consistent_with(config) {
            return Err(MasterError::Internal(format!(
                "cache entry {} does not match the active configuration",
                path.display()
            )));
        }

        Ok(Some(stats))
    }

    /// Persists a bundle with write-to-temp-then-rename, so concurrent
    /// writers of the same fingerprint cannot leave a torn entry.
    pub fn store(&self, fingerprint: &str, stats: &ReferenceStats) -> Result<(), MasterError> {
        std::fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string(stats).map_err(|e| {
            MasterError::Internal(format!("failed to serialize cache bundle: {}", e))
        })?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let temp = self.dir.join(format!(
            ".{}.tmp-{}-{}",
            fingerprint,
            std::process::id(),
            nanos
        ));

        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, self.entry_path(fingerprint))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats(config: &Config) -> ReferenceStats {
        let bins = half_bins(config.fft_size);
        ReferenceStats {
            matching_rms_mid: 0.25,
            matching_rms_side: 0.05,
            spectrum_mid: vec![1.0; bins],
            spectrum_side: vec![0.5; bins],
            peak: 0.9,
            sample_count: 100_000,
            sample_rate: config.internal_sample_rate,
            fft_size: config.fft_size,
            piece_size: 44_100,
        }
    }

    fn small_config() -> Config {
        Config::default().with_fft_size(1024)
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let config = small_config();
        let left = vec![0.1f32; 512];
        let right = vec![-0.1f32; 512];

        let a = fingerprint(&left, &right, &config);
        let b = fingerprint(&left, &right, &config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut changed = left.clone();
        changed[10] = 0.2;
        assert_ne!(a, fingerprint(&changed, &right, &config));
    }

    #[test]
    fn test_fingerprint_changes_with_parameters() {
        let left = vec![0.1f32; 256];
        let right = vec![0.1f32; 256];
        let base = fingerprint(&left, &right, &small_config());

        let other = small_config().with_fft_size(2048);
        assert_ne!(base, fingerprint(&left, &right, &other));

        let other = small_config().with_loess_span(0.1);
        assert_ne!(base, fingerprint(&left, &right, &other));

        let other = small_config().with_piece_size_seconds(10.0);
        assert_ne!(base, fingerprint(&left, &right, &other));
    }

    #[test]
    fn test_store_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config();
        let cache = StatsCache::new(dir.path());
        let stats = sample_stats(&config);

        assert!(cache.load("abc123", &config).unwrap().is_none());
        cache.store("abc123", &stats).unwrap();
        let loaded = cache.load("abc123", &config).unwrap().unwrap();
        assert_eq!(loaded, stats);
    }

    #[test]
    fn test_corrupt_entry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config();
        let cache = StatsCache::new(dir.path());

        std::fs::write(dir.path().join("deadbeef.json"), b"not json at all").unwrap();
        let err = cache.load("deadbeef", &config).unwrap_err();
        assert_eq!(err.code(), 4202);
    }

    #[test]
    fn test_mismatched_entry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config();
        let cache = StatsCache::new(dir.path());

        // Written under a different fft_size than it claims
        let mut stats = sample_stats(&config);
        stats.spectrum_mid.truncate(10);
        cache.store("feed", &stats).unwrap();
        assert!(cache.load("feed", &config).is_err());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config();
        let cache = StatsCache::new(dir.path());
        cache.store("aa", &sample_stats(&config)).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["aa.json".to_string()]);
    }
}

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::errors::{SentinelError, SentinelResult};

/// Streaming SHA-256 of a file, hex encoded.
pub fn sha256_file(path: &Path) -> SentinelResult<String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| SentinelError::io(e, path.to_path_buf()))?;
    let mut hasher = Sha256::new();

    // Process in chunks to avoid loading the whole dataset twice
    const CHUNK_SIZE: usize = 8192;
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| SentinelError::io(e, path.to_path_buf()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// First `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Fewer than two values yield 0.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Percentile with linear interpolation between closest ranks.
/// `q` is in [0, 100]. Empty input yields 0.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sha256_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        let digest = sha256_file(file.path()).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_statistics() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_std(&[5.0]), 0.0);
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((std - 2.138).abs() < 1e-3);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-9);
    }
}

//! Content hash parsing and file verification.
//!
//! Manifests carry hex digests without naming the algorithm, so the
//! algorithm is inferred from the digest length: 32 hex digits for MD5,
//! 40 for SHA-1 and 64 for SHA-256.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{ManagerError, ManagerResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithm of a [`ContentHash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(Self::Md5),
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

/// An expected file digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    hex: String,
}

impl ContentHash {
    /// Parse a hex digest, inferring its algorithm from the length.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidHash`] if the string is not hex or has
    /// an unrecognised length.
    pub fn parse(s: &str) -> ManagerResult<Self> {
        let hex = s.trim().to_ascii_lowercase();
        let algorithm = HashAlgorithm::from_hex_len(hex.len())
            .filter(|_| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| ManagerError::InvalidHash(s.to_string()))?;
        Ok(Self { algorithm, hex })
    }

    /// Parse a manifest hash field, where an empty string means "unknown".
    pub fn parse_optional(s: &str) -> ManagerResult<Option<Self>> {
        if s.trim().is_empty() {
            Ok(None)
        } else {
            Self::parse(s).map(Some)
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Lowercase hex digest.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

fn digest_file<D: Digest>(path: &Path) -> ManagerResult<String> {
    let mut file = File::open(path).map_err(|e| ManagerError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ManagerError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Calculate the lowercase hex digest of a file.
pub fn calculate_file_checksum(path: &Path, algorithm: HashAlgorithm) -> ManagerResult<String> {
    match algorithm {
        HashAlgorithm::Md5 => digest_file::<Md5>(path),
        HashAlgorithm::Sha1 => digest_file::<Sha1>(path),
        HashAlgorithm::Sha256 => digest_file::<Sha256>(path),
    }
}

/// Verify that a file matches an expected digest.
///
/// # Errors
///
/// Returns [`ManagerError::ChecksumMismatch`] if the digests differ, or a
/// read error if the file cannot be read.
pub fn verify_checksum(path: &Path, expected: &ContentHash) -> ManagerResult<()> {
    let actual = calculate_file_checksum(path, expected.algorithm())?;
    if actual != expected.as_hex() {
        return Err(ManagerError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Check whether an existing file already has the expected content.
pub fn matches_checksum(path: &Path, expected: &ContentHash) -> bool {
    path.is_file() && verify_checksum(path, expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn hello_file(temp: &TempDir) -> std::path::PathBuf {
        let file_path = temp.path().join("test.txt");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();
        file_path
    }

    #[test]
    fn test_parse_infers_algorithm() {
        assert_eq!(
            ContentHash::parse(HELLO_MD5).unwrap().algorithm(),
            HashAlgorithm::Md5
        );
        assert_eq!(
            ContentHash::parse(HELLO_SHA1).unwrap().algorithm(),
            HashAlgorithm::Sha1
        );
        assert_eq!(
            ContentHash::parse(HELLO_SHA256).unwrap().algorithm(),
            HashAlgorithm::Sha256
        );
    }

    #[test]
    fn test_parse_normalizes_case() {
        let hash = ContentHash::parse(&HELLO_MD5.to_uppercase()).unwrap();
        assert_eq!(hash.as_hex(), HELLO_MD5);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ContentHash::parse("h1").is_err());
        assert!(ContentHash::parse(&"z".repeat(32)).is_err());
    }

    #[test]
    fn test_parse_optional_empty() {
        assert_eq!(ContentHash::parse_optional("").unwrap(), None);
        assert!(ContentHash::parse_optional(HELLO_MD5).unwrap().is_some());
    }

    #[test]
    fn test_calculate_each_algorithm() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);

        assert_eq!(
            calculate_file_checksum(&path, HashAlgorithm::Md5).unwrap(),
            HELLO_MD5
        );
        assert_eq!(
            calculate_file_checksum(&path, HashAlgorithm::Sha1).unwrap(),
            HELLO_SHA1
        );
        assert_eq!(
            calculate_file_checksum(&path, HashAlgorithm::Sha256).unwrap(),
            HELLO_SHA256
        );
    }

    #[test]
    fn test_calculate_nonexistent_file() {
        let result = calculate_file_checksum(Path::new("/nonexistent/file.txt"), HashAlgorithm::Md5);
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        let wrong = ContentHash::parse(&"0".repeat(32)).unwrap();

        match verify_checksum(&path, &wrong) {
            Err(ManagerError::ChecksumMismatch { filename, actual, .. }) => {
                assert_eq!(filename, "test.txt");
                assert_eq!(actual, HELLO_MD5);
            }
            other => panic!("Expected ChecksumMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_matches_checksum() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);

        assert!(matches_checksum(&path, &ContentHash::parse(HELLO_SHA256).unwrap()));
        assert!(!matches_checksum(
            &temp.path().join("missing"),
            &ContentHash::parse(HELLO_SHA256).unwrap()
        ));
    }

    #[test]
    fn test_large_file_checksum() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");

        // Larger than the read buffer
        let mut file = File::create(&file_path).unwrap();
        file.write_all(&vec![0xABu8; 100_000]).unwrap();

        let first = calculate_file_checksum(&file_path, HashAlgorithm::Sha1).unwrap();
        let second = calculate_file_checksum(&file_path, HashAlgorithm::Sha1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 40);
    }
}

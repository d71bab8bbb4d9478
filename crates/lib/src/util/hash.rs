//! Hashing utilities for artifact verification and fingerprints.
//!
//! This module provides:
//! - `HashAlgorithm`: the digest used for distributable artifact hashes
//! - `ContentHash`: a lowercase hexadecimal digest
//! - `hash_file()`: streaming single file hashing
//! - `hash_bytes()`: arbitrary byte hashing

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Digest algorithm used to hash built artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
  #[default]
  Sha256,
  Sha512,
}

impl HashAlgorithm {
  pub fn as_str(self) -> &'static str {
    match self {
      HashAlgorithm::Sha256 => "sha256",
      HashAlgorithm::Sha512 => "sha512",
    }
  }

  /// Length of the hex-encoded digest.
  pub fn hex_len(self) -> usize {
    match self {
      HashAlgorithm::Sha256 => 64,
      HashAlgorithm::Sha512 => 128,
    }
  }
}

impl fmt::Display for HashAlgorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for HashAlgorithm {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "sha256" => Ok(HashAlgorithm::Sha256),
      "sha512" => Ok(HashAlgorithm::Sha512),
      other => Err(format!("unknown hash algorithm '{}' (expected sha256 or sha512)", other)),
    }
  }
}

/// A hex-encoded content digest.
///
/// # Format
///
/// Lowercase hexadecimal, 64 characters for SHA-256 and 128 for SHA-512.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for ContentHash {
  fn from(value: &str) -> Self {
    ContentHash(value.to_string())
  }
}

/// Error while hashing a file.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {path}: {source}")]
pub struct HashError {
  pub path: String,
  #[source]
  pub source: std::io::Error,
}

/// Incremental hasher over either supported algorithm.
enum Hasher {
  Sha256(Sha256),
  Sha512(Sha512),
}

impl Hasher {
  fn new(algorithm: HashAlgorithm) -> Self {
    match algorithm {
      HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
      HashAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
    }
  }

  fn update(&mut self, data: &[u8]) {
    match self {
      Hasher::Sha256(h) => h.update(data),
      Hasher::Sha512(h) => h.update(data),
    }
  }

  fn finish(self) -> ContentHash {
    let digest = match self {
      Hasher::Sha256(h) => hex::encode(h.finalize()),
      Hasher::Sha512(h) => hex::encode(h.finalize()),
    };
    ContentHash(digest)
  }
}

/// Hash a file's contents, returning the digest and the byte size.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<(ContentHash, u64), HashError> {
  let read_err = |source| HashError {
    path: path.display().to_string(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Hasher::new(algorithm);
  let mut buffer = [0u8; 8192];
  let mut size = 0u64;

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    size += bytes_read as u64;
    hasher.update(&buffer[..bytes_read]);
  }

  Ok((hasher.finish(), size))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> ContentHash {
  let mut hasher = Hasher::new(algorithm);
  hasher.update(data);
  hasher.finish()
}

/// Hash a sequence of newline-terminated parts with SHA-256.
///
/// Used for digests that never leave the build machine (fingerprints, source
/// set hashes), so the algorithm is fixed regardless of build parameters.
pub fn hash_parts<I, S>(parts: I) -> ContentHash
where
  I: IntoIterator<Item = S>,
  S: AsRef<[u8]>,
{
  let mut hasher = Sha256::new();
  for part in parts {
    hasher.update(part.as_ref());
    hasher.update(b"\n");
  }
  ContentHash(hex::encode(hasher.finalize()))
}

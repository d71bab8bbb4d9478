//! Optional encryption of built artifacts.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::compile::BuildOutput;
use crate::util::fs::write_atomic;
use crate::util::hash::{HashAlgorithm, hash_bytes};

#[derive(Debug, Error)]
pub enum EncryptError {
  #[error("failed to encrypt '{artifact}': {message}")]
  Failed { artifact: String, message: String },

  #[error("io error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Transforms artifact bytes before distribution.
pub trait Encryptor {
  /// `Ok(None)` leaves the artifact untouched.
  fn encrypt(&self, artifact: &str, bytes: &[u8]) -> Result<Option<Vec<u8>>, EncryptError>;
}

impl<T: Encryptor + ?Sized> Encryptor for &T {
  fn encrypt(&self, artifact: &str, bytes: &[u8]) -> Result<Option<Vec<u8>>, EncryptError> {
    (**self).encrypt(artifact, bytes)
  }
}

/// Passes every artifact through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEncryption;

impl Encryptor for NoEncryption {
  fn encrypt(&self, _artifact: &str, _bytes: &[u8]) -> Result<Option<Vec<u8>>, EncryptError> {
    Ok(None)
  }
}

/// Run `encryptor` over every rebuilt artifact and refresh the digests of the
/// files it rewrote. Returns the number of rewritten files.
pub fn encrypt_outputs(
  encryptor: &dyn Encryptor,
  output: &mut BuildOutput,
  algorithm: HashAlgorithm,
) -> Result<usize, EncryptError> {
  let mut rewritten = 0;

  for (name, digest) in output.artifacts.iter_mut() {
    let bytes = fs::read(&digest.path).map_err(|e| EncryptError::Io {
      path: digest.path.clone(),
      source: e,
    })?;

    let Some(encrypted) = encryptor.encrypt(name, &bytes)? else {
      continue;
    };

    write_atomic(&digest.path, &encrypted).map_err(|e| EncryptError::Io {
      path: digest.path.clone(),
      source: e,
    })?;
    digest.hash = hash_bytes(&encrypted, algorithm);
    digest.size = encrypted.len() as u64;
    rewritten += 1;

    debug!(artifact = %name, hash = %digest.hash, "encrypted artifact");
  }

  if rewritten > 0 {
    info!(artifacts = rewritten, "encrypted artifacts");
  }
  Ok(rewritten)
}

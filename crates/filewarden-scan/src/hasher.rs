//! Streaming content hashing.
//!
//! Files are read through a fixed-size buffer into an incremental digest,
//! so memory use does not grow with file size. The file handle lives only
//! inside [`ContentHasher::hash_file`] and is closed on every return path.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use blake3::Hasher as Blake3;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::trace;

use filewarden_core::{ContentHash, DEFAULT_BUFFER_SIZE, HashAlgorithm, WardenConfig, WardenError};

use crate::pool::run_in_pool;

/// Incremental digest state for one file.
enum Accumulator {
    Sha256(Sha256),
    Blake3(Box<Blake3>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(Blake3::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(chunk),
            Self::Blake3(hasher) => {
                hasher.update(chunk);
            }
        }
    }

    fn finalize(self) -> ContentHash {
        match self {
            Self::Sha256(hasher) => {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&hasher.finalize());
                ContentHash::new(bytes)
            }
            Self::Blake3(hasher) => ContentHash::new(*hasher.finalize().as_bytes()),
        }
    }
}

/// Computes content digests of regular files.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
    threads: usize,
}

impl ContentHasher {
    /// Create a hasher with the default buffer size.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            buffer_size: DEFAULT_BUFFER_SIZE,
            threads: 0,
        }
    }

    /// Create a hasher from run configuration.
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            buffer_size: config.buffer_size.max(1),
            threads: config.threads,
        }
    }

    /// Digest used by this hasher.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a regular file.
    ///
    /// Directories, symlinks, special files and missing paths fail with
    /// [`WardenError::NotAFile`]; other metadata failures surface as I/O
    /// errors.
    pub fn hash_file(&self, path: &Path) -> Result<ContentHash, WardenError> {
        let is_file = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata.file_type().is_file(),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                false
            }
            Err(e) => return Err(WardenError::io(path, e)),
        };
        if !is_file {
            return Err(WardenError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let mut file = File::open(path).map_err(|e| WardenError::io(path, e))?;
        let hash = self
            .hash_reader(&mut file)
            .map_err(|e| WardenError::io(path, e))?;
        trace!(path = %path.display(), %hash, "hashed file");
        Ok(hash)
    }

    /// Hash everything readable from `reader`.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> io::Result<ContentHash> {
        let mut accumulator = Accumulator::new(self.algorithm);
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            accumulator.update(&buffer[..bytes_read]);
        }

        Ok(accumulator.finalize())
    }

    /// Hash an in-memory byte slice.
    pub fn hash_bytes(&self, bytes: &[u8]) -> ContentHash {
        let mut accumulator = Accumulator::new(self.algorithm);
        accumulator.update(bytes);
        accumulator.finalize()
    }

    /// Hash many files in parallel. Results are in input order; the first
    /// failure aborts the batch.
    pub fn hash_files(&self, paths: &[PathBuf]) -> Result<Vec<ContentHash>, WardenError> {
        run_in_pool(self.threads, || {
            paths
                .par_iter()
                .map(|path| self.hash_file(path))
                .collect::<Result<Vec<_>, _>>()
        })?
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

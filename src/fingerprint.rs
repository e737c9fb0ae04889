use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use blake3::Hasher;

use crate::error::{IngestError, Result};

const BLOCK_SIZE: usize = 8192;

/// BLAKE3 digest of a file's full contents.
///
/// Two files with equal fingerprints are treated as the same photo, whatever
/// they are called and wherever they live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Stream a file through BLAKE3 in fixed-size blocks.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let wrap = |source| IngestError::Fingerprint {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::open(path).map_err(wrap)?;

    let mut hasher = Hasher::new();
    let mut buffer = vec![0; BLOCK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(wrap)?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

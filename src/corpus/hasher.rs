//! Content hashing and chunk identity

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hex length of the path prefix in chunk ids
const PATH_DIGEST_LEN: usize = 16;

/// SHA-256 of raw bytes, lowercase hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Streaming SHA-256 of a file's bytes; equal to `hash_bytes(&fs::read(path)?)`
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Deterministic chunk id: `<16 hex of sha256(path)>_<index>`
pub fn chunk_id(relative_path: &str, index: usize) -> String {
    let digest = hash_bytes(relative_path.as_bytes());
    format!("{}_{}", &digest[..PATH_DIGEST_LEN], index)
}

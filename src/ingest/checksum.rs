//! MD5 sidecar generation.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use md5::{Digest, Md5};

const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex MD5 of a file, read in chunks.
pub fn md5_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    md5_reader(BufReader::with_capacity(CHUNK_SIZE, file))
}

/// Lowercase hex MD5 of everything `reader` yields.
pub fn md5_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Md5::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase hex MD5 of in-memory bytes.
pub fn md5_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Write the digest alone, no file name and no trailing newline.
pub fn write_sidecar(path: &Path, digest: &str) -> io::Result<()> {
    fs::write(path, digest)
}

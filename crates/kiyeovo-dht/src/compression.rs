//! Gzip framing for the bucket payloads (spec §6: "group offline =
//! gzip-compressed JSON"; §4.3's put algorithm gzips the direct store too).

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("gzip i/o error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, CompressionError>;

pub fn compress(plain: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plain)?;
    Ok(encoder.finish()?)
}

pub fn decompress(gzipped: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(gzipped);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

//! Binary frame decoding.
//!
//! The exchange sends every server frame as a gzip-compressed binary
//! message. Decoding happens here, at the transport edge, so the rest of
//! the client only ever sees plain JSON bytes.

use crate::error::{WsError, WsResult};
use flate2::read::GzDecoder;
use std::io::Read;

/// Maximum decompressed frame size (16 MiB).
pub const MAX_DECOMPRESSED_FRAME_BYTES: u64 = 16 << 20;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decoder for the exchange's gzip framing.
///
/// Payloads without the gzip magic header are passed through unchanged.
#[derive(Debug, Clone)]
pub struct GzipDecoder {
    max_bytes: u64,
}

impl GzipDecoder {
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_DECOMPRESSED_FRAME_BYTES,
        }
    }

    pub fn with_limit(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Default for GzipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipDecoder {
    /// Decompress one binary payload into frame bytes.
    pub fn decode(&self, payload: Vec<u8>) -> WsResult<Vec<u8>> {
        if !payload.starts_with(&GZIP_MAGIC) {
            return Ok(payload);
        }

        let mut out = Vec::with_capacity(payload.len() * 4);
        // Read one byte past the limit to detect oversized frames.
        GzDecoder::new(payload.as_slice())
            .take(self.max_bytes + 1)
            .read_to_end(&mut out)
            .map_err(|e| WsError::Decode(format!("gzip: {e}")))?;

        if out.len() as u64 > self.max_bytes {
            return Err(WsError::Decode(format!(
                "decompressed frame exceeds {} bytes",
                self.max_bytes
            )));
        }

        Ok(out)
    }
}

/// Gzip-compress a frame the way the exchange does. Used by tests and mock servers.
pub fn gzip(frame: &[u8]) -> WsResult<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(frame)?;
    Ok(encoder.finish()?)
}

use crate::compression::BlockCompressor;
use crate::format::COMPRESSION_NONE;

/// Stores frame payloads verbatim.
pub struct PassThroughCompressor;

impl BlockCompressor for PassThroughCompressor {
    fn id(&self) -> u8 {
        COMPRESSION_NONE
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress(&self, compressed: &[u8], _raw_len: usize) -> anyhow::Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }
}

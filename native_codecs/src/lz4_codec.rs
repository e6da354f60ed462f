use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::compression::BlockCompressor;
use crate::format::COMPRESSION_LZ4;

/// LZ4 frame compression. Cheapest to decode of the bundled methods.
pub struct Lz4Compressor;

impl BlockCompressor for Lz4Compressor {
    fn id(&self) -> u8 {
        COMPRESSION_LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    fn decompress(&self, compressed: &[u8], _raw_len: usize) -> anyhow::Result<Vec<u8>> {
        let raw = decompress_size_prepended(compressed)
            .map_err(|e| anyhow::anyhow!("lz4 decompress error: {}", e))?;
        Ok(raw)
    }
}

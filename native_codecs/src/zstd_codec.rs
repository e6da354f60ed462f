use crate::compression::BlockCompressor;
use crate::format::COMPRESSION_ZSTD;

/// Zstandard frame compression.
///
/// The level only matters when writing; any level decodes with the default
/// instance returned by `compressor_by_id`.
pub struct ZstdCompressor {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl BlockCompressor for ZstdCompressor {
    fn id(&self) -> u8 {
        COMPRESSION_ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        let compressed = zstd::bulk::compress(raw, self.level)?;
        Ok(compressed)
    }

    fn decompress(&self, compressed: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>> {
        let raw = zstd::bulk::decompress(compressed, raw_len)?;
        Ok(raw)
    }
}

use native_core::CompressionMethod;

use crate::format::{COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_ZSTD};
use crate::{Lz4Compressor, PassThroughCompressor, ZstdCompressor};

/// Per-frame payload compression.
///
/// Each frame is compressed on its own and records the compressor `id()`
/// in its header, so a reader can decode frames written with any method.
pub trait BlockCompressor: Send + Sync {
    /// Stable id stored in every frame header.
    fn id(&self) -> u8;

    fn name(&self) -> &'static str;

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// `raw_len` is the uncompressed size recorded in the frame header.
    fn decompress(&self, compressed: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>>;
}

/// Resolve a compressor from the id stored in a frame header.
pub fn compressor_by_id(id: u8) -> anyhow::Result<Box<dyn BlockCompressor>> {
    match id {
        COMPRESSION_NONE => Ok(Box::new(PassThroughCompressor)),
        COMPRESSION_ZSTD => Ok(Box::new(ZstdCompressor::default())),
        COMPRESSION_LZ4 => Ok(Box::new(Lz4Compressor)),
        _ => anyhow::bail!("unknown compression id {}; supported: 0 (none), 1 (zstd), 2 (lz4)", id),
    }
}

pub fn compressor_for(method: CompressionMethod) -> Box<dyn BlockCompressor> {
    match method {
        CompressionMethod::None => Box::new(PassThroughCompressor),
        CompressionMethod::Zstd { level } => Box::new(ZstdCompressor::new(level)),
        CompressionMethod::Lz4 => Box::new(Lz4Compressor),
    }
}

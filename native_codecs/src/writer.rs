use std::io::Write;

use log::trace;
use xxhash_rust::xxh3::xxh3_64;

use native_core::{Block, BlockOutputStream, CompressionMethod, ProgressValues};

use crate::compression::{compressor_for, BlockCompressor};
use crate::encoding::encode_block;
use crate::format::{prefix_bytes, suffix_bytes, FrameHeader, FrameKind};

/// Streaming writer for the Native framing.
///
/// # Stream layout written per session
/// ```text
/// [PREFIX: magic + version]
/// [DATA frame]*                  ← one per `write()`
/// [TOTALS frame] [EXTREMES frame] ← buffered, emitted by `write_suffix()`
/// [SUFFIX frame]
/// [DATA frame]?                  ← optional trailer written after the suffix
/// ```
///
/// Every data-carrying frame is compressed independently and checksummed
/// with xxhash3-64 over the compressed payload.
pub struct NativeBlockOutputStream<W> {
    out: W,
    compressor: Box<dyn BlockCompressor>,
    totals: Option<Block>,
    extremes: Option<Block>,
    rows_before_limit: Option<u64>,
    /// Progress delivered to this codec when the adapter forwards it.
    progress: ProgressValues,
    bytes_written: u64,
    frames_written: u64,
}

impl<W: Write> NativeBlockOutputStream<W> {
    pub fn new(out: W) -> Self {
        Self::with_compression(out, CompressionMethod::None)
    }

    pub fn with_compression(out: W, method: CompressionMethod) -> Self {
        Self {
            out,
            compressor: compressor_for(method),
            totals: None,
            extremes: None,
            rows_before_limit: None,
            progress: ProgressValues::default(),
            bytes_written: 0,
            frames_written: 0,
        }
    }

    fn write_frame(&mut self, kind: FrameKind, block: &Block) -> anyhow::Result<()> {
        let mut raw = Vec::with_capacity(block.byte_size() + 64);
        encode_block(block, &mut raw);
        let payload = self.compressor.compress(&raw)?;

        let header = FrameHeader {
            kind,
            compression: self.compressor.id(),
            raw_len: u32::try_from(raw.len())
                .map_err(|_| anyhow::anyhow!("encoded block of {} bytes exceeds frame limit", raw.len()))?,
            payload_len: u32::try_from(payload.len())
                .map_err(|_| anyhow::anyhow!("compressed block of {} bytes exceeds frame limit", payload.len()))?,
            checksum: xxh3_64(&payload),
        };

        self.out.write_all(&header.to_bytes())?;
        self.out.write_all(&payload)?;
        self.bytes_written += (header.to_bytes().len() + payload.len()) as u64;
        self.frames_written += 1;
        trace!(
            "{:?} frame: {} rows, {} raw bytes, {} on the wire ({})",
            kind,
            block.rows(),
            raw.len(),
            payload.len(),
            self.compressor.name()
        );
        Ok(())
    }

    /// Bytes written so far, framing included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Progress forwarded by an adapter that is not keeping statistics.
    pub fn progress(&self) -> ProgressValues {
        self.progress
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> anyhow::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write + Send> BlockOutputStream for NativeBlockOutputStream<W> {
    fn write_prefix(&mut self) -> anyhow::Result<()> {
        let prefix = prefix_bytes();
        self.out.write_all(&prefix)?;
        self.bytes_written += prefix.len() as u64;
        Ok(())
    }

    fn write(&mut self, block: &Block) -> anyhow::Result<()> {
        self.write_frame(FrameKind::Data, block)
    }

    fn set_totals(&mut self, block: Block) -> anyhow::Result<()> {
        self.totals = Some(block);
        Ok(())
    }

    fn set_extremes(&mut self, block: Block) -> anyhow::Result<()> {
        self.extremes = Some(block);
        Ok(())
    }

    fn write_suffix(&mut self) -> anyhow::Result<()> {
        if let Some(totals) = self.totals.take() {
            self.write_frame(FrameKind::Totals, &totals)?;
        }
        if let Some(extremes) = self.extremes.take() {
            self.write_frame(FrameKind::Extremes, &extremes)?;
        }
        let suffix = suffix_bytes(self.rows_before_limit);
        self.out.write_all(&suffix)?;
        self.bytes_written += suffix.len() as u64;
        self.out.flush()?;
        Ok(())
    }

    fn set_rows_before_limit(&mut self, rows: u64) {
        self.rows_before_limit = Some(rows);
    }

    fn on_progress(&mut self, progress: &ProgressValues) {
        self.progress.read_rows += progress.read_rows;
        self.progress.read_bytes += progress.read_bytes;
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

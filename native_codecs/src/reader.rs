use std::io::{self, Read};

use anyhow::Context;
use log::trace;
use xxhash_rust::xxh3::xxh3_64;

use native_core::{Block, BlockInputStream};

use crate::compression::compressor_by_id;
use crate::encoding::decode_block;
use crate::format::{
    check_prefix, parse_suffix_body, FrameHeader, FrameKind, FRAME_HEADER_SIZE, PREFIX_SIZE,
    SUFFIX_BODY_SIZE, TAG_SUFFIX,
};

/// Streaming reader for the Native framing written by
/// [`NativeBlockOutputStream`](crate::NativeBlockOutputStream).
///
/// # Read sequence
/// 1. `read_prefix` checks magic and version. An input that is already at
///    its end is accepted as an empty session.
/// 2. `read` returns data frames; totals and extremes frames are captured on
///    the way and exposed through the accessors.
/// 3. The suffix frame (or a clean end of input) makes `read` return `None`.
///    A later `read` continues after the suffix, which is where a
///    statistics trailer sits.
///
/// Frames are read byte-exact from `R`; wrap unbuffered sources in a
/// `BufReader`.
pub struct NativeBlockInputStream<R> {
    input: R,
    prefix_read: bool,
    suffix_seen: bool,
    /// Input ended before any prefix byte.
    empty_input: bool,
    totals: Option<Block>,
    extremes: Option<Block>,
    rows_before_limit: Option<u64>,
    frames_read: u64,
}

impl<R: Read> NativeBlockInputStream<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            prefix_read: false,
            suffix_seen: false,
            empty_input: false,
            totals: None,
            extremes: None,
            rows_before_limit: None,
            frames_read: 0,
        }
    }

    /// One byte, or `None` at a clean end of input.
    fn read_tag(&mut self) -> anyhow::Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.input.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(b[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_frame(&mut self, tag: u8) -> anyhow::Result<(FrameKind, Block)> {
        let mut header_buf = [0u8; FRAME_HEADER_SIZE];
        header_buf[0] = tag;
        self.input
            .read_exact(&mut header_buf[1..])
            .context("truncated frame header")?;
        let header = FrameHeader::from_bytes(&header_buf)?;

        let mut payload = vec![0u8; header.payload_len as usize];
        self.input
            .read_exact(&mut payload)
            .context("truncated frame payload")?;

        let computed = xxh3_64(&payload);
        if computed != header.checksum {
            anyhow::bail!(
                "frame {} checksum mismatch: expected {:016x}, got {:016x}",
                self.frames_read,
                header.checksum,
                computed
            );
        }

        let compressor = compressor_by_id(header.compression)?;
        let raw = compressor.decompress(&payload, header.raw_len as usize)?;
        if raw.len() != header.raw_len as usize {
            anyhow::bail!(
                "frame {} decompressed to {} bytes but header says {}",
                self.frames_read,
                raw.len(),
                header.raw_len
            );
        }

        let block = decode_block(&raw).with_context(|| format!("decoding frame {}", self.frames_read))?;
        self.frames_read += 1;
        trace!("{:?} frame: {} rows", header.kind, block.rows());
        Ok((header.kind, block))
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn get_ref(&self) -> &R {
        &self.input
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

impl<R: Read + Send> BlockInputStream for NativeBlockInputStream<R> {
    fn read_prefix(&mut self) -> anyhow::Result<()> {
        let Some(first) = self.read_tag()? else {
            self.empty_input = true;
            self.prefix_read = true;
            return Ok(());
        };
        let mut buf = [0u8; PREFIX_SIZE];
        buf[0] = first;
        self.input
            .read_exact(&mut buf[1..])
            .context("truncated Native prefix")?;
        check_prefix(&buf)?;
        self.prefix_read = true;
        Ok(())
    }

    fn read(&mut self) -> anyhow::Result<Option<Block>> {
        if !self.prefix_read {
            anyhow::bail!("read called before read_prefix");
        }
        if self.empty_input {
            return Ok(None);
        }
        loop {
            let Some(tag) = self.read_tag()? else {
                return Ok(None);
            };
            if tag == TAG_SUFFIX {
                let mut body = [0u8; SUFFIX_BODY_SIZE];
                self.input
                    .read_exact(&mut body)
                    .context("truncated suffix frame")?;
                self.rows_before_limit = parse_suffix_body(&body)?;
                self.suffix_seen = true;
                return Ok(None);
            }
            match self.read_frame(tag)? {
                (FrameKind::Data, block) => return Ok(Some(block)),
                (FrameKind::Totals, block) => self.totals = Some(block),
                (FrameKind::Extremes, block) => self.extremes = Some(block),
            }
        }
    }

    fn read_suffix(&mut self) -> anyhow::Result<()> {
        if !self.suffix_seen && !self.empty_input {
            anyhow::bail!("Native stream ended without a suffix frame");
        }
        Ok(())
    }

    fn reset_parser(&mut self) {
        self.prefix_read = false;
        self.suffix_seen = false;
        self.empty_input = false;
        self.totals = None;
        self.extremes = None;
        self.rows_before_limit = None;
    }

    fn totals(&self) -> Option<&Block> {
        self.totals.as_ref()
    }

    fn extremes(&self) -> Option<&Block> {
        self.extremes.as_ref()
    }

    fn rows_before_limit(&self) -> Option<u64> {
        self.rows_before_limit
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::format::prefix_bytes;
    use crate::writer::NativeBlockOutputStream;
    use native_core::{BlockOutputStream, Column, CompressionMethod};

    fn block(ids: &[u64]) -> Block {
        let mut b = Block::default();
        b.insert("id", Column::UInt64(ids.to_vec()));
        b
    }

    fn session(method: CompressionMethod) -> Vec<u8> {
        let mut w = NativeBlockOutputStream::with_compression(Vec::new(), method);
        w.write_prefix().unwrap();
        w.write(&block(&[1, 2])).unwrap();
        w.set_totals(block(&[3])).unwrap();
        w.set_extremes(block(&[1, 2])).unwrap();
        w.set_rows_before_limit(42);
        w.write(&block(&[3])).unwrap();
        w.write_suffix().unwrap();
        w.into_inner().unwrap()
    }

    #[test]
    fn reads_blocks_and_side_channels() {
        for method in [CompressionMethod::None, CompressionMethod::Zstd { level: 1 }, CompressionMethod::Lz4] {
            let mut r = NativeBlockInputStream::new(Cursor::new(session(method)));
            r.read_prefix().unwrap();
            assert_eq!(r.read().unwrap(), Some(block(&[1, 2])));
            assert_eq!(r.read().unwrap(), Some(block(&[3])));
            assert_eq!(r.read().unwrap(), None);
            r.read_suffix().unwrap();
            assert_eq!(r.totals(), Some(&block(&[3])));
            assert_eq!(r.extremes(), Some(&block(&[1, 2])));
            assert_eq!(r.rows_before_limit(), Some(42));
            assert_eq!(r.frames_read(), 4);
        }
    }

    #[test]
    fn empty_input_is_an_empty_session() {
        let mut r = NativeBlockInputStream::new(io::empty());
        r.read_prefix().unwrap();
        assert_eq!(r.read().unwrap(), None);
        r.read_suffix().unwrap();
    }

    #[test]
    fn missing_suffix_is_reported() {
        let mut bytes = prefix_bytes().to_vec();
        let mut w = NativeBlockOutputStream::new(Vec::new());
        w.write(&block(&[1])).unwrap();
        bytes.extend(w.into_inner().unwrap());

        let mut r = NativeBlockInputStream::new(Cursor::new(bytes));
        r.read_prefix().unwrap();
        assert!(r.read().unwrap().is_some());
        assert_eq!(r.read().unwrap(), None);
        assert!(r.read_suffix().unwrap_err().to_string().contains("suffix"));
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut bytes = session(CompressionMethod::None);
        let last_payload_byte = PREFIX_SIZE + FRAME_HEADER_SIZE + 4;
        bytes[last_payload_byte] ^= 0xFF;
        let mut r = NativeBlockInputStream::new(Cursor::new(bytes));
        r.read_prefix().unwrap();
        assert!(r.read().unwrap_err().to_string().contains("checksum"));
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let mut bytes = session(CompressionMethod::None);
        bytes.truncate(PREFIX_SIZE + FRAME_HEADER_SIZE + 2);
        let mut r = NativeBlockInputStream::new(Cursor::new(bytes));
        r.read_prefix().unwrap();
        assert!(r.read().is_err());
    }

    #[test]
    fn bad_prefix_is_an_error() {
        let mut r = NativeBlockInputStream::new(Cursor::new(b"CSV,DATA\n,\n".to_vec()));
        assert!(r.read_prefix().is_err());
    }

    #[test]
    fn reset_reads_a_following_session() {
        let mut bytes = session(CompressionMethod::None);
        bytes.extend(session(CompressionMethod::Lz4));
        let mut r = NativeBlockInputStream::new(Cursor::new(bytes));

        for _ in 0..2 {
            r.read_prefix().unwrap();
            let mut n = 0;
            while r.read().unwrap().is_some() {
                n += 1;
            }
            r.read_suffix().unwrap();
            assert_eq!(n, 2);
            assert!(r.totals().is_some());
            r.reset_parser();
            assert!(r.totals().is_none());
        }
    }
}

/// Magic bytes opening every Native session.
pub const MAGIC: &[u8; 8] = b"NATIVE\x00\x01";

pub const VERSION: u16 = 1;

/// Session prefix: magic[8] + version:u16 = 10 bytes.
pub const PREFIX_SIZE: usize = 10;

/// Header of a block-carrying frame:
///   tag:u8 + compression:u8 + raw_len:u32 + payload_len:u32 + checksum:u64
///   = 1 + 1 + 4 + 4 + 8 = 18
pub const FRAME_HEADER_SIZE: usize = 18;

/// Body of the suffix frame after its tag:
///   has_rows_before_limit:u8 + rows_before_limit:u64 = 9
pub const SUFFIX_BODY_SIZE: usize = 9;

// ── Frame tags ────────────────────────────────────────────────────────────

pub const TAG_DATA: u8 = 0x01;
pub const TAG_TOTALS: u8 = 0x02;
pub const TAG_EXTREMES: u8 = 0x03;
pub const TAG_SUFFIX: u8 = 0xFF;

// ── Compression ids ───────────────────────────────────────────────────────

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_ZSTD: u8 = 1;
pub const COMPRESSION_LZ4: u8 = 2;

pub fn prefix_bytes() -> [u8; PREFIX_SIZE] {
    let mut buf = [0u8; PREFIX_SIZE];
    buf[..8].copy_from_slice(MAGIC);
    buf[8..10].copy_from_slice(&VERSION.to_le_bytes());
    buf
}

pub fn check_prefix(buf: &[u8; PREFIX_SIZE]) -> anyhow::Result<()> {
    if &buf[..8] != MAGIC {
        anyhow::bail!("invalid Native magic bytes, not a Native stream");
    }
    let version = u16::from_le_bytes([buf[8], buf[9]]);
    if version != VERSION {
        anyhow::bail!(
            "unsupported Native version {} (only version {} is supported)",
            version,
            VERSION
        );
    }
    Ok(())
}

/// Which block channel a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Totals,
    Extremes,
}

impl FrameKind {
    pub fn tag(self) -> u8 {
        match self {
            FrameKind::Data => TAG_DATA,
            FrameKind::Totals => TAG_TOTALS,
            FrameKind::Extremes => TAG_EXTREMES,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_DATA => Some(FrameKind::Data),
            TAG_TOTALS => Some(FrameKind::Totals),
            TAG_EXTREMES => Some(FrameKind::Extremes),
            _ => None,
        }
    }
}

/// Decoded header of a block-carrying frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub compression: u8,
    /// Length of the encoded block before compression.
    pub raw_len: u32,
    /// Length of the payload that follows the header.
    pub payload_len: u32,
    /// xxhash3-64 of the payload bytes.
    pub checksum: u64,
}

impl FrameHeader {
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0] = self.kind.tag();
        buf[1] = self.compression;
        buf[2..6].copy_from_slice(&self.raw_len.to_le_bytes());
        buf[6..10].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[10..18].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; FRAME_HEADER_SIZE]) -> anyhow::Result<Self> {
        let kind = FrameKind::from_tag(buf[0])
            .ok_or_else(|| anyhow::anyhow!("unknown frame tag 0x{:02x}", buf[0]))?;
        Ok(Self {
            kind,
            compression: buf[1],
            raw_len: u32::from_le_bytes(buf[2..6].try_into()?),
            payload_len: u32::from_le_bytes(buf[6..10].try_into()?),
            checksum: u64::from_le_bytes(buf[10..18].try_into()?),
        })
    }
}

pub fn suffix_bytes(rows_before_limit: Option<u64>) -> [u8; 1 + SUFFIX_BODY_SIZE] {
    let mut buf = [0u8; 1 + SUFFIX_BODY_SIZE];
    buf[0] = TAG_SUFFIX;
    if let Some(rows) = rows_before_limit {
        buf[1] = 1;
        buf[2..10].copy_from_slice(&rows.to_le_bytes());
    }
    buf
}

/// Parse the suffix body (without its tag) into the rows-before-limit value.
pub fn parse_suffix_body(buf: &[u8; SUFFIX_BODY_SIZE]) -> anyhow::Result<Option<u64>> {
    match buf[0] {
        0 => Ok(None),
        1 => Ok(Some(u64::from_le_bytes(buf[1..9].try_into()?))),
        other => anyhow::bail!("invalid rows-before-limit marker {} in suffix", other),
    }
}

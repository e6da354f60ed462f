//! Statistics trailer: one ordinary block appended after the suffix,
//! carrying the session's progress and elapsed time.
//!
//! Schema (order-significant, one row):
//!
//! ```text
//! fl.statistics  UInt8    always 1, marks the block as a trailer
//! rows_read      UInt64
//! bytes_read     UInt64
//! elapsed        Float64  seconds since the adapter started
//! ```

use serde::{Deserialize, Serialize};

use crate::block::{Block, Header};
use crate::error::FormatError;
use crate::progress::ProgressValues;
use crate::types::{Column, DataType};

pub const STATISTICS_FLAG_COLUMN: &str = "fl.statistics";
pub const ROWS_READ_COLUMN: &str = "rows_read";
pub const BYTES_READ_COLUMN: &str = "bytes_read";
pub const ELAPSED_COLUMN: &str = "elapsed";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub rows_read: u64,
    pub bytes_read: u64,
    pub elapsed_seconds: f64,
}

impl SessionStatistics {
    pub fn new(progress: ProgressValues, elapsed_seconds: f64) -> Self {
        Self {
            rows_read: progress.read_rows,
            bytes_read: progress.read_bytes,
            elapsed_seconds,
        }
    }

    pub fn header() -> Header {
        Header::from_pairs([
            (STATISTICS_FLAG_COLUMN, DataType::UInt8),
            (ROWS_READ_COLUMN, DataType::UInt64),
            (BYTES_READ_COLUMN, DataType::UInt64),
            (ELAPSED_COLUMN, DataType::Float64),
        ])
        .unwrap_or_default()
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::default();
        block.insert(STATISTICS_FLAG_COLUMN, Column::UInt8(vec![1]));
        block.insert(ROWS_READ_COLUMN, Column::UInt64(vec![self.rows_read]));
        block.insert(BYTES_READ_COLUMN, Column::UInt64(vec![self.bytes_read]));
        block.insert(ELAPSED_COLUMN, Column::Float64(vec![self.elapsed_seconds]));
        block
    }

    /// A block whose first column is the statistics marker.
    pub fn is_statistics_block(block: &Block) -> bool {
        block
            .column(0)
            .map(|c| c.name == STATISTICS_FLAG_COLUMN)
            .unwrap_or(false)
    }

    pub fn from_block(block: &Block) -> anyhow::Result<Self> {
        if block.header() != Self::header() {
            return Err(FormatError::MalformedTrailer(format!(
                "unexpected schema [{}]",
                block.header()
            ))
            .into());
        }
        if block.rows() != 1 {
            return Err(
                FormatError::MalformedTrailer(format!("expected 1 row, got {}", block.rows())).into(),
            );
        }
        block.check_number_of_rows()?;
        let cols = block.columns();
        match (&cols[0].column, &cols[1].column, &cols[2].column, &cols[3].column) {
            (Column::UInt8(flag), Column::UInt64(rows), Column::UInt64(bytes), Column::Float64(elapsed)) => {
                if flag[0] != 1 {
                    return Err(FormatError::MalformedTrailer(format!("flag is {}", flag[0])).into());
                }
                Ok(Self {
                    rows_read: rows[0],
                    bytes_read: bytes[0],
                    elapsed_seconds: elapsed[0],
                })
            }
            _ => Err(FormatError::MalformedTrailer("column storage does not match schema".into()).into()),
        }
    }
}

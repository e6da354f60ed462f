//! Block payload encoding.
//!
//! ```text
//! num_columns:u32  num_rows:u64
//! per column:
//!   name_len:u32  name[name_len]  type_code:u8
//!   values: fixed-width little endian, or for String
//!           (len:u32 bytes[len]) × num_rows
//! ```

use native_core::{Block, Column, ColumnWithTypeAndName, DataType};

macro_rules! encode_fixed {
    ($values:expr, $out:expr) => {
        for v in $values {
            $out.extend_from_slice(&v.to_le_bytes());
        }
    };
}

macro_rules! decode_fixed {
    ($dec:expr, $rows:expr, $t:ty) => {{
        const WIDTH: usize = std::mem::size_of::<$t>();
        let bytes = $dec.take_n(WIDTH, $rows)?;
        bytes
            .chunks_exact(WIDTH)
            .map(|c| {
                let mut a = [0u8; WIDTH];
                a.copy_from_slice(c);
                <$t>::from_le_bytes(a)
            })
            .collect()
    }};
}

pub fn encode_block(block: &Block, out: &mut Vec<u8>) {
    out.extend_from_slice(&(block.num_columns() as u32).to_le_bytes());
    out.extend_from_slice(&(block.rows() as u64).to_le_bytes());
    for c in block.columns() {
        out.extend_from_slice(&(c.name.len() as u32).to_le_bytes());
        out.extend_from_slice(c.name.as_bytes());
        out.push(c.data_type.code());
        encode_column(&c.column, out);
    }
}

fn encode_column(column: &Column, out: &mut Vec<u8>) {
    match column {
        Column::UInt8(v) => out.extend_from_slice(v),
        Column::UInt16(v) => encode_fixed!(v, out),
        Column::UInt32(v) => encode_fixed!(v, out),
        Column::UInt64(v) => encode_fixed!(v, out),
        Column::Int8(v) => encode_fixed!(v, out),
        Column::Int16(v) => encode_fixed!(v, out),
        Column::Int32(v) => encode_fixed!(v, out),
        Column::Int64(v) => encode_fixed!(v, out),
        Column::Float32(v) => encode_fixed!(v, out),
        Column::Float64(v) => encode_fixed!(v, out),
        Column::String(v) => {
            for s in v {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, len: usize) -> anyhow::Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "block payload truncated: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.buf.len()
                )
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_n(&mut self, width: usize, count: usize) -> anyhow::Result<&'a [u8]> {
        let len = width
            .checked_mul(count)
            .ok_or_else(|| anyhow::anyhow!("row count {} overflows payload size", count))?;
        self.take(len)
    }

    fn u8(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> anyhow::Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into()?))
    }

    fn u64(&mut self) -> anyhow::Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into()?))
    }

    fn string(&mut self) -> anyhow::Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

pub fn decode_block(buf: &[u8]) -> anyhow::Result<Block> {
    let mut dec = Decoder { buf, pos: 0 };
    let num_columns = dec.u32()? as usize;
    let rows = usize::try_from(dec.u64()?)?;

    let mut columns = Vec::with_capacity(num_columns.min(1024));
    for _ in 0..num_columns {
        let name = dec.string()?;
        let data_type = DataType::from_code(dec.u8()?)?;
        let column = decode_column(&mut dec, data_type, rows)?;
        columns.push(ColumnWithTypeAndName {
            name,
            data_type,
            column,
        });
    }

    if dec.pos != buf.len() {
        anyhow::bail!(
            "block payload has {} trailing bytes",
            buf.len() - dec.pos
        );
    }
    Ok(Block::new(columns))
}

fn decode_column(dec: &mut Decoder<'_>, data_type: DataType, rows: usize) -> anyhow::Result<Column> {
    let column = match data_type {
        DataType::UInt8 => Column::UInt8(dec.take_n(1, rows)?.to_vec()),
        DataType::UInt16 => Column::UInt16(decode_fixed!(dec, rows, u16)),
        DataType::UInt32 => Column::UInt32(decode_fixed!(dec, rows, u32)),
        DataType::UInt64 => Column::UInt64(decode_fixed!(dec, rows, u64)),
        DataType::Int8 => Column::Int8(decode_fixed!(dec, rows, i8)),
        DataType::Int16 => Column::Int16(decode_fixed!(dec, rows, i16)),
        DataType::Int32 => Column::Int32(decode_fixed!(dec, rows, i32)),
        DataType::Int64 => Column::Int64(decode_fixed!(dec, rows, i64)),
        DataType::Float32 => Column::Float32(decode_fixed!(dec, rows, f32)),
        DataType::Float64 => Column::Float64(decode_fixed!(dec, rows, f64)),
        DataType::String => {
            let mut values = Vec::with_capacity(rows.min(dec.buf.len()));
            for _ in 0..rows {
                values.push(dec.string()?);
            }
            Column::String(values)
        }
    };
    Ok(column)
}

use std::fmt;
use std::str::FromStr;

/// Column element type understood by the Native format.
///
/// `code()` is the stable one-byte identifier written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
}

impl DataType {
    pub const ALL: [DataType; 11] = [
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::String,
    ];

    pub fn code(self) -> u8 {
        match self {
            DataType::UInt8 => 1,
            DataType::UInt16 => 2,
            DataType::UInt32 => 3,
            DataType::UInt64 => 4,
            DataType::Int8 => 5,
            DataType::Int16 => 6,
            DataType::Int32 => 7,
            DataType::Int64 => 8,
            DataType::Float32 => 9,
            DataType::Float64 => 10,
            DataType::String => 11,
        }
    }

    pub fn from_code(code: u8) -> anyhow::Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or_else(|| anyhow::anyhow!("unknown data type code {}", code))
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::UInt8 => "UInt8",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::UInt64 => "UInt64",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
            DataType::String => "String",
        }
    }

    /// Width in bytes of one value, or `None` for variable-width types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::UInt8 | DataType::Int8 => Some(1),
            DataType::UInt16 | DataType::Int16 => Some(2),
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => Some(4),
            DataType::UInt64 | DataType::Int64 | DataType::Float64 => Some(8),
            DataType::String => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown data type '{}'", s))
    }
}

/// Owned column storage. Moving a `Column` between a block and a chunk
/// moves the vector, never the elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

macro_rules! dispatch {
    ($col:expr, $v:ident => $body:expr) => {
        match $col {
            Column::UInt8($v) => $body,
            Column::UInt16($v) => $body,
            Column::UInt32($v) => $body,
            Column::UInt64($v) => $body,
            Column::Int8($v) => $body,
            Column::Int16($v) => $body,
            Column::Int32($v) => $body,
            Column::Int64($v) => $body,
            Column::Float32($v) => $body,
            Column::Float64($v) => $body,
            Column::String($v) => $body,
        }
    };
}

impl Column {
    /// An empty column of the given type.
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::UInt8 => Column::UInt8(Vec::new()),
            DataType::UInt16 => Column::UInt16(Vec::new()),
            DataType::UInt32 => Column::UInt32(Vec::new()),
            DataType::UInt64 => Column::UInt64(Vec::new()),
            DataType::Int8 => Column::Int8(Vec::new()),
            DataType::Int16 => Column::Int16(Vec::new()),
            DataType::Int32 => Column::Int32(Vec::new()),
            DataType::Int64 => Column::Int64(Vec::new()),
            DataType::Float32 => Column::Float32(Vec::new()),
            DataType::Float64 => Column::Float64(Vec::new()),
            DataType::String => Column::String(Vec::new()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::UInt8(_) => DataType::UInt8,
            Column::UInt16(_) => DataType::UInt16,
            Column::UInt32(_) => DataType::UInt32,
            Column::UInt64(_) => DataType::UInt64,
            Column::Int8(_) => DataType::Int8,
            Column::Int16(_) => DataType::Int16,
            Column::Int32(_) => DataType::Int32,
            Column::Int64(_) => DataType::Int64,
            Column::Float32(_) => DataType::Float32,
            Column::Float64(_) => DataType::Float64,
            Column::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// In-memory payload size in bytes. Strings count their UTF-8 length.
    pub fn byte_size(&self) -> usize {
        match self {
            Column::String(v) => v.iter().map(String::len).sum(),
            other => {
                let width = other.data_type().fixed_width().unwrap_or(0);
                width * other.len()
            }
        }
    }

    /// Append the values of `other`, which must have the same type.
    pub fn extend(&mut self, other: Column) -> anyhow::Result<()> {
        match (self, other) {
            (Column::UInt8(a), Column::UInt8(b)) => a.extend(b),
            (Column::UInt16(a), Column::UInt16(b)) => a.extend(b),
            (Column::UInt32(a), Column::UInt32(b)) => a.extend(b),
            (Column::UInt64(a), Column::UInt64(b)) => a.extend(b),
            (Column::Int8(a), Column::Int8(b)) => a.extend(b),
            (Column::Int16(a), Column::Int16(b)) => a.extend(b),
            (Column::Int32(a), Column::Int32(b)) => a.extend(b),
            (Column::Int64(a), Column::Int64(b)) => a.extend(b),
            (Column::Float32(a), Column::Float32(b)) => a.extend(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend(b),
            (Column::String(a), Column::String(b)) => a.extend(b),
            (a, b) => anyhow::bail!(
                "cannot extend {} column with {} values",
                a.data_type(),
                b.data_type()
            ),
        }
        Ok(())
    }

    /// Render the value at `row` as text, for dumps and diagnostics.
    pub fn value_to_string(&self, row: usize) -> Option<String> {
        match self {
            Column::String(v) => v.get(row).cloned(),
            other => dispatch!(other, v => v.get(row).map(|x| x.to_string())),
        }
    }
}

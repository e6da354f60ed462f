use std::collections::HashSet;
use std::fmt;

use crate::error::FormatError;
use crate::types::{Column, DataType};

/// Name and type of one column in a [`Header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered, uniquely named schema of one port.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    columns: Vec<ColumnDescription>,
}

impl Header {
    /// Build a header, rejecting duplicate column names.
    pub fn new(columns: Vec<ColumnDescription>) -> anyhow::Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(FormatError::DuplicateColumn(c.name.clone()).into());
            }
        }
        Ok(Self { columns })
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, DataType)>,
    ) -> anyhow::Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, t)| ColumnDescription::new(name, t))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescription> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, idx: usize) -> Option<&ColumnDescription> {
        self.columns.get(idx)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", c.name, c.data_type)?;
        }
        Ok(())
    }
}

/// One named, typed column of a [`Block`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWithTypeAndName {
    pub name: String,
    pub data_type: DataType,
    pub column: Column,
}

/// Named, typed columnar unit exchanged with a codec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    columns: Vec<ColumnWithTypeAndName>,
}

impl Block {
    pub fn new(columns: Vec<ColumnWithTypeAndName>) -> Self {
        Self { columns }
    }

    /// Attach `columns` to the names and types of `header`.
    ///
    /// The caller is responsible for having checked that the columns match
    /// the header; surplus columns on either side are dropped.
    pub fn from_columns(header: &Header, columns: Vec<Column>) -> Self {
        let columns = header
            .iter()
            .zip(columns)
            .map(|(desc, column)| ColumnWithTypeAndName {
                name: desc.name.clone(),
                data_type: desc.data_type,
                column,
            })
            .collect();
        Self { columns }
    }

    pub fn insert(&mut self, name: impl Into<String>, column: Column) {
        let data_type = column.data_type();
        self.columns.push(ColumnWithTypeAndName {
            name: name.into(),
            data_type,
            column,
        });
    }

    /// Schema of this block. Duplicate names are not re-validated here.
    pub fn header(&self) -> Header {
        Header {
            columns: self
                .columns
                .iter()
                .map(|c| ColumnDescription::new(c.name.clone(), c.data_type))
                .collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnWithTypeAndName] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnWithTypeAndName> {
        self.columns.get(idx)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Row count, taken from the first column.
    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.column.len()).unwrap_or(0)
    }

    /// Fail if the columns disagree on row count.
    pub fn check_number_of_rows(&self) -> anyhow::Result<()> {
        let expected = self.rows();
        for c in &self.columns {
            if c.column.len() != expected {
                return Err(FormatError::RowCountMismatch {
                    context: "Block".to_string(),
                    column: c.name.clone(),
                    expected,
                    actual: c.column.len(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns.into_iter().map(|c| c.column).collect()
    }

    pub fn byte_size(&self) -> usize {
        self.columns.iter().map(|c| c.column.byte_size()).sum()
    }
}

/// Headerless columnar unit handed between the pipeline and an adapter.
///
/// The schema is implied by the port the chunk travels through.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Chunk {
    pub fn new(columns: Vec<Column>, num_rows: usize) -> Self {
        Self { columns, num_rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the chunk carries neither rows nor columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 && self.columns.is_empty()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn detach_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn byte_size(&self) -> usize {
        self.columns.iter().map(Column::byte_size).sum()
    }
}

/// Which logical channel a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Main,
    Totals,
    Extremes,
}

/// Per-port schemas supplied to an output adapter at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortHeaders {
    pub main: Header,
    pub totals: Header,
    pub extremes: Header,
}

impl PortHeaders {
    /// Same schema on all three ports.
    pub fn uniform(header: Header) -> Self {
        Self {
            main: header.clone(),
            totals: header.clone(),
            extremes: header,
        }
    }

    pub fn get(&self, port: PortKind) -> &Header {
        match port {
            PortKind::Main => &self.main,
            PortKind::Totals => &self.totals,
            PortKind::Extremes => &self.extremes,
        }
    }
}

/// Check that `actual` has exactly the columns of `expected`: same count,
/// and the same name and type at every position.
pub fn assert_blocks_have_equal_structure(
    expected: &Header,
    actual: &Block,
    context: &str,
) -> anyhow::Result<()> {
    let same = expected.len() == actual.num_columns()
        && expected
            .iter()
            .zip(actual.columns())
            .all(|(e, a)| e.name == a.name && e.data_type == a.data_type && a.column.data_type() == a.data_type);
    if !same {
        return Err(FormatError::StructureMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.header().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Check that a chunk fits `header`: same column count, same column types,
/// and every column holding `num_rows` values.
pub fn check_chunk_structure(header: &Header, chunk: &Chunk, context: &str) -> anyhow::Result<()> {
    let types_match = header.len() == chunk.num_columns()
        && header
            .iter()
            .zip(chunk.columns())
            .all(|(desc, col)| desc.data_type == col.data_type());
    if !types_match {
        let actual = chunk
            .columns()
            .iter()
            .map(|c| c.data_type().name())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(FormatError::StructureMismatch {
            context: context.to_string(),
            expected: header.to_string(),
            actual,
        }
        .into());
    }
    for (desc, col) in header.iter().zip(chunk.columns()) {
        if col.len() != chunk.num_rows() {
            return Err(FormatError::RowCountMismatch {
                context: context.to_string(),
                column: desc.name.clone(),
                expected: chunk.num_rows(),
                actual: col.len(),
            }
            .into());
        }
    }
    Ok(())
}

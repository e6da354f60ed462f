pub mod block;
pub mod codec;
pub mod error;
pub mod factory;
pub mod format;
pub mod input;
pub mod output;
pub mod progress;
pub mod settings;
pub mod trailer;
pub mod types;

#[cfg(test)]
mod testing;

pub use block::{Block, Chunk, ColumnDescription, ColumnWithTypeAndName, Header, PortHeaders, PortKind};
pub use codec::{BlockInputStream, BlockOutputStream};
pub use error::FormatError;
pub use factory::FormatFactory;
pub use format::{InputFormat, OutputFormat, WriteCallback};
pub use input::NativeInputFormat;
pub use output::NativeOutputFormat;
pub use progress::{Progress, ProgressValues};
pub use settings::{CompressionMethod, FormatSettings, NativeSettings};
pub use trailer::SessionStatistics;
pub use types::{Column, DataType};

/// Name under which the Native adapters are registered.
pub const NATIVE_FORMAT_NAME: &str = "Native";

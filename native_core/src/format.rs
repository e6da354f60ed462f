use crate::block::{Chunk, Header, PortKind};
use crate::progress::ProgressValues;

/// Pull side of the pipeline contract.
pub trait InputFormat: Send {
    fn name(&self) -> &'static str;

    fn header(&self) -> &Header;

    /// Next chunk, or `None` at end of stream.
    fn produce_next(&mut self) -> anyhow::Result<Option<Chunk>>;

    /// Forget framing state so another session can be read.
    fn reset_parser(&mut self);
}

/// Push side of the pipeline contract.
pub trait OutputFormat: Send {
    fn name(&self) -> &'static str;

    fn header(&self, port: PortKind) -> &Header;

    fn consume_main(&mut self, chunk: Chunk) -> anyhow::Result<()>;

    fn consume_totals(&mut self, chunk: Chunk) -> anyhow::Result<()>;

    fn consume_extremes(&mut self, chunk: Chunk) -> anyhow::Result<()>;

    fn finalize(&mut self) -> anyhow::Result<()>;

    fn set_rows_before_limit(&mut self, rows: u64);

    fn on_progress(&mut self, progress: &ProgressValues);

    fn content_type(&self) -> String;

    /// Route `chunk` to the entry point for `port`.
    fn push(&mut self, port: PortKind, chunk: Chunk) -> anyhow::Result<()> {
        match port {
            PortKind::Main => self.consume_main(chunk),
            PortKind::Totals => self.consume_totals(chunk),
            PortKind::Extremes => self.consume_extremes(chunk),
        }
    }
}

/// Called with the row count of every main block the output adapter writes.
pub type WriteCallback = Box<dyn FnMut(usize) + Send>;

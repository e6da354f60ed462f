use crate::block::Block;
use crate::progress::ProgressValues;

/// Content type reported for binary block streams.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Read half of a block codec: turns a framed byte stream into blocks.
///
/// The adapters drive it in this order per session:
/// `read_prefix`, `read` until it yields `None`, `read_suffix`.
/// `reset_parser` prepares it for another session from the current
/// stream position.
pub trait BlockInputStream: Send {
    fn read_prefix(&mut self) -> anyhow::Result<()>;

    /// Next data block, or `None` when the session has no more data.
    fn read(&mut self) -> anyhow::Result<Option<Block>>;

    fn read_suffix(&mut self) -> anyhow::Result<()>;

    fn reset_parser(&mut self);

    /// Totals block seen in the current session, if any.
    fn totals(&self) -> Option<&Block> {
        None
    }

    fn extremes(&self) -> Option<&Block> {
        None
    }

    fn rows_before_limit(&self) -> Option<u64> {
        None
    }
}

/// Write half of a block codec.
///
/// Totals and extremes are side channels: the codec decides where in the
/// framed stream they end up.
pub trait BlockOutputStream: Send {
    fn write_prefix(&mut self) -> anyhow::Result<()>;

    fn write(&mut self, block: &Block) -> anyhow::Result<()>;

    fn set_totals(&mut self, block: Block) -> anyhow::Result<()>;

    fn set_extremes(&mut self, block: Block) -> anyhow::Result<()>;

    fn write_suffix(&mut self) -> anyhow::Result<()>;

    fn set_rows_before_limit(&mut self, rows: u64);

    /// Progress sink used when the adapter is not accumulating statistics.
    fn on_progress(&mut self, _progress: &ProgressValues) {}

    fn content_type(&self) -> String {
        DEFAULT_CONTENT_TYPE.to_string()
    }

    fn flush(&mut self) -> anyhow::Result<()>;
}

impl<T: BlockInputStream + ?Sized> BlockInputStream for Box<T> {
    fn read_prefix(&mut self) -> anyhow::Result<()> {
        (**self).read_prefix()
    }

    fn read(&mut self) -> anyhow::Result<Option<Block>> {
        (**self).read()
    }

    fn read_suffix(&mut self) -> anyhow::Result<()> {
        (**self).read_suffix()
    }

    fn reset_parser(&mut self) {
        (**self).reset_parser()
    }

    fn totals(&self) -> Option<&Block> {
        (**self).totals()
    }

    fn extremes(&self) -> Option<&Block> {
        (**self).extremes()
    }

    fn rows_before_limit(&self) -> Option<u64> {
        (**self).rows_before_limit()
    }
}

impl<T: BlockOutputStream + ?Sized> BlockOutputStream for Box<T> {
    fn write_prefix(&mut self) -> anyhow::Result<()> {
        (**self).write_prefix()
    }

    fn write(&mut self, block: &Block) -> anyhow::Result<()> {
        (**self).write(block)
    }

    fn set_totals(&mut self, block: Block) -> anyhow::Result<()> {
        (**self).set_totals(block)
    }

    fn set_extremes(&mut self, block: Block) -> anyhow::Result<()> {
        (**self).set_extremes(block)
    }

    fn write_suffix(&mut self) -> anyhow::Result<()> {
        (**self).write_suffix()
    }

    fn set_rows_before_limit(&mut self, rows: u64) {
        (**self).set_rows_before_limit(rows)
    }

    fn on_progress(&mut self, progress: &ProgressValues) {
        (**self).on_progress(progress)
    }

    fn content_type(&self) -> String {
        (**self).content_type()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        (**self).flush()
    }
}

use std::sync::Arc;

use log::{debug, trace};

use crate::block::{assert_blocks_have_equal_structure, Block, Chunk, Header};
use crate::codec::BlockInputStream;
use crate::error::FormatError;
use crate::format::InputFormat;
use crate::progress::{Progress, ProgressValues};
use crate::settings::NativeSettings;
use crate::trailer::SessionStatistics;

/// Pull adapter from a [`BlockInputStream`] to headerless [`Chunk`]s.
///
/// # Session lifecycle
/// 1. The first `produce_next` reads the prefix.
/// 2. Each codec block is checked against the port header and handed out
///    as a chunk, moving its column storage.
/// 3. When the codec runs dry the suffix is read once; every later call
///    returns `None` without touching the codec.
///
/// [`reset_parser`](InputFormat::reset_parser) rewinds the flags (not the
/// byte stream) so the next session on the same stream can be read.
pub struct NativeInputFormat<S> {
    stream: S,
    header: Header,
    settings: NativeSettings,
    read_prefix: bool,
    read_suffix: bool,
    progress: Arc<Progress>,
    statistics: Option<SessionStatistics>,
}

impl<S: BlockInputStream> NativeInputFormat<S> {
    pub const NAME: &'static str = "NativeInputFormat";

    pub fn new(header: Header, stream: S) -> Self {
        Self::with_settings(header, stream, NativeSettings::default())
    }

    pub fn with_settings(header: Header, stream: S, settings: NativeSettings) -> Self {
        Self {
            stream,
            header,
            settings,
            read_prefix: false,
            read_suffix: false,
            progress: Arc::new(Progress::new()),
            statistics: None,
        }
    }

    fn generate(&mut self) -> anyhow::Result<Option<Chunk>> {
        if !self.read_prefix {
            debug!("{}: reading prefix", Self::NAME);
            self.stream.read_prefix()?;
            self.read_prefix = true;
        }

        if self.read_suffix {
            return Ok(None);
        }

        let Some(block) = self.stream.read()? else {
            debug!("{}: reading suffix", Self::NAME);
            self.stream.read_suffix()?;
            self.read_suffix = true;
            if self.settings.statistics_trailer {
                self.read_trailer()?;
            }
            return Ok(None);
        };

        assert_blocks_have_equal_structure(&self.header, &block, Self::NAME)?;
        block.check_number_of_rows()?;

        let num_rows = block.rows();
        self.progress.increment_piecewise_atomically(&ProgressValues::new(
            num_rows as u64,
            block.byte_size() as u64,
        ));
        trace!("{}: block of {} rows", Self::NAME, num_rows);

        Ok(Some(Chunk::new(block.into_columns(), num_rows)))
    }

    /// The writer appends at most one statistics block after the suffix.
    fn read_trailer(&mut self) -> anyhow::Result<()> {
        match self.stream.read()? {
            None => Ok(()),
            Some(block) if SessionStatistics::is_statistics_block(&block) => {
                let stats = SessionStatistics::from_block(&block)?;
                debug!("{}: statistics trailer {:?}", Self::NAME, stats);
                self.statistics = Some(stats);
                Ok(())
            }
            Some(block) => Err(FormatError::UnexpectedTrailingBlock {
                context: Self::NAME.to_string(),
                actual: block.header().to_string(),
            }
            .into()),
        }
    }

    /// Statistics trailer of the last finished session, if one was read.
    pub fn statistics(&self) -> Option<&SessionStatistics> {
        self.statistics.as_ref()
    }

    pub fn totals(&self) -> Option<&Block> {
        self.stream.totals()
    }

    pub fn extremes(&self) -> Option<&Block> {
        self.stream.extremes()
    }

    pub fn rows_before_limit(&self) -> Option<u64> {
        self.stream.rows_before_limit()
    }

    /// Rows and in-memory bytes of every chunk produced so far.
    pub fn progress(&self) -> ProgressValues {
        self.progress.fetch()
    }

    pub fn is_finished(&self) -> bool {
        self.read_suffix
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}

impl<S: BlockInputStream> InputFormat for NativeInputFormat<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn produce_next(&mut self) -> anyhow::Result<Option<Chunk>> {
        self.generate()
    }

    fn reset_parser(&mut self) {
        debug!("{}: resetting parser", Self::NAME);
        self.stream.reset_parser();
        self.read_prefix = false;
        self.read_suffix = false;
        self.statistics = None;
        if self.settings.reset_progress_on_reset {
            self.progress.reset();
        }
    }
}

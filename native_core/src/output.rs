use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use crate::block::{check_chunk_structure, Block, Chunk, Header, PortHeaders, PortKind};
use crate::codec::BlockOutputStream;
use crate::format::{OutputFormat, WriteCallback};
use crate::progress::{Progress, ProgressValues};
use crate::settings::NativeSettings;
use crate::trailer::SessionStatistics;

/// Push adapter from headerless [`Chunk`]s to a [`BlockOutputStream`].
///
/// # Write order
/// ```text
/// prefix → { main | totals | extremes }* → suffix → [statistics trailer]
/// ```
/// The prefix is written by whichever entry point runs first, including
/// `finalize` on an empty result. Suffix and trailer are written only by
/// `finalize`, each at most once per session. Chunks are checked against
/// their port header before anything is written.
pub struct NativeOutputFormat<S> {
    stream: S,
    headers: PortHeaders,
    settings: NativeSettings,
    prefix_written: bool,
    suffix_written: bool,
    trailer_written: bool,
    progress: Arc<Progress>,
    watch: Instant,
    write_callback: Option<WriteCallback>,
}

impl<S: BlockOutputStream> NativeOutputFormat<S> {
    pub const NAME: &'static str = "NativeOutputFormat";

    pub fn new(headers: PortHeaders, stream: S) -> Self {
        Self::with_settings(headers, stream, NativeSettings::default())
    }

    pub fn with_settings(headers: PortHeaders, stream: S, settings: NativeSettings) -> Self {
        Self {
            stream,
            headers,
            settings,
            prefix_written: false,
            suffix_written: false,
            trailer_written: false,
            progress: Arc::new(Progress::new()),
            watch: Instant::now(),
            write_callback: None,
        }
    }

    pub fn with_write_callback(mut self, callback: WriteCallback) -> Self {
        self.write_callback = Some(callback);
        self
    }

    fn write_prefix_if_not(&mut self) -> anyhow::Result<()> {
        if !self.prefix_written {
            debug!("{}: writing prefix", Self::NAME);
            self.stream.write_prefix()?;
        }
        self.prefix_written = true;
        Ok(())
    }

    fn write_suffix_if_not(&mut self) -> anyhow::Result<()> {
        if !self.suffix_written {
            debug!("{}: writing suffix", Self::NAME);
            self.stream.write_suffix()?;
        }
        self.suffix_written = true;
        Ok(())
    }

    fn write_statistics_trailer(&mut self) -> anyhow::Result<()> {
        if self.trailer_written {
            return Ok(());
        }
        let stats = SessionStatistics::new(self.progress.fetch(), self.watch.elapsed().as_secs_f64());
        debug!("{}: writing statistics trailer {:?}", Self::NAME, stats);
        self.stream.write(&stats.to_block())?;
        self.trailer_written = true;
        Ok(())
    }

    fn ensure_open(&self, port: PortKind) -> anyhow::Result<()> {
        if self.suffix_written {
            anyhow::bail!(
                "{}: {:?} chunk pushed after finalize; reset the adapter to start a new session",
                Self::NAME,
                port
            );
        }
        Ok(())
    }

    /// Start a new session on the same stream. Progress is kept unless
    /// `reset_progress_on_reset` is set.
    pub fn reset(&mut self) {
        debug!("{}: reset", Self::NAME);
        self.prefix_written = false;
        self.suffix_written = false;
        self.trailer_written = false;
        if self.settings.reset_progress_on_reset {
            self.progress.reset();
            self.watch = Instant::now();
        }
    }

    /// Shared counters for progress reported from another thread.
    ///
    /// `None` when the trailer is disabled: progress then belongs to the
    /// codec and is only accepted through [`OutputFormat::on_progress`].
    pub fn progress_handle(&self) -> Option<Arc<Progress>> {
        self.settings
            .statistics_trailer
            .then(|| Arc::clone(&self.progress))
    }

    pub fn progress(&self) -> ProgressValues {
        self.progress.fetch()
    }

    pub fn is_finalized(&self) -> bool {
        self.suffix_written
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}

impl<S: BlockOutputStream> OutputFormat for NativeOutputFormat<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn header(&self, port: PortKind) -> &Header {
        self.headers.get(port)
    }

    fn consume_main(&mut self, chunk: Chunk) -> anyhow::Result<()> {
        self.ensure_open(PortKind::Main)?;
        if !chunk.is_empty() {
            check_chunk_structure(&self.headers.main, &chunk, Self::NAME)?;
        }

        self.write_prefix_if_not()?;

        if !chunk.is_empty() {
            let rows = chunk.num_rows();
            let block = Block::from_columns(&self.headers.main, chunk.detach_columns());
            self.stream.write(&block)?;
            trace!("{}: wrote block of {} rows", Self::NAME, rows);
            if let Some(callback) = self.write_callback.as_mut() {
                callback(rows);
            }
        }
        Ok(())
    }

    fn consume_totals(&mut self, chunk: Chunk) -> anyhow::Result<()> {
        self.ensure_open(PortKind::Totals)?;
        check_chunk_structure(&self.headers.totals, &chunk, Self::NAME)?;

        self.write_prefix_if_not()?;

        let block = Block::from_columns(&self.headers.totals, chunk.detach_columns());
        self.stream.set_totals(block)
    }

    fn consume_extremes(&mut self, chunk: Chunk) -> anyhow::Result<()> {
        self.ensure_open(PortKind::Extremes)?;
        check_chunk_structure(&self.headers.extremes, &chunk, Self::NAME)?;

        self.write_prefix_if_not()?;

        let block = Block::from_columns(&self.headers.extremes, chunk.detach_columns());
        self.stream.set_extremes(block)
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        self.write_prefix_if_not()?;
        self.write_suffix_if_not()?;
        if self.settings.statistics_trailer {
            self.write_statistics_trailer()?;
        }
        self.stream.flush()
    }

    fn set_rows_before_limit(&mut self, rows: u64) {
        self.stream.set_rows_before_limit(rows);
    }

    fn on_progress(&mut self, progress: &ProgressValues) {
        if self.settings.statistics_trailer {
            self.progress.increment_piecewise_atomically(progress);
        } else {
            self.stream.on_progress(progress);
        }
    }

    fn content_type(&self) -> String {
        self.stream.content_type()
    }
}

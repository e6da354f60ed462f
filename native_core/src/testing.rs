//! In-memory codecs that record the calls made on them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::block::{Block, Header};
use crate::codec::{BlockInputStream, BlockOutputStream};
use crate::progress::ProgressValues;
use crate::types::{Column, DataType};

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn id_name_header() -> Header {
    Header::from_pairs([("id", DataType::UInt64), ("name", DataType::String)]).unwrap()
}

pub fn id_name_block(rows: &[(u64, &str)]) -> Block {
    Block::from_columns(
        &id_name_header(),
        vec![
            Column::UInt64(rows.iter().map(|r| r.0).collect()),
            Column::String(rows.iter().map(|r| r.1.to_string()).collect()),
        ],
    )
}

/// Yields `blocks`, then `None` once per session, then `trailing`.
pub struct ScriptedInput {
    blocks: VecDeque<Block>,
    trailing: VecDeque<Block>,
    drained: bool,
    log: CallLog,
}

impl ScriptedInput {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: blocks.into(),
            trailing: VecDeque::new(),
            drained: false,
            log: CallLog::default(),
        }
    }

    pub fn with_trailing(mut self, trailing: Vec<Block>) -> Self {
        self.trailing = trailing.into();
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl BlockInputStream for ScriptedInput {
    fn read_prefix(&mut self) -> anyhow::Result<()> {
        self.log.push("read_prefix");
        Ok(())
    }

    fn read(&mut self) -> anyhow::Result<Option<Block>> {
        self.log.push("read");
        if self.drained {
            return Ok(self.trailing.pop_front());
        }
        match self.blocks.pop_front() {
            Some(b) => Ok(Some(b)),
            None => {
                self.drained = true;
                Ok(None)
            }
        }
    }

    fn read_suffix(&mut self) -> anyhow::Result<()> {
        self.log.push("read_suffix");
        Ok(())
    }

    fn reset_parser(&mut self) {
        self.log.push("reset_parser");
        self.drained = false;
    }
}

/// Records every call, keeping written blocks for inspection.
#[derive(Default)]
pub struct RecordingOutput {
    pub log: CallLog,
    pub written: Arc<Mutex<Vec<Block>>>,
    pub forwarded_progress: Arc<Mutex<Vec<ProgressValues>>>,
    pub rows_before_limit: Option<u64>,
    pub fail_writes: bool,
}

impl RecordingOutput {
    pub fn written(&self) -> Vec<Block> {
        self.written.lock().unwrap().clone()
    }
}

impl BlockOutputStream for RecordingOutput {
    fn write_prefix(&mut self) -> anyhow::Result<()> {
        self.log.push("write_prefix");
        Ok(())
    }

    fn write(&mut self, block: &Block) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("disk full");
        }
        self.log.push("write");
        self.written.lock().unwrap().push(block.clone());
        Ok(())
    }

    fn set_totals(&mut self, block: Block) -> anyhow::Result<()> {
        self.log.push("set_totals");
        self.written.lock().unwrap().push(block);
        Ok(())
    }

    fn set_extremes(&mut self, block: Block) -> anyhow::Result<()> {
        self.log.push("set_extremes");
        self.written.lock().unwrap().push(block);
        Ok(())
    }

    fn write_suffix(&mut self) -> anyhow::Result<()> {
        self.log.push("write_suffix");
        Ok(())
    }

    fn set_rows_before_limit(&mut self, rows: u64) {
        self.log.push("set_rows_before_limit");
        self.rows_before_limit = Some(rows);
    }

    fn on_progress(&mut self, progress: &ProgressValues) {
        self.forwarded_progress.lock().unwrap().push(*progress);
    }

    fn content_type(&self) -> String {
        "application/x-recording".to_string()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

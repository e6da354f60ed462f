use std::collections::HashMap;
use std::io::{Read, Write};

use log::debug;

use crate::block::{Header, PortHeaders};
use crate::error::FormatError;
use crate::format::{InputFormat, OutputFormat, WriteCallback};
use crate::settings::FormatSettings;

pub type InputCreator = Box<
    dyn Fn(Box<dyn Read + Send>, Header, &FormatSettings) -> anyhow::Result<Box<dyn InputFormat>>
        + Send
        + Sync,
>;

pub type OutputCreator = Box<
    dyn Fn(
            Box<dyn Write + Send>,
            PortHeaders,
            Option<WriteCallback>,
            &FormatSettings,
        ) -> anyhow::Result<Box<dyn OutputFormat>>
        + Send
        + Sync,
>;

/// Registry of input and output format creators, keyed by format name.
#[derive(Default)]
pub struct FormatFactory {
    inputs: HashMap<String, InputCreator>,
    outputs: HashMap<String, OutputCreator>,
}

impl FormatFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_input_format(&mut self, name: &str, creator: InputCreator) -> anyhow::Result<()> {
        if self.inputs.contains_key(name) {
            return Err(FormatError::AlreadyRegistered(name.to_string()).into());
        }
        debug!("registered input format '{}'", name);
        self.inputs.insert(name.to_string(), creator);
        Ok(())
    }

    pub fn register_output_format(&mut self, name: &str, creator: OutputCreator) -> anyhow::Result<()> {
        if self.outputs.contains_key(name) {
            return Err(FormatError::AlreadyRegistered(name.to_string()).into());
        }
        debug!("registered output format '{}'", name);
        self.outputs.insert(name.to_string(), creator);
        Ok(())
    }

    pub fn input_format(
        &self,
        name: &str,
        reader: Box<dyn Read + Send>,
        header: Header,
        settings: &FormatSettings,
    ) -> anyhow::Result<Box<dyn InputFormat>> {
        let creator = self
            .inputs
            .get(name)
            .ok_or_else(|| FormatError::UnknownFormat(name.to_string()))?;
        creator(reader, header, settings)
    }

    pub fn output_format(
        &self,
        name: &str,
        writer: Box<dyn Write + Send>,
        headers: PortHeaders,
        write_callback: Option<WriteCallback>,
        settings: &FormatSettings,
    ) -> anyhow::Result<Box<dyn OutputFormat>> {
        let creator = self
            .outputs
            .get(name)
            .ok_or_else(|| FormatError::UnknownFormat(name.to_string()))?;
        creator(writer, headers, write_callback, settings)
    }

    pub fn has_input_format(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    pub fn has_output_format(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }
}

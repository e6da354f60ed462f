mod compression;
mod encoding;
pub mod format;
mod lz4_codec;
mod passthrough;
mod reader;
mod writer;
mod zstd_codec;

pub use compression::{compressor_by_id, compressor_for, BlockCompressor};
pub use encoding::{decode_block, encode_block};
pub use lz4_codec::Lz4Compressor;
pub use passthrough::PassThroughCompressor;
pub use reader::NativeBlockInputStream;
pub use writer::NativeBlockOutputStream;
pub use zstd_codec::ZstdCompressor;

use std::io::{BufReader, BufWriter};

use native_core::{FormatFactory, NativeInputFormat, NativeOutputFormat, NATIVE_FORMAT_NAME};

/// Register the Native input and output formats under `"Native"`.
///
/// Input streams are wrapped in a `BufReader` and output streams in a
/// `BufWriter`; the output is flushed by `finalize`.
pub fn register_native(factory: &mut FormatFactory) -> anyhow::Result<()> {
    factory.register_input_format(
        NATIVE_FORMAT_NAME,
        Box::new(|reader, header, settings| {
            let stream = NativeBlockInputStream::new(BufReader::new(reader));
            Ok(Box::new(NativeInputFormat::with_settings(
                header,
                stream,
                settings.native.clone(),
            )))
        }),
    )?;
    factory.register_output_format(
        NATIVE_FORMAT_NAME,
        Box::new(|writer, headers, write_callback, settings| {
            let stream =
                NativeBlockOutputStream::with_compression(BufWriter::new(writer), settings.native.compression);
            let mut format = NativeOutputFormat::with_settings(headers, stream, settings.native.clone());
            if let Some(callback) = write_callback {
                format = format.with_write_callback(callback);
            }
            Ok(Box::new(format))
        }),
    )
}

/// A factory with the Native format already registered.
pub fn native_factory() -> anyhow::Result<FormatFactory> {
    let mut factory = FormatFactory::new();
    register_native(&mut factory)?;
    Ok(factory)
}

/// End-to-end tests: chunks pushed through `NativeOutputFormat` over the
/// Native wire codec, then pulled back through `NativeInputFormat` from the
/// same bytes.
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use native_codecs::{native_factory, NativeBlockInputStream, NativeBlockOutputStream};
use native_core::{
    Chunk, Column, CompressionMethod, DataType, FormatError, FormatSettings, Header, InputFormat,
    NativeInputFormat, NativeOutputFormat, NativeSettings, OutputFormat, PortHeaders, PortKind,
    ProgressValues, WriteCallback, NATIVE_FORMAT_NAME,
};

// ── helpers ───────────────────────────────────────────────────────────────

fn id_name_header() -> Header {
    Header::from_pairs([("id", DataType::UInt64), ("name", DataType::String)]).unwrap()
}

fn chunk(rows: &[(u64, &str)]) -> Chunk {
    Chunk::new(
        vec![
            Column::UInt64(rows.iter().map(|r| r.0).collect()),
            Column::String(rows.iter().map(|r| r.1.to_string()).collect()),
        ],
        rows.len(),
    )
}

fn trailer_settings() -> NativeSettings {
    NativeSettings {
        statistics_trailer: true,
        ..NativeSettings::default()
    }
}

/// Run one output session over an in-memory buffer and return the bytes.
fn write_session(
    settings: NativeSettings,
    f: impl FnOnce(&mut NativeOutputFormat<NativeBlockOutputStream<Vec<u8>>>),
) -> Vec<u8> {
    let stream = NativeBlockOutputStream::with_compression(Vec::new(), settings.compression);
    let mut out = NativeOutputFormat::with_settings(
        PortHeaders::uniform(id_name_header()),
        stream,
        settings,
    );
    f(&mut out);
    out.into_stream().into_inner().unwrap()
}

fn reader(bytes: Vec<u8>, settings: NativeSettings) -> NativeInputFormat<NativeBlockInputStream<Cursor<Vec<u8>>>> {
    NativeInputFormat::with_settings(id_name_header(), NativeBlockInputStream::new(Cursor::new(bytes)), settings)
}

fn drain<I: InputFormat + ?Sized>(input: &mut I) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    while let Some(c) = input.produce_next().unwrap() {
        chunks.push(c);
    }
    chunks
}

/// Concatenate chunk columns into one chunk for value comparison.
fn concat(chunks: Vec<Chunk>) -> Chunk {
    let mut rows = 0;
    let mut columns: Vec<Column> = Vec::new();
    for c in chunks {
        rows += c.num_rows();
        for (i, col) in c.detach_columns().into_iter().enumerate() {
            match columns.get_mut(i) {
                Some(acc) => acc.extend(col).unwrap(),
                None => columns.push(col),
            }
        }
    }
    Chunk::new(columns, rows)
}

/// `Write` handle over a shared buffer, for formats built by the factory.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ── tests ─────────────────────────────────────────────────────────────────

#[test]
fn two_chunks_round_trip_in_order() {
    let bytes = write_session(NativeSettings::default(), |out| {
        out.consume_main(chunk(&[(1, "a"), (2, "b")])).unwrap();
        out.consume_main(chunk(&[(3, "c")])).unwrap();
        out.finalize().unwrap();
    });

    let mut input = reader(bytes, NativeSettings::default());
    let chunks = drain(&mut input);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], chunk(&[(1, "a"), (2, "b")]));
    assert_eq!(chunks[1], chunk(&[(3, "c")]));
    assert_eq!(concat(chunks), chunk(&[(1, "a"), (2, "b"), (3, "c")]));
    assert!(input.produce_next().unwrap().is_none());
}

#[test]
fn many_blocks_round_trip_under_every_compression() {
    let methods = [
        CompressionMethod::None,
        CompressionMethod::Zstd { level: 3 },
        CompressionMethod::Lz4,
    ];
    let originals: Vec<Chunk> = (0..20u64)
        .map(|i| {
            let rows: Vec<(u64, String)> = (0..i * 7).map(|r| (i * 1000 + r, format!("row-{i}-{r}"))).collect();
            let borrowed: Vec<(u64, &str)> = rows.iter().map(|(id, s)| (*id, s.as_str())).collect();
            chunk(&borrowed)
        })
        .collect();

    for method in methods {
        let settings = NativeSettings {
            compression: method,
            ..NativeSettings::default()
        };
        let bytes = write_session(settings, |out| {
            for c in &originals {
                out.consume_main(c.clone()).unwrap();
            }
            out.finalize().unwrap();
        });

        let chunks = drain(&mut reader(bytes, NativeSettings::default()));
        // The empty first chunk still has columns, so it is written and read back.
        assert_eq!(chunks, originals, "round trip failed for {method:?}");
    }
}

#[test]
fn empty_result_is_prefix_and_suffix_only() {
    let bytes = write_session(NativeSettings::default(), |out| {
        out.finalize().unwrap();
    });
    assert_eq!(bytes.len(), native_codecs::format::PREFIX_SIZE + 1 + 9);

    let mut input = reader(bytes, NativeSettings::default());
    assert!(input.produce_next().unwrap().is_none());
    assert!(input.is_finished());
}

#[test]
fn totals_extremes_and_rows_before_limit_reach_the_reader() {
    let bytes = write_session(NativeSettings::default(), |out| {
        out.consume_main(chunk(&[(1, "a"), (2, "b")])).unwrap();
        out.consume_totals(chunk(&[(3, "sum")])).unwrap();
        out.consume_extremes(chunk(&[(1, "a"), (2, "b")])).unwrap();
        out.set_rows_before_limit(1_000);
        out.finalize().unwrap();
    });

    let mut input = reader(bytes, NativeSettings::default());
    let chunks = drain(&mut input);
    assert_eq!(chunks, vec![chunk(&[(1, "a"), (2, "b")])]);

    let totals = input.totals().unwrap();
    assert_eq!(totals.rows(), 1);
    assert_eq!(totals.column(1).unwrap().column, Column::String(vec!["sum".into()]));
    assert_eq!(input.extremes().unwrap().rows(), 2);
    assert_eq!(input.rows_before_limit(), Some(1_000));
}

#[test]
fn statistics_trailer_round_trips() {
    let bytes = write_session(trailer_settings(), |out| {
        out.consume_main(chunk(&[(1, "a")])).unwrap();
        out.on_progress(&ProgressValues::new(100, 4096));
        let handle = out.progress_handle().unwrap();
        std::thread::spawn(move || handle.increment_piecewise_atomically(&ProgressValues::new(20, 4)))
            .join()
            .unwrap();
        out.finalize().unwrap();
    });

    let mut input = reader(bytes, trailer_settings());
    let chunks = drain(&mut input);
    assert_eq!(chunks, vec![chunk(&[(1, "a")])]);

    let stats = input.statistics().unwrap();
    assert_eq!(stats.rows_read, 120);
    assert_eq!(stats.bytes_read, 4100);
    assert!(stats.elapsed_seconds >= 0.0);
}

#[test]
fn trailer_disabled_leaves_no_trailing_block() {
    let bytes = write_session(NativeSettings::default(), |out| {
        out.consume_main(chunk(&[(1, "a")])).unwrap();
        out.on_progress(&ProgressValues::new(100, 4096));
        out.finalize().unwrap();
    });

    // A reader expecting a trailer finds the end of input right after the suffix.
    let mut input = reader(bytes, trailer_settings());
    drain(&mut input);
    assert!(input.statistics().is_none());
}

#[test]
fn trailer_block_is_not_mistaken_for_data_by_a_plain_reader() {
    let bytes = write_session(trailer_settings(), |out| {
        out.consume_main(chunk(&[(1, "a")])).unwrap();
        out.finalize().unwrap();
    });

    let mut input = reader(bytes, NativeSettings::default());
    assert_eq!(drain(&mut input).len(), 1);
    // The session is over; the trailer bytes are never pulled.
    assert!(input.produce_next().unwrap().is_none());
}

#[test]
fn reading_with_a_different_header_is_a_structural_error() {
    let bytes = write_session(NativeSettings::default(), |out| {
        out.consume_main(chunk(&[(1, "a")])).unwrap();
        out.finalize().unwrap();
    });

    let other = Header::from_pairs([("id", DataType::Int64), ("name", DataType::String)]).unwrap();
    let mut input = NativeInputFormat::new(other, NativeBlockInputStream::new(Cursor::new(bytes)));
    let err = input.produce_next().unwrap_err();
    match err.downcast_ref::<FormatError>() {
        Some(FormatError::StructureMismatch {
            context,
            expected,
            actual,
        }) => {
            assert_eq!(context, "NativeInputFormat");
            assert_eq!(expected, "id Int64, name String");
            assert_eq!(actual, "id UInt64, name String");
        }
        other => panic!("expected a structure mismatch, got {other:?}"),
    }
}

#[test]
fn rejected_chunk_leaves_stream_untouched() {
    let bytes = write_session(NativeSettings::default(), |out| {
        let bad = Chunk::new(vec![Column::String(vec!["x".into()])], 1);
        assert!(out.consume_main(bad).is_err());
    });
    assert!(bytes.is_empty());
}

#[test]
fn consecutive_sessions_on_one_stream() {
    let bytes = write_session(NativeSettings::default(), |out| {
        out.consume_main(chunk(&[(1, "first")])).unwrap();
        out.finalize().unwrap();
        out.reset();
        out.consume_main(chunk(&[(2, "second")])).unwrap();
        out.consume_main(chunk(&[(3, "second")])).unwrap();
        out.finalize().unwrap();
    });

    let mut input = reader(bytes, NativeSettings::default());
    assert_eq!(drain(&mut input), vec![chunk(&[(1, "first")])]);
    input.reset_parser();
    assert_eq!(
        drain(&mut input),
        vec![chunk(&[(2, "second")]), chunk(&[(3, "second")])]
    );
    assert_eq!(input.progress().read_rows, 3);
}

#[test]
fn factory_builds_native_formats_by_name() {
    let factory = native_factory().unwrap();
    let settings = FormatSettings {
        native: NativeSettings {
            statistics_trailer: true,
            compression: CompressionMethod::Lz4,
            ..NativeSettings::default()
        },
    };

    let buffer = SharedBuffer::default();
    let written_rows = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&written_rows);
    let callback: WriteCallback = Box::new(move |rows: usize| *counter.lock().unwrap() += rows);
    let mut output = factory
        .output_format(
            NATIVE_FORMAT_NAME,
            Box::new(buffer.clone()),
            PortHeaders::uniform(id_name_header()),
            Some(callback),
            &settings,
        )
        .unwrap();
    assert_eq!(output.content_type(), "application/octet-stream");
    output.push(PortKind::Main, chunk(&[(1, "a"), (2, "b")])).unwrap();
    output.push(PortKind::Totals, chunk(&[(3, "t")])).unwrap();
    output.on_progress(&ProgressValues::new(2, 18));
    output.finalize().unwrap();
    assert_eq!(*written_rows.lock().unwrap(), 2);

    let mut input = factory
        .input_format(
            NATIVE_FORMAT_NAME,
            Box::new(Cursor::new(buffer.bytes())),
            id_name_header(),
            &settings,
        )
        .unwrap();
    assert_eq!(input.name(), "NativeInputFormat");
    let chunks = drain(&mut *input);
    assert_eq!(chunks, vec![chunk(&[(1, "a"), (2, "b")])]);
}

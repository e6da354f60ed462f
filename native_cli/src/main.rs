use std::fs::File;
use std::io::{self, BufReader, Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use native_codecs::format::MAGIC;
use native_codecs::{native_factory, NativeBlockInputStream};
use native_core::{
    BlockInputStream, Chunk, Column, ColumnDescription, CompressionMethod, DataType, FormatSettings,
    Header, InputFormat, NativeInputFormat, OutputFormat, PortHeaders, PortKind, ProgressValues,
    SessionStatistics, NATIVE_FORMAT_NAME,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "native",
    about = "Generate, dump, and inspect Native block streams",
    version
)]
struct Cli {
    /// JSON file with format settings (see FormatSettings)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic result set (id UInt64, name String, score Float64)
    Generate {
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
        /// Total number of rows
        #[arg(short, long, default_value_t = 10_000)]
        rows: u64,
        /// Rows per block
        #[arg(short, long, default_value_t = 1024)]
        block_rows: u64,
        /// Compression: none | zstd | lz4 (overrides --settings)
        #[arg(short, long)]
        compression: Option<String>,
        /// Zstd compression level (1-22, only used with --compression zstd)
        #[arg(long, default_value_t = 3)]
        zstd_level: i32,
        /// Append a statistics trailer after the suffix
        #[arg(long)]
        trailer: bool,
        /// Also write totals and extremes
        #[arg(long)]
        totals: bool,
    },
    /// Print the rows of a Native stream as tab-separated values
    Dump {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Expected schema, e.g. "id:UInt64,name:String"
        #[arg(short, long, default_value = "id:UInt64,name:String,score:Float64")]
        schema: String,
        /// Expect a statistics trailer after the suffix
        #[arg(long)]
        trailer: bool,
        /// Stop after this many rows
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Print framing information for every session in a Native stream
    Inspect {
        /// Native file to inspect
        file: PathBuf,
        /// Print per-block details
        #[arg(long)]
        blocks: bool,
        /// Print statistics trailers as JSON
        #[arg(long)]
        json: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn load_settings(path: Option<&Path>) -> anyhow::Result<FormatSettings> {
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening settings file {:?}", p))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing settings file {:?}", p))
        }
        None => Ok(FormatSettings::default()),
    }
}

fn compression_from_name(name: &str, zstd_level: i32) -> anyhow::Result<CompressionMethod> {
    match name {
        "none" | "passthrough" => Ok(CompressionMethod::None),
        "zstd" | "z" => Ok(CompressionMethod::Zstd { level: zstd_level }),
        "lz4" | "l" => Ok(CompressionMethod::Lz4),
        other => anyhow::bail!(
            "unknown compression '{}'. Valid options: none, zstd, lz4",
            other
        ),
    }
}

fn parse_schema(text: &str) -> anyhow::Result<Header> {
    let columns = text
        .split(',')
        .map(|part| {
            let (name, ty) = part
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("schema entry '{}' is not name:Type", part))?;
            Ok(ColumnDescription::new(name.trim(), ty.trim().parse::<DataType>()?))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Header::new(columns)
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn demo_chunk(start: u64, len: u64) -> Chunk {
    let ids: Vec<u64> = (start..start + len).collect();
    let names = ids.iter().map(|i| format!("row-{:08}", i)).collect();
    let scores = ids.iter().map(|i| (*i % 1000) as f64 / 10.0).collect();
    Chunk::new(
        vec![Column::UInt64(ids), Column::String(names), Column::Float64(scores)],
        len as usize,
    )
}

fn summary_chunk(id: u64, name: &str, score: f64) -> Chunk {
    Chunk::new(
        vec![
            Column::UInt64(vec![id]),
            Column::String(vec![name.to_string()]),
            Column::Float64(vec![score]),
        ],
        1,
    )
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn io::Read + Send>> {
    if path.to_str() == Some("-") {
        Ok(Box::new(io::stdin()))
    } else {
        let file = File::open(path).with_context(|| format!("opening input file {:?}", path))?;
        Ok(Box::new(file))
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_generate(
    mut settings: FormatSettings,
    output: PathBuf,
    rows: u64,
    block_rows: u64,
    compression: Option<String>,
    zstd_level: i32,
    trailer: bool,
    totals: bool,
) -> anyhow::Result<()> {
    if block_rows == 0 {
        anyhow::bail!("--block-rows must be at least 1");
    }
    if let Some(name) = compression {
        settings.native.compression = compression_from_name(&name, zstd_level)?;
    }
    settings.native.statistics_trailer |= trailer;

    let header = parse_schema("id:UInt64,name:String,score:Float64")?;
    let dst: Box<dyn Write + Send> = if output.to_str() == Some("-") {
        Box::new(io::stdout())
    } else {
        Box::new(File::create(&output).with_context(|| format!("creating output file {:?}", output))?)
    };

    let factory = native_factory()?;
    let mut format = factory.output_format(
        NATIVE_FORMAT_NAME,
        dst,
        PortHeaders::uniform(header),
        None,
        &settings,
    )?;

    let t0 = Instant::now();
    let mut written = 0u64;
    let mut blocks = 0u64;
    while written < rows {
        let len = block_rows.min(rows - written);
        let chunk = demo_chunk(written, len);
        let bytes = chunk.byte_size() as u64;
        format.push(PortKind::Main, chunk)?;
        format.on_progress(&ProgressValues::new(len, bytes));
        written += len;
        blocks += 1;
    }
    if totals && rows > 0 {
        let id_sum = rows * (rows - 1) / 2;
        format.push(PortKind::Totals, summary_chunk(id_sum, "total", 0.0))?;
        format.push(PortKind::Extremes, {
            let mut lo = demo_chunk(0, 1).detach_columns();
            let hi = demo_chunk(rows - 1, 1).detach_columns();
            for (acc, col) in lo.iter_mut().zip(hi) {
                acc.extend(col)?;
            }
            Chunk::new(lo, 2)
        })?;
    }
    format.set_rows_before_limit(rows);
    format.finalize()?;
    let elapsed = t0.elapsed();

    info!("generated {} rows in {} blocks", written, blocks);
    eprintln!("  rows        : {}", written);
    eprintln!("  blocks      : {}", blocks);
    eprintln!("  compression : {:?}", settings.native.compression);
    eprintln!("  trailer     : {}", settings.native.statistics_trailer);
    if output.to_str() != Some("-") {
        eprintln!("  file size   : {}", human_bytes(std::fs::metadata(&output)?.len()));
    }
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_dump(
    mut settings: FormatSettings,
    input: PathBuf,
    schema: &str,
    trailer: bool,
    limit: Option<u64>,
) -> anyhow::Result<()> {
    settings.native.statistics_trailer |= trailer;
    let header = parse_schema(schema)?;
    let stream = NativeBlockInputStream::new(BufReader::new(open_input(&input)?));
    let mut format = NativeInputFormat::with_settings(header.clone(), stream, settings.native);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", header.names().collect::<Vec<_>>().join("\t"))?;

    let mut printed = 0u64;
    'chunks: while let Some(chunk) = format.produce_next()? {
        for row in 0..chunk.num_rows() {
            if limit.is_some_and(|l| printed >= l) {
                break 'chunks;
            }
            let fields: Vec<String> = chunk
                .columns()
                .iter()
                .map(|c| c.value_to_string(row).unwrap_or_default())
                .collect();
            writeln!(out, "{}", fields.join("\t"))?;
            printed += 1;
        }
    }

    if format.is_finished() {
        if let Some(totals) = format.totals() {
            eprintln!("  totals      : {} row(s)", totals.rows());
        }
        if let Some(extremes) = format.extremes() {
            eprintln!("  extremes    : {} row(s)", extremes.rows());
        }
        if let Some(stats) = format.statistics() {
            eprintln!(
                "  statistics  : {} rows, {} read in {:.3}s",
                stats.rows_read,
                human_bytes(stats.bytes_read),
                stats.elapsed_seconds
            );
        }
    }
    Ok(())
}

/// What follows the current read position of an in-memory stream.
enum Next {
    End,
    Session,
    Trailer,
}

fn peek(stream: &NativeBlockInputStream<Cursor<Vec<u8>>>) -> Next {
    let cursor = stream.get_ref();
    let rest = &cursor.get_ref()[cursor.position() as usize..];
    if rest.is_empty() {
        Next::End
    } else if rest.starts_with(MAGIC) {
        Next::Session
    } else {
        Next::Trailer
    }
}

/// Walks sessions with the raw codec so any schema can be inspected.
fn run_inspect(file: PathBuf, show_blocks: bool, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {:?}", file))?;
    println!("=== Native stream: {:?} ({}) ===", file, human_bytes(bytes.len() as u64));
    let mut stream = NativeBlockInputStream::new(Cursor::new(bytes));

    let mut session = 0;
    loop {
        stream.read_prefix()?;
        let mut blocks = 0u64;
        let mut rows = 0u64;
        let mut schema = None;
        while let Some(block) = stream.read()? {
            if show_blocks {
                println!("    block {:>6}: {:>8} rows  [{}]", blocks, block.rows(), block.header());
            }
            schema.get_or_insert_with(|| block.header());
            blocks += 1;
            rows += block.rows() as u64;
        }
        stream.read_suffix()?;

        println!();
        println!("  session {}", session);
        if let Some(schema) = &schema {
            println!("    schema            : {}", schema);
        }
        println!("    blocks            : {}", blocks);
        println!("    rows              : {}", rows);
        if let Some(t) = stream.totals() {
            println!("    totals            : {} row(s)", t.rows());
        }
        if let Some(e) = stream.extremes() {
            println!("    extremes          : {} row(s)", e.rows());
        }
        if let Some(r) = stream.rows_before_limit() {
            println!("    rows before limit : {}", r);
        }

        if let Next::Trailer = peek(&stream) {
            match stream.read()? {
                Some(block) if SessionStatistics::is_statistics_block(&block) => {
                    let stats = SessionStatistics::from_block(&block)?;
                    if json {
                        println!("    statistics        : {}", serde_json::to_string(&stats)?);
                    } else {
                        println!(
                            "    statistics        : {} rows, {} read, {:.3}s",
                            stats.rows_read,
                            human_bytes(stats.bytes_read),
                            stats.elapsed_seconds
                        );
                    }
                }
                _ => anyhow::bail!("unexpected data after suffix of session {}", session),
            }
        }

        match peek(&stream) {
            Next::End => break,
            Next::Session => stream.reset_parser(),
            Next::Trailer => anyhow::bail!("unexpected data after session {}", session),
        }
        session += 1;
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    match cli.command {
        Commands::Generate {
            output,
            rows,
            block_rows,
            compression,
            zstd_level,
            trailer,
            totals,
        } => run_generate(
            settings,
            output,
            rows,
            block_rows,
            compression,
            zstd_level,
            trailer,
            totals,
        ),
        Commands::Dump {
            input,
            schema,
            trailer,
            limit,
        } => run_dump(settings, input, &schema, trailer, limit),
        Commands::Inspect { file, blocks, json } => run_inspect(file, blocks, json),
    }
}

mod config;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use config::ScanConfig;
use didlscan_core::{BrowseResult, ByteSource, DidlRecord, FileType, RecordCollector, ScanError};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use stream_scan::{
    read_response_head, scan_capabilities, scan_description, BodyFraming, Capability, ChunkDecoder,
    EntityUnescaper, ParentIdPolicy, ReaderSource, ResponseKind, ResponseScanner, ScanStats,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Reply types the dump tool understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReplyKind {
    Browse,
    Search,
    Description,
    SearchCaps,
    SortCaps,
}

/// Extract records from saved MediaServer replies and print them as JSON
#[derive(Parser, Debug)]
#[command(name = "didlscan", version, about)]
struct Args {
    /// What kind of reply the input holds
    #[arg(value_enum)]
    kind: ReplyKind,

    /// Reply file, read from stdin when omitted
    input: Option<PathBuf>,

    /// Object id that was browsed, enables the parentID check
    #[arg(long)]
    parent: Option<String>,

    /// URL the description was fetched from, used to resolve the control URL
    #[arg(long, default_value = "http://localhost/")]
    location: String,

    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input is a bare body without status line and headers
    #[arg(long)]
    raw: bool,

    /// Bare body is chunk framed
    #[arg(long, requires = "raw")]
    chunked: bool,

    /// Only print items of this file type (containers are always printed)
    #[arg(long)]
    only: Option<FileType>,

    /// Skip elements whose parentID differs from --parent
    #[arg(long)]
    strict: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Collector that drops items of other file types
struct FilteredCollector {
    result: BrowseResult,
    only: Option<FileType>,
    filtered: usize,
}

impl FilteredCollector {
    fn new(only: Option<FileType>) -> Self {
        Self {
            result: BrowseResult::new(),
            only,
            filtered: 0,
        }
    }
}

impl RecordCollector for FilteredCollector {
    fn collect(&mut self, record: DidlRecord) {
        match (&record, self.only) {
            (DidlRecord::Item(item), Some(wanted)) if item.file_type != wanted => self.filtered += 1,
            _ => self.result.collect(record),
        }
    }

    fn announce(&mut self, number_returned: u32) {
        self.result.announce(number_returned);
    }

    fn reject(&mut self) {
        self.result.reject();
    }
}

#[derive(Serialize)]
struct ScanReport {
    stats: ScanStats,
    filtered: usize,
    /// Framing error that cut the scan short; the records are partial when set
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    result: BrowseResult,
}

type InputSource = ReaderSource<Box<dyn BufRead>>;

fn open_input(args: &Args) -> Result<InputSource> {
    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };
    Ok(ReaderSource::new(reader))
}

fn body_framing(args: &Args, source: &mut InputSource) -> Result<BodyFraming> {
    if args.raw {
        return Ok(if args.chunked {
            BodyFraming::Chunked
        } else {
            BodyFraming::UntilClose
        });
    }
    read_response_head(source).context("Failed to read the response head")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Scan a Browse/Search body. A framing error still yields the partial report
/// and is handed back next to it; any other error fails the scan.
fn run_scan(
    args: &Args,
    config: &ScanConfig,
    kind: ResponseKind,
    body: ChunkDecoder<InputSource>,
) -> Result<(ScanReport, Option<ScanError>)> {
    let mut policy = config.policy.clone();
    if args.strict {
        policy.parent_id = ParentIdPolicy::Strict;
    }

    let mut source: Box<dyn ByteSource> = if config.unescape() {
        Box::new(EntityUnescaper::new(body))
    } else {
        Box::new(body)
    };

    let mut collector = FilteredCollector::new(args.only);
    let expected_parent = match kind {
        ResponseKind::Browse => args.parent.as_deref(),
        ResponseKind::Search => None,
    };
    let mut scanner = ResponseScanner::new(kind, expected_parent, policy);

    let (stats, framing_error) = match scanner.scan(&mut source, &mut collector) {
        Ok(stats) => (stats, None),
        // keep what was extracted before the body broke off
        Err(e) if e.is_framing() => {
            tracing::warn!("Body framing error, output is partial: {}", e);
            (scanner.stats(), Some(e))
        }
        Err(e) => return Err(e).context("Failed to scan the reply"),
    };

    if collector.filtered > 0 {
        tracing::debug!("{} items filtered by file type", collector.filtered);
    }

    let report = ScanReport {
        stats,
        filtered: collector.filtered,
        error: framing_error.as_ref().map(ToString::to_string),
        result: collector.result,
    };
    Ok((report, framing_error))
}

/// Print the report, then fail if the body was cut short so the exit code is non-zero
fn scan_records(args: &Args, config: &ScanConfig, kind: ResponseKind, body: ChunkDecoder<InputSource>) -> Result<()> {
    let (report, framing_error) = run_scan(args, config, kind, body)?;
    print_json(&report, args.pretty)?;
    match framing_error {
        Some(e) => Err(e).context("Reply body is malformed, printed records are partial"),
        None => Ok(()),
    }
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,didlscan=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let config = ScanConfig::resolve(args.config.as_deref())?;
    tracing::debug!("Scan config: {:?}", config);

    let mut source = open_input(&args)?;
    let framing = body_framing(&args, &mut source)?;
    let mut body = ChunkDecoder::new(source, framing);

    match args.kind {
        ReplyKind::Browse => scan_records(&args, &config, ResponseKind::Browse, body),
        ReplyKind::Search => scan_records(&args, &config, ResponseKind::Search, body),
        ReplyKind::Description => {
            let server = scan_description(&mut body, &args.location).context("Failed to scan the description")?;
            if server.is_none() {
                tracing::info!("No browsable media server in {}", args.location);
            }
            print_json(&server, args.pretty)
        }
        ReplyKind::SearchCaps | ReplyKind::SortCaps => {
            let capability = if args.kind == ReplyKind::SearchCaps {
                Capability::Search
            } else {
                Capability::Sort
            };
            let caps = scan_capabilities(&mut body, capability).context("Failed to scan the capabilities")?;
            print_json(&caps, args.pretty)
        }
    }
}

//! Runtime configuration.
//!
//! Settings are layered: command-line flags win over `BREAKERWATCH_*`
//! environment variables, which win over the optional config file, which
//! wins over the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use breakerwatch_hystrix::{Decoder, Framing, Normalizer, Projector, UnknownFields, DEFAULT_WINDOW};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::duration::parse_duration;
use crate::pipeline::{
    Pipeline, DEFAULT_DRAIN_TIMEOUT, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_QUEUE_CAPACITY,
};
use crate::sink::Output;
use crate::source::Source;

/// Prefix for environment overrides, e.g. `BREAKERWATCH_WINDOW=5s`.
pub const ENV_PREFIX: &str = "BREAKERWATCH";

/// Default connect timeout for network sources.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug, Default)]
#[command(name = "breakerwatch")]
#[command(about = "Normalize a hystrix.stream SSE feed into circuit-breaker status records")]
pub struct Args {
    /// HTTP SSE endpoint, e.g. http://localhost:8080/hystrix.stream
    #[arg(short, long, conflicts_with_all = ["connect", "file"])]
    pub url: Option<String>,

    /// Read raw SSE text from a TCP endpoint (host:port)
    #[arg(short, long, conflicts_with_all = ["url", "file"])]
    pub connect: Option<String>,

    /// Replay a captured stream from a file ("-" for stdin)
    #[arg(short, long, conflicts_with_all = ["url", "connect"])]
    pub file: Option<PathBuf>,

    /// Append records to this file instead of stdout
    #[arg(short, long, conflicts_with = "output_tcp")]
    pub output: Option<PathBuf>,

    /// Send records to a TCP endpoint (host:port)
    #[arg(long, conflicts_with = "output")]
    pub output_tcp: Option<String>,

    /// Config file (TOML, YAML or JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Rolling window reported with every record (e.g. "10s")
    #[arg(short, long)]
    pub window: Option<String>,

    /// Records buffered between reader and writer
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// How often the output is flushed (e.g. "1s", "250ms")
    #[arg(long)]
    pub flush_interval: Option<String>,

    /// Time allowed to write queued records on shutdown
    #[arg(long)]
    pub drain_timeout: Option<String>,

    /// Connect timeout for --url and --connect
    #[arg(long)]
    pub connect_timeout: Option<String>,

    /// Longest accepted source line in bytes; longer lines are skipped
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Payload starts one character after "data: "
    #[arg(long)]
    pub legacy_framing: bool,

    /// Skip events that carry unrecognized fields
    #[arg(long)]
    pub strict: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Settings read from the config file and environment.
///
/// Every field is optional; missing ones fall through to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub url: Option<String>,
    pub connect: Option<String>,
    pub file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_tcp: Option<String>,
    pub window: Option<String>,
    pub queue_capacity: Option<usize>,
    pub flush_interval: Option<String>,
    pub drain_timeout: Option<String>,
    pub connect_timeout: Option<String>,
    pub max_line_length: Option<usize>,
    pub framing: Option<Framing>,
    pub unknown_fields: Option<UnknownFields>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Load the config file (if any) overlaid with `BREAKERWATCH_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_with(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(environment)
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}

/// Fully resolved settings for one relay run.
#[derive(Debug)]
pub struct RelayConfig {
    pub source: Source,
    pub output: Output,
    pub window: Duration,
    pub queue_capacity: usize,
    pub flush_interval: Duration,
    pub drain_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_line_length: usize,
    pub framing: Framing,
    pub unknown_fields: UnknownFields,
    pub log_level: String,
}

impl RelayConfig {
    /// Load the config file named by `args` and resolve against it.
    pub fn load(args: &Args) -> Result<Self> {
        let file = FileConfig::load(args.config.as_deref())?;
        Self::resolve(args, file)
    }

    /// Merge flags over file settings over defaults, and validate.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let cli_source = source_from(args.url.clone(), args.connect.clone(), args.file.clone())?;
        let file_source = source_from(file.url, file.connect, file.file)?;
        let source = cli_source.or(file_source).unwrap_or(Source::Stdin);

        let cli_output = output_from(args.output.clone(), args.output_tcp.clone())?;
        let file_output = output_from(file.output, file.output_tcp)?;
        let output = cli_output.or(file_output).unwrap_or(Output::Stdout);

        let window = duration_setting(
            "window",
            args.window.as_deref().or(file.window.as_deref()),
            DEFAULT_WINDOW,
        )?;
        let flush_interval = duration_setting(
            "flush_interval",
            args.flush_interval.as_deref().or(file.flush_interval.as_deref()),
            DEFAULT_FLUSH_INTERVAL,
        )?;
        let drain_timeout = duration_setting(
            "drain_timeout",
            args.drain_timeout.as_deref().or(file.drain_timeout.as_deref()),
            DEFAULT_DRAIN_TIMEOUT,
        )?;
        let connect_timeout = duration_setting(
            "connect_timeout",
            args.connect_timeout.as_deref().or(file.connect_timeout.as_deref()),
            DEFAULT_CONNECT_TIMEOUT,
        )?;

        let queue_capacity = args
            .queue_capacity
            .or(file.queue_capacity)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 {
            bail!("queue_capacity must be at least 1");
        }
        let max_line_length = args
            .max_line_length
            .or(file.max_line_length)
            .unwrap_or(DEFAULT_MAX_LINE_LENGTH);
        if max_line_length == 0 {
            bail!("max_line_length must be at least 1");
        }
        if flush_interval.is_zero() {
            bail!("flush_interval must be greater than zero");
        }

        let framing = if args.legacy_framing {
            Framing::Legacy
        } else {
            file.framing.unwrap_or_default()
        };
        let unknown_fields = if args.strict {
            UnknownFields::Reject
        } else {
            file.unknown_fields.unwrap_or_default()
        };

        let log_level = args
            .log_level
            .clone()
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(RelayConfig {
            source,
            output,
            window,
            queue_capacity,
            flush_interval,
            drain_timeout,
            connect_timeout,
            max_line_length,
            framing,
            unknown_fields,
            log_level,
        })
    }

    /// The per-line transform these settings describe.
    pub fn normalizer(&self) -> Normalizer {
        let decoder = Decoder::new()
            .framing(self.framing)
            .unknown_fields(self.unknown_fields);
        Normalizer::new(decoder, Projector::new(self.window))
    }

    /// The pipeline these settings describe.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::builder()
            .normalizer(self.normalizer())
            .queue_capacity(self.queue_capacity)
            .flush_interval(self.flush_interval)
            .drain_timeout(self.drain_timeout)
            .max_line_length(self.max_line_length)
            .build()
    }
}

fn source_from(
    url: Option<String>,
    connect: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<Source>> {
    match (url, connect, file) {
        (None, None, None) => Ok(None),
        (Some(url), None, None) => Ok(Some(Source::Http(url))),
        (None, Some(addr), None) => Ok(Some(Source::Tcp(addr))),
        (None, None, Some(path)) if path == Path::new("-") => Ok(Some(Source::Stdin)),
        (None, None, Some(path)) => Ok(Some(Source::File(path))),
        _ => bail!("Only one of url, connect and file may be set"),
    }
}

fn output_from(file: Option<PathBuf>, tcp: Option<String>) -> Result<Option<Output>> {
    match (file, tcp) {
        (None, None) => Ok(None),
        (Some(path), None) if path == Path::new("-") => Ok(Some(Output::Stdout)),
        (Some(path), None) => Ok(Some(Output::File(path))),
        (None, Some(addr)) => Ok(Some(Output::Tcp(addr))),
        (Some(_), Some(_)) => bail!("Only one of output and output_tcp may be set"),
    }
}

fn duration_setting(name: &str, value: Option<&str>, default: Duration) -> Result<Duration> {
    match value {
        Some(s) => parse_duration(s).with_context(|| format!("Invalid {}: {:?}", name, s)),
        None => Ok(default),
    }
}

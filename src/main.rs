use anyhow::{Context, Result};
use clap::Parser;
use gctrace2csv::{
    Config, Converter, CsvWriter, Scanner, config::LogSettings,
    gc_trace_formats,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

/// Convert Go gctrace output into CSV.
///
/// Usage1: gctrace2csv -i gc.log -o gc.csv
/// Usage2: GODEBUG=gctrace=1 your-go-program 2>&1 | gctrace2csv -o gc.csv
#[derive(Parser, Debug)]
#[command(name = "gctrace2csv", version, about, verbatim_doc_comment)]
struct Cli {
    /// The input file (default: standard input)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// The output file
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Add timestamp at line head (default: only for standard input)
    #[arg(short = 't', long = "timestamp")]
    timestamp: Option<bool>,

    /// Buffer output until the end (default: only for file input)
    #[arg(long = "buffered")]
    buffered: Option<bool>,

    /// Capacity of the queue between scanning and writing
    #[arg(long = "queue-size")]
    queue_size: Option<usize>,

    /// Fractional digits of the timestamp column
    #[arg(long = "precision")]
    precision: Option<usize>,

    /// Scan and write on a single thread
    #[arg(long = "sync")]
    sync: bool,

    /// Load options from a TOML file; flags override it
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// List the built-in gctrace formats and exit
    #[arg(long = "list-formats")]
    list_formats: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if self.input.is_some() {
            config.input = self.input;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        if self.timestamp.is_some() {
            config.timestamp = self.timestamp;
        }
        if self.buffered.is_some() {
            config.buffered = self.buffered;
        }
        if let Some(queue_size) = self.queue_size {
            config.queue_size = queue_size;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        if let Some(level) = self.log_level {
            config.log = LogSettings { level, ..config.log };
        }
        config.sync |= self.sync;

        config.validate()?;
        Ok(config)
    }
}

fn open_input(config: &Config) -> Result<Box<dyn BufRead + Send>> {
    match &config.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("无法打开输入文件 {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_output(config: &Config) -> Result<File> {
    // validate 已经保证 output 存在
    let path = config.output.as_ref().context("缺少输出文件参数")?;
    File::create(path)
        .with_context(|| format!("无法创建输出文件 {}", path.display()))
}

fn list_formats() {
    for format in gc_trace_formats() {
        println!("{}: {}", format.name(), format.header().join(","));
    }
}

fn run(config: &Config) -> Result<()> {
    let reader = open_input(config)?;
    let output = open_output(config)?;

    let writer = CsvWriter::new(output)
        .with_timestamp(config.timestamp_enabled())
        .with_precision(config.precision);
    // 内置格式的版本特征互不相容
    let scanner =
        Scanner::new(reader, gc_trace_formats()).with_disjoint_formats(true);
    let mut converter = Converter::new(scanner, writer)
        .with_queue_size(config.queue_size)
        .buffered(config.is_buffered());

    if config.sync {
        converter.convert_sync()?;
    } else {
        converter.convert()?;
    }

    converter.into_writer().into_inner()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.list_formats {
        list_formats();
        return Ok(());
    }

    let config = cli.into_config()?;

    #[cfg(feature = "logging")]
    let _guard = gctrace2csv::logging::init_logging(
        gctrace2csv::logging::LogConfig::from_settings(&config.log)?,
    )?;

    run(&config)
}

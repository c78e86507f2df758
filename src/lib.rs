//! 将 Go 运行时的 gctrace 输出转换为 CSV 表格
//!
//! ```rust
//! use gctrace2csv::{Converter, CsvWriter, Scanner, gc_trace_formats};
//! use std::io::Cursor;
//!
//! let input = "gc14(2): 1+1+0 ms 10 -> 5 MB 58439 -> 8912 (573381-564469) objects 184 handoff\n";
//! let scanner = Scanner::new(Cursor::new(input), gc_trace_formats());
//! let mut converter = Converter::new(scanner, CsvWriter::new(Vec::new()));
//! converter.convert().unwrap();
//!
//! let writer = converter.into_writer();
//! let csv = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert!(csv.ends_with("14,2,1,1,0,10,5,58439,8912,573381,564469,184\n"));
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod format;
#[cfg(feature = "logging")]
pub mod logging;
pub mod scanner;
pub mod writer;

pub use config::Config;
pub use converter::Converter;
pub use error::{ConvertError, Result};
pub use format::{Format, find_format, gc_trace_formats};
pub use scanner::{Log, ScanStats, Scanner};
pub use writer::{CsvWriter, LogWriter, WriteStats, fmt_frac};

//! 记录输出
//!
//! [`LogWriter`] 是转换器写入端的统一接口，[`CsvWriter`] 是默认实现：第一条记录
//! 决定表头，之后每条记录输出一行。CSV 的转义与引号处理交给 `csv` crate。

use crate::error::{ConvertError, Result};
use crate::scanner::Log;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::time::{Duration, Instant};

/// 时间戳列的列名
pub const TIMESTAMP_COLUMN: &str = "unixtime";

/// 默认小数位数
pub const DEFAULT_PRECISION: usize = 6;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// 写入统计信息
#[derive(Debug, Default, Clone)]
pub struct WriteStats {
    /// 已写入的记录数
    pub written_records: usize,
    /// 写入开始时间
    pub start_time: Option<Instant>,
    /// 写入完成时间
    pub end_time: Option<Instant>,
}

impl WriteStats {
    /// 创建新的统计信息，记录开始时间
    pub fn new() -> Self {
        Self { start_time: Some(Instant::now()), ..Default::default() }
    }

    /// 标记写入完成，记录结束时间
    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// 计算写入持续时间
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// 计算每秒写入记录数
    pub fn records_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            if d.as_secs_f64() > 0.0 {
                self.written_records as f64 / d.as_secs_f64()
            } else {
                0.0
            }
        })
    }
}

/// 记录写入端的统一接口
pub trait LogWriter: Send {
    /// 写入端名称
    fn name(&self) -> &str;

    /// 写入单条记录
    fn write_log(&mut self, log: &Log<'_>) -> Result<()>;

    /// 刷新缓冲区
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 获取写入统计信息
    fn stats(&self) -> WriteStats {
        WriteStats::default()
    }
}

impl<T: LogWriter + ?Sized> LogWriter for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_log(&mut self, log: &Log<'_>) -> Result<()> {
        (**self).write_log(log)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn stats(&self) -> WriteStats {
        (**self).stats()
    }
}

impl<T: LogWriter + ?Sized> LogWriter for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_log(&mut self, log: &Log<'_>) -> Result<()> {
        (**self).write_log(log)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn stats(&self) -> WriteStats {
        (**self).stats()
    }
}

/// CSV 写入器
///
/// 表头只在第一次写入时根据该记录的格式生成，之后即使格式变化也不会重写表头，
/// 后续行按各自格式的列数输出。
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    timestamp: bool,
    precision: usize,
    wrote_header: bool,
    stats: WriteStats,
}

impl<W: Write> CsvWriter<W> {
    /// 创建不带时间戳列的 CSV 写入器
    pub fn new(inner: W) -> Self {
        // 混合格式的流会产生列数不同的行
        let writer =
            csv::WriterBuilder::new().flexible(true).from_writer(inner);

        Self {
            writer,
            timestamp: false,
            precision: DEFAULT_PRECISION,
            wrote_header: false,
            stats: WriteStats::new(),
        }
    }

    /// 是否在每行前加上 unix 时间戳列
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 时间戳的小数位数
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// 是否已经写出表头
    pub fn wrote_header(&self) -> bool {
        self.wrote_header
    }

    /// 底层输出的引用
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// 刷新并取回底层输出
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| ConvertError::write_error(e.into_error()))
    }

    fn write_header(&mut self, log: &Log<'_>) -> Result<()> {
        let header = log.format.header().iter().map(String::as_str);
        if self.timestamp {
            self.writer
                .write_record(std::iter::once(TIMESTAMP_COLUMN).chain(header))?;
        } else {
            self.writer.write_record(header)?;
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            "写入表头，格式: {}，列数: {}",
            log.format.name(),
            log.format.columns()
        );

        Ok(())
    }

    fn write_fields(&mut self, log: &Log<'_>) -> Result<()> {
        let fields = log.fields.iter().map(String::as_str);
        if self.timestamp {
            let ts = fmt_frac(&log.timestamp, self.precision);
            self.writer
                .write_record(std::iter::once(ts.as_str()).chain(fields))?;
        } else {
            self.writer.write_record(fields)?;
        }
        Ok(())
    }
}

impl<W: Write + Send> LogWriter for CsvWriter<W> {
    fn name(&self) -> &str {
        "CSV"
    }

    fn write_log(&mut self, log: &Log<'_>) -> Result<()> {
        if !self.wrote_header {
            self.write_header(log)?;
            self.wrote_header = true;
        }

        self.write_fields(log)?;
        self.stats.written_records += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(ConvertError::write_error)?;
        self.stats.finish();
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        self.stats.clone()
    }
}

/// 将时间格式化为带小数的 unix 秒数
///
/// 使用整数运算，按四舍五入（远离零）保留 `precision` 位小数。`precision` 为 0
/// 时不输出小数点，超过 9 位的部分补零。
pub fn fmt_frac(t: &DateTime<Utc>, precision: usize) -> String {
    let total = i128::from(t.timestamp()) * NANOS_PER_SEC
        + i128::from(t.timestamp_subsec_nanos());
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.unsigned_abs();

    let digits = precision.min(9) as u32;
    let scale = 10u128.pow(9 - digits);
    let rounded = (abs + scale / 2) / scale;

    if digits == 0 {
        return format!("{sign}{rounded}");
    }

    let unit = 10u128.pow(digits);
    let mut out = format!(
        "{sign}{}.{:0width$}",
        rounded / unit,
        rounded % unit,
        width = digits as usize
    );
    if precision > 9 {
        out.push_str(&"0".repeat(precision - 9));
    }
    out
}

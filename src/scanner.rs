//! 按行扫描 gctrace 输出并匹配格式
//!
//! [`Scanner`] 从任意 `BufRead` 中逐行读取，返回第一条能被注册表识别的记录，
//! 不能识别的行直接跳过。读取失败时错误被锁存，之后不再产生任何记录。
//!
//! ## 粘性匹配
//!
//! 同一进程输出的 gctrace 行几乎总是同一种格式，因此扫描器记住上一次成功匹配的
//! 格式并优先尝试。命中时只需确认注册顺序在它之前的格式都不匹配，排在它之后的
//! 格式不会再被尝试，这样选中的格式与完整的顺序查找结果总是一致的。
//!
//! 如果注册表中任意一行最多只能匹配一个格式，可以用
//! [`Scanner::with_disjoint_formats`] 声明，此时粘性格式命中即返回，每行只需
//! 一次正则匹配。

use crate::error::ConvertError;
use crate::format::Format;
use chrono::{DateTime, Utc};
use std::io::{self, BufRead};

/// 一条解析后的日志记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log<'f> {
    /// 读入该行时的系统时间
    pub timestamp: DateTime<Utc>,
    /// 匹配到的格式
    pub format: &'f Format,
    /// 捕获组原文，顺序与表头一致
    pub fields: Vec<String>,
}

impl<'f> Log<'f> {
    pub fn new(
        timestamp: DateTime<Utc>,
        format: &'f Format,
        fields: Vec<String>,
    ) -> Self {
        Self { timestamp, format, fields }
    }
}

/// 扫描统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// 读取的行数
    pub lines: usize,
    /// 匹配成功的行数
    pub matched: usize,
    /// 未匹配被丢弃的行数
    pub skipped: usize,
}

/// gctrace 行扫描器
pub struct Scanner<'f, R> {
    reader: R,
    formats: &'f [Format],
    buf: Vec<u8>,
    sticky: Option<usize>,
    disjoint: bool,
    err: Option<io::Error>,
    failed: bool,
    stats: ScanStats,
}

impl<'f, R: BufRead> Scanner<'f, R> {
    /// 使用给定的格式注册表创建扫描器
    pub fn new(reader: R, formats: &'f [Format]) -> Self {
        Self {
            reader,
            formats,
            buf: Vec::new(),
            sticky: None,
            disjoint: false,
            err: None,
            failed: false,
            stats: ScanStats::default(),
        }
    }

    /// 声明注册表中的格式两两互斥
    ///
    /// 粘性格式命中时不再复查排在它之前的格式。格式确实互斥时结果不变。
    pub fn with_disjoint_formats(mut self, disjoint: bool) -> Self {
        self.disjoint = disjoint;
        self
    }

    /// 读取直到下一条可识别的记录
    ///
    /// 输入结束或读取失败时返回 `None`；失败原因通过 [`Scanner::err`] 获取。
    pub fn scan_log(&mut self) -> Option<Log<'f>> {
        if self.failed {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    #[cfg(feature = "logging")]
                    tracing::warn!(
                        "读取第 {} 行后出错: {}",
                        self.stats.lines,
                        e
                    );
                    self.err = Some(e);
                    self.failed = true;
                    return None;
                }
            }

            let now = Utc::now();
            self.stats.lines += 1;

            let line = String::from_utf8_lossy(trim_line_end(&self.buf));
            if let Some((format, fields)) =
                match_line(self.formats, &mut self.sticky, self.disjoint, &line)
            {
                debug_assert_eq!(fields.len(), format.columns());
                self.stats.matched += 1;
                return Some(Log::new(now, format, fields));
            }

            self.stats.skipped += 1;
            #[cfg(feature = "logging")]
            tracing::trace!("第 {} 行未匹配任何格式: {}", self.stats.lines, line);
        }
    }
}

impl<'f, R> Scanner<'f, R> {
    /// 锁存的读取错误
    pub fn err(&self) -> Option<&io::Error> {
        self.err.as_ref()
    }

    /// 取出锁存的读取错误并包装为 [`ConvertError::Read`]
    ///
    /// 取出后扫描器仍然保持结束状态，不会再读取输入。
    pub fn take_err(&mut self) -> Option<ConvertError> {
        self.err.take().map(ConvertError::read_error)
    }

    /// 是否因读取失败而终止
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_disjoint(&self) -> bool {
        self.disjoint
    }

    /// 当前粘性格式
    pub fn sticky_format(&self) -> Option<&'f Format> {
        self.sticky.map(|idx| &self.formats[idx])
    }

    /// 扫描统计
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// 格式注册表
    pub fn formats(&self) -> &'f [Format] {
        self.formats
    }

    /// 取回底层读取器
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<'f, R: BufRead> Iterator for Scanner<'f, R> {
    type Item = Log<'f>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan_log()
    }
}

/// 粘性匹配，选中的格式总是与按注册顺序查找的结果一致
fn match_line<'f>(
    formats: &'f [Format],
    sticky: &mut Option<usize>,
    disjoint: bool,
    line: &str,
) -> Option<(&'f Format, Vec<String>)> {
    if let Some(idx) = *sticky {
        if let Some(fields) = formats[idx].captures(line) {
            if disjoint {
                return Some((&formats[idx], fields));
            }
            return match first_match(&formats[..idx], line) {
                Some((earlier, fields)) => {
                    *sticky = Some(earlier);
                    Some((&formats[earlier], fields))
                }
                None => Some((&formats[idx], fields)),
            };
        }
    }

    let (idx, fields) = first_match(formats, line)?;
    #[cfg(feature = "logging")]
    {
        if *sticky != Some(idx) {
            tracing::debug!("切换到格式 {}", formats[idx].name());
        }
    }
    *sticky = Some(idx);
    Some((&formats[idx], fields))
}

fn first_match(formats: &[Format], line: &str) -> Option<(usize, Vec<String>)> {
    formats
        .iter()
        .enumerate()
        .find_map(|(idx, f)| f.captures(line).map(|fields| (idx, fields)))
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

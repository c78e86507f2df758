//! gctrace 行格式注册表
//!
//! 每个 [`Format`] 由名称、CSV 表头和带捕获组的正则组成。内置注册表按 Go 版本
//! 由旧到新排列，顺序即匹配优先级：多个格式都能匹配同一行时，注册顺序靠前者胜出。
//!
//! ```rust
//! use gctrace2csv::format::gc_trace_formats;
//!
//! let line = "gc14(2): 1+1+0 ms 10 -> 5 MB 58439 -> 8912 (573381-564469) objects 184 handoff";
//! let format = &gc_trace_formats()[0];
//! let fields = format.captures(line).unwrap();
//! assert_eq!(fields.join(","), "14,2,1,1,0,10,5,58439,8912,573381,564469,184");
//! ```

use crate::error::{ConvertError, Result};
use lazy_static::lazy_static;
use regex::Regex;

/// 一种日志行格式
#[derive(Debug, Clone)]
pub struct Format {
    name: String,
    header: Vec<String>,
    pattern: Regex,
}

impl Format {
    /// 编译正则并创建格式
    ///
    /// `header` 为逗号分隔的列名，列数必须等于正则的捕获组数，否则返回
    /// [`ConvertError::Format`]。
    pub fn new(name: &str, header: &str, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)?;
        let header: Vec<String> =
            header.split(',').map(|c| c.trim().to_string()).collect();

        // captures_len 包含隐式的第 0 组
        let groups = pattern.captures_len() - 1;
        if header.len() != groups {
            return Err(ConvertError::format_error(
                name,
                format!("表头有 {} 列，正则有 {} 个捕获组", header.len(), groups),
            ));
        }

        Ok(Self { name: name.to_string(), header, pattern })
    }

    /// 格式名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 表头列名
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// 列数（等于捕获组数）
    pub fn columns(&self) -> usize {
        self.header.len()
    }

    /// 行匹配正则
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// 判断行是否匹配
    pub fn is_match(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    /// 匹配一行并按顺序返回所有捕获组的原始文本
    ///
    /// 未参与匹配的捕获组返回空字符串，因此成功时结果长度总是等于 `columns()`。
    pub fn captures(&self, line: &str) -> Option<Vec<String>> {
        let caps = self.pattern.captures(line)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.header == other.header
            && self.pattern.as_str() == other.pattern.as_str()
    }
}

impl Eq for Format {}

fn builtin(name: &str, header: &str, pattern: &str) -> Format {
    Format::new(name, header, pattern)
        .unwrap_or_else(|e| panic!("内置格式 {name} 不合法: {e}"))
}

lazy_static! {
    /// 内置 gctrace 格式，按匹配优先级排列
    static ref GC_TRACE_FORMATS: Vec<Format> = vec![
        builtin(
            "Go 1.0",
            "numgc,nproc,mark,sweep,cleanup,heap0,heap1,obj0,obj1,nmalloc,nfree,nhandoff",
            r"gc(\d+)\((\d+)\): (\d+)\+(\d+)\+(\d+) \w+ (\d+) -> (\d+) \w+ (\d+) -> (\d+) \((\d+)-(\d+)\) objects (\d+) handoff",
        ),
        // Go 1.2 的输出与 1.1 相同
        builtin(
            "Go 1.1",
            "numgc,nproc,mark,sweep,cleanup,heap0,heap1,obj0,obj1,nmalloc,nfree,nhandoff,nhandoffcnt,nsteal,nstealcnt,nprocyield,nosyield,nsleep",
            r"gc(\d+)\((\d+)\): (\d+)\+(\d+)\+(\d+) \w+, (\d+) -> (\d+) \w+ (\d+) -> (\d+) \((\d+)-(\d+)\) objects, (\d+)\((\d+)\) handoff, (\d+)\((\d+)\) steal, (\d+)/(\d+)/(\d+) yields",
        ),
        builtin(
            "Go 1.3",
            "numgc,nproc,seq,sweep,mark,wait,heap0,heap1,obj,nmalloc,nfree,nspan,nbgsweep,npausesweep,nhandoff,nhandoffcnt,nsteal,nstealcnt,nprocyield,nosyield,nsleep",
            r"gc(\d+)\((\d+)\): (\d+)\+(\d+)\+(\d+)\+(\d+) \w+, (\d+) -> (\d+) \w+, (\d+) \((\d+)-(\d+)\) objects, (\d+)/(\d+)/(\d+) sweeps, (\d+)\((\d+)\) handoff, (\d+)\((\d+)\) steal, (\d+)/(\d+)/(\d+) yields",
        ),
        builtin(
            "Go 1.4",
            "numgc,nproc,seq,sweep,mark,wait,heap0,heap1,obj,nmalloc,nfree,goroutines,nspan,nbgsweep,npausesweep,nhandoff,nhandoffcnt,nsteal,nstealcnt,nprocyield,nosyield,nsleep",
            r"gc(\d+)\((\d+)\): (\d+)\+(\d+)\+(\d+)\+(\d+) \w+, (\d+) -> (\d+) \w+, (\d+) \((\d+)-(\d+)\) objects, (\d+) goroutines, (\d+)/(\d+)/(\d+) sweeps, (\d+)\((\d+)\) handoff, (\d+)\((\d+)\) steal, (\d+)/(\d+)/(\d+) yields",
        ),
    ];
}

/// 内置 gctrace 格式注册表
pub fn gc_trace_formats() -> &'static [Format] {
    &GC_TRACE_FORMATS
}

/// 按名称查找内置格式
pub fn find_format(name: &str) -> Option<&'static Format> {
    GC_TRACE_FORMATS.iter().find(|f| f.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_order() {
        let names: Vec<&str> =
            gc_trace_formats().iter().map(Format::name).collect();
        assert_eq!(names, vec!["Go 1.0", "Go 1.1", "Go 1.3", "Go 1.4"]);
    }

    #[test]
    fn test_builtin_header_matches_groups() {
        for format in gc_trace_formats() {
            assert_eq!(
                format.columns(),
                format.pattern().captures_len() - 1,
                "{}",
                format.name()
            );
        }
    }

    #[test]
    fn test_malformed_format_rejected() {
        let err = Format::new("broken", "a,b", r"(\d+)").unwrap_err();
        assert!(err.is_format_error());

        let err = Format::new("bad regex", "a", r"(\d+").unwrap_err();
        assert!(matches!(err, ConvertError::Regex(_)));
    }

    #[test]
    fn test_captures_in_order() {
        let format = find_format("Go 1.0").unwrap();
        let fields = format
            .captures("gc14(2): 1+1+0 ms 10 -> 5 MB 58439 -> 8912 (573381-564469) objects 184 handoff")
            .unwrap();
        assert_eq!(
            fields,
            vec![
                "14", "2", "1", "1", "0", "10", "5", "58439", "8912",
                "573381", "564469", "184"
            ]
        );
        assert!(format.captures("not a gc line").is_none());
    }

    #[test]
    fn test_optional_group_yields_empty_field() {
        let format = Format::new("opt", "a,b", r"(\w+)(?:-(\d+))?").unwrap();
        assert_eq!(format.captures("abc").unwrap(), vec!["abc", ""]);
        assert_eq!(format.captures("abc-12").unwrap(), vec!["abc", "12"]);
    }

    #[test]
    fn test_find_format() {
        assert!(find_format("Go 1.4").is_some());
        assert!(find_format("Go 1.2").is_none());
    }
}

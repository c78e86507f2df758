//! 配置管理模块
//!
//! 转换行为只由显式传入的 [`Config`] 决定，没有任何进程级的可变全局状态。
//! 配置既可以由命令行参数构造，也可以从 TOML 文件读取。
//!
//! ```toml
//! output = "gc.csv"
//! queue_size = 200
//! precision = 3
//!
//! [log]
//! level = "debug"
//! ```

use crate::converter::DEFAULT_QUEUE_SIZE;
use crate::error::{ConvertError, Result};
use crate::writer::DEFAULT_PRECISION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 时间戳最多保留的小数位数（纳秒）
pub const MAX_PRECISION: usize = 9;

/// 主配置结构体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 输入文件，为空时读取标准输入
    pub input: Option<PathBuf>,
    /// 输出文件，必须提供
    pub output: Option<PathBuf>,
    /// 是否在行首加入时间戳列，为空时仅在读取标准输入时启用
    pub timestamp: Option<bool>,
    /// 是否缓冲输出，为空时仅在读取文件时启用
    pub buffered: Option<bool>,
    /// 扫描与写入之间的队列容量
    pub queue_size: usize,
    /// 时间戳小数位数
    pub precision: usize,
    /// 使用单线程同步转换
    pub sync: bool,
    /// 日志配置
    pub log: LogSettings,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
    /// 日志文件目录，为空时只输出到控制台
    pub log_dir: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "warn".to_string(), log_dir: None }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            timestamp: None,
            buffered: None,
            queue_size: DEFAULT_QUEUE_SIZE,
            precision: DEFAULT_PRECISION,
            sync: false,
            log: LogSettings::default(),
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::config_error(format!(
                "无法读取配置文件 {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// 从字符串加载配置
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ConvertError::config_error(format!("配置文件格式错误: {}", e))
        })
    }

    /// 序列化为 TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConvertError::config_error(format!("配置序列化失败: {}", e))
        })
    }

    /// 输入是否为标准输入（交互式输入）
    pub fn is_interactive(&self) -> bool {
        self.input.is_none()
    }

    /// 是否输出时间戳列
    pub fn timestamp_enabled(&self) -> bool {
        self.timestamp.unwrap_or_else(|| self.is_interactive())
    }

    /// 是否缓冲输出
    pub fn is_buffered(&self) -> bool {
        self.buffered.unwrap_or_else(|| !self.is_interactive())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.output.is_none() {
            return Err(ConvertError::config_error("缺少输出文件参数"));
        }

        if self.queue_size == 0 {
            return Err(ConvertError::config_error("队列容量不能为0"));
        }

        if self.precision > MAX_PRECISION {
            return Err(ConvertError::config_error(format!(
                "时间戳精度不能超过 {} 位: {}",
                MAX_PRECISION, self.precision
            )));
        }

        match self.log.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConvertError::config_error(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_output() -> Config {
        Config { output: Some(PathBuf::from("gc.csv")), ..Config::default() }
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = with_output();
        assert!(config.validate().is_ok());

        config.queue_size = 0;
        assert!(config.validate().is_err());

        config.queue_size = 1;
        config.precision = 10;
        assert!(config.validate().is_err());

        config.precision = 9;
        config.log.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_follow_input() {
        let stdin = with_output();
        assert!(stdin.is_interactive());
        assert!(stdin.timestamp_enabled());
        assert!(!stdin.is_buffered());

        let file =
            Config { input: Some(PathBuf::from("gc.log")), ..with_output() };
        assert!(!file.is_interactive());
        assert!(!file.timestamp_enabled());
        assert!(file.is_buffered());

        let forced = Config {
            timestamp: Some(true),
            buffered: Some(false),
            ..file
        };
        assert!(forced.timestamp_enabled());
        assert!(!forced.is_buffered());
    }

    #[test]
    fn test_config_serialization() {
        let config = with_output();
        let toml_str = config.to_toml().unwrap();
        let parsed = Config::parse(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("output = \"out.csv\"\nprecision = 3\n").unwrap();
        assert_eq!(config.output, Some(PathBuf::from("out.csv")));
        assert_eq!(config.precision, 3);
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);
        assert_eq!(config.log.level, "warn");
    }
}

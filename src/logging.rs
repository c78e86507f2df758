//! 日志初始化和配置模块
//!
//! 使用 tracing 输出诊断日志。控制台日志写到标准错误，标准输出可能正在承载 CSV
//! 数据；配置了日志目录时额外按天滚动写入文件。

use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 日志文件名前缀
const LOG_FILE_PREFIX: &str = "gctrace2csv";

/// 日志配置结构体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: Level,
    /// 日志文件目录，为空时不写文件
    pub log_dir: Option<String>,
}

impl LogConfig {
    /// 创建新的日志配置，使用默认级别
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置日志级别
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// 设置日志文件目录
    pub fn log_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// 从配置文件中的日志设置构造
    pub fn from_settings(settings: &crate::config::LogSettings) -> LogResult<Self> {
        let level = settings.level.parse::<Level>().map_err(|_| {
            LogError::Config(format!("无效的日志级别: {}", settings.level))
        })?;
        Ok(Self { level, log_dir: settings.log_dir.clone() })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::WARN, log_dir: None }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    #[error("日志配置错误: {0}")]
    Config(String),
    #[error("日志初始化错误: {0}")]
    Init(String),
}

/// 日志初始化结果
pub type LogResult<T> = Result<T, LogError>;

/// 初始化日志系统
///
/// 环境变量 `RUST_LOG` 优先于配置的级别。重复初始化不会报错，也不会替换已有的
/// 订阅者。写文件时返回的 guard 必须保持存活，否则缓冲中的日志会丢失。
///
/// ```no_run
/// use gctrace2csv::logging::{init_logging, LogConfig};
/// use tracing::Level;
///
/// let _guard = init_logging(LogConfig::new().level(Level::INFO)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> LogResult<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(SystemTime)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(io::IsTerminal::is_terminal(&io::stderr()));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender =
                tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) =
                tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_timer(SystemTime)
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(false);
            (Some(layer.boxed()), Some(guard))
        }
        None => (None, None),
    };

    match Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => {
            tracing::debug!("日志系统初始化完成，级别: {}", config.level);
            Ok(guard)
        }
        // 已经初始化过了，这不是错误
        Err(_) => Ok(None),
    }
}

/// 使用默认配置初始化日志系统
pub fn init_default_logging() -> LogResult<Option<WorkerGuard>> {
    init_logging(LogConfig::default())
}

//! 错误类型定义
//!
//! 转换过程中只有三类错误会向调用方暴露：输入读取失败、输出写入失败、配置错误。
//! 未匹配任何格式的行不是错误，会被静默丢弃。

use std::io;

/// 转换器的结果类型
pub type Result<T> = std::result::Result<T, ConvertError>;

/// 转换错误类型
///
/// 所有变体都是 `Send`，可以跨越扫描线程与写入线程传递。
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// 读取输入流失败
    #[error("读取错误: {0}")]
    Read(#[source] io::Error),

    /// 写入输出失败
    #[error("写入错误: {0}")]
    Write(#[source] io::Error),

    /// CSV 序列化失败
    #[error("CSV 写入错误: {0}")]
    Csv(#[from] csv::Error),

    /// 格式定义不合法（列数与捕获组数不一致等）
    #[error("格式 {name} 定义错误: {message}")]
    Format { name: String, message: String },

    /// 正则表达式错误
    #[error("正则表达式错误: {0}")]
    Regex(#[from] regex::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 日志错误（仅在启用 logging feature 时可用）
    #[cfg(feature = "logging")]
    #[error("日志错误: {0}")]
    Log(#[from] crate::logging::LogError),
}

impl ConvertError {
    /// 创建一个读取错误
    pub fn read_error(err: io::Error) -> Self {
        #[cfg(feature = "logging")]
        tracing::error!("读取输入失败: {}", err);
        Self::Read(err)
    }

    /// 创建一个写入错误
    pub fn write_error(err: io::Error) -> Self {
        #[cfg(feature = "logging")]
        tracing::error!("写入输出失败: {}", err);
        Self::Write(err)
    }

    /// 创建一个格式定义错误
    pub fn format_error<N: Into<String>, M: Into<String>>(
        name: N,
        message: M,
    ) -> Self {
        let name = name.into();
        let message = message.into();
        #[cfg(feature = "logging")]
        tracing::error!("格式 {} 定义错误: {}", name, message);
        Self::Format { name, message }
    }

    /// 创建一个配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        tracing::error!("配置错误: {}", message);
        Self::Config(message)
    }

    /// 检查是否为读取错误
    pub fn is_read_error(&self) -> bool {
        matches!(self, ConvertError::Read(_))
    }

    /// 检查是否为写入错误（包括 CSV 序列化失败）
    pub fn is_write_error(&self) -> bool {
        matches!(self, ConvertError::Write(_) | ConvertError::Csv(_))
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, ConvertError::Config(_))
    }

    /// 检查是否为格式定义错误
    pub fn is_format_error(&self) -> bool {
        matches!(self, ConvertError::Format { .. })
    }
}

//! 集成测试公共工具

use gctrace2csv::{ConvertError, Log, LogWriter, Result, WriteStats};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Go 1.0 格式的单行样例
#[allow(dead_code)]
pub const GO_1_0_LINE: &str = "gc14(2): 1+1+0 ms 10 -> 5 MB 58439 -> 8912 (573381-564469) objects 184 handoff";

/// 测试数据目录下的文件路径
#[allow(dead_code)]
pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join(name)
}

/// 读取测试数据文件
#[allow(dead_code)]
pub fn read_testdata(name: &str) -> Vec<u8> {
    fs::read(testdata(name)).expect("Failed to read testdata")
}

/// 生成 n 行 Go 1.4 格式的 gctrace
#[allow(dead_code)]
pub fn go_1_4_lines(n: usize) -> String {
    (1..=n)
        .map(|i| {
            format!(
                "gc{i}(2): 1+0+139+1 us, 0 -> 0 MB, 302 (384-82) objects, 5 goroutines, 33/0/0 sweeps, 0(0) handoff, 0(0) steal, 0/0/0 yields\n"
            )
        })
        .collect()
}

/// 读取时总是失败的输入
#[allow(dead_code)]
pub struct ErrorReader;

impl Read for ErrorReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("read test"))
    }
}

/// 先返回一段数据，之后的读取阻塞一段时间再报告输入结束
#[allow(dead_code)]
pub struct StallingReader {
    data: Option<Vec<u8>>,
    stall: Duration,
}

#[allow(dead_code)]
impl StallingReader {
    pub fn new(data: impl Into<Vec<u8>>, stall: Duration) -> Self {
        Self { data: Some(data.into()), stall }
    }
}

impl Read for StallingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            None => {
                thread::sleep(self.stall);
                Ok(0)
            }
        }
    }
}

/// 写入时总是失败的输出
#[allow(dead_code)]
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }
}

/// 写入时总是失败的写入端，记录被调用的次数
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct ErrorWriter {
    pub calls: Arc<AtomicUsize>,
}

impl LogWriter for ErrorWriter {
    fn name(&self) -> &str {
        "error"
    }

    fn write_log(&mut self, _log: &Log<'_>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ConvertError::write_error(io::Error::other("write test")))
    }
}

/// 只记录写入和刷新次数的写入端
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingWriter {
    pub names: Vec<String>,
    pub writes: usize,
    pub flushes: usize,
}

impl LogWriter for CountingWriter {
    fn name(&self) -> &str {
        "counting"
    }

    fn write_log(&mut self, log: &Log<'_>) -> Result<()> {
        self.names.push(log.format.name().to_string());
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        WriteStats { written_records: self.writes, ..WriteStats::default() }
    }
}

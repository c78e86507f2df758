//! 扫描与写入的转换流水线
//!
//! 并发模式下扫描和写入分别运行在两个线程中，通过有界队列连接：
//!
//! ```text
//! 扫描线程 ──(有界队列, 默认 100)──> 写入线程
//!     │                                │
//!     └──────> 错误槽 (容量 1) <────────┘
//!                                      │
//! 调用方 <──────── 完成信号 ────────────┘
//! ```
//!
//! - 队列满时扫描线程阻塞，内存占用以队列容量为上限。
//! - 错误槽只保留第一个错误，后续错误被丢弃。
//! - 写入线程退出时关闭完成信号；扫描线程在每次读取前检查该信号，并且每次入队
//!   都与完成信号同时等待，因此写入失败后扫描线程一定会退出。
//! - 扫描线程持有扫描器，结束后再交还给转换器。完成信号一到 [`Converter::convert`]
//!   就返回，不必等待仍阻塞在读取中的扫描线程。
//!
//! 同步模式 [`Converter::convert_sync`] 在当前线程中依次扫描和写入，输出与错误
//! 语义与并发模式一致。

use crate::error::{ConvertError, Result};
use crate::scanner::{Log, Scanner};
use crate::writer::LogWriter;
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select};
use std::io::{self, BufRead};
use std::thread;

/// 默认队列容量
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// gctrace 到表格记录的转换器
pub struct Converter<'f, R, W> {
    scanner: Option<Scanner<'f, R>>,
    /// 扫描线程仍持有扫描器时，由此取回
    pending: Option<Receiver<Scanner<'f, R>>>,
    writer: W,
    queue_size: usize,
    buffered: bool,
}

impl<'f, R, W> Converter<'f, R, W> {
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// 当前持有的扫描器
    ///
    /// 上一次并发转换的扫描线程仍阻塞在读取中时返回 `None`。
    pub fn scanner(&mut self) -> Option<&Scanner<'f, R>> {
        self.reclaim(false);
        self.scanner.as_ref()
    }

    /// 等待扫描线程交还扫描器
    ///
    /// 只有扫描线程异常退出时才返回 `None`。
    pub fn wait_scanner(&mut self) -> Option<&Scanner<'f, R>> {
        self.reclaim(true);
        self.scanner.as_ref()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// 取回写入端，不等待扫描线程
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// 取回扫描器与写入端，必要时等待扫描线程结束
    pub fn into_inner(mut self) -> (Option<Scanner<'f, R>>, W) {
        self.reclaim(true);
        (self.scanner, self.writer)
    }

    fn reclaim(&mut self, wait: bool) {
        let Some(rx) = &self.pending else {
            return;
        };
        let returned = if wait {
            rx.recv().ok()
        } else {
            match rx.try_recv() {
                Ok(scanner) => Some(scanner),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => None,
            }
        };
        self.pending = None;
        self.scanner = returned;
    }

    fn take_scanner(&mut self) -> Result<Scanner<'f, R>> {
        self.reclaim(true);
        self.scanner.take().ok_or_else(lost_scanner)
    }
}

impl<'f, R, W> Converter<'f, R, W>
where
    R: BufRead + Send,
    W: LogWriter,
{
    /// 创建转换器，队列容量为 [`DEFAULT_QUEUE_SIZE`]，不缓冲输出
    pub fn new(scanner: Scanner<'f, R>, writer: W) -> Self {
        Self {
            scanner: Some(scanner),
            pending: None,
            writer,
            queue_size: DEFAULT_QUEUE_SIZE,
            buffered: false,
        }
    }

    /// 设置队列容量，最小为 1
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    /// 缓冲模式下只在输入结束时刷新一次，否则每条记录后都刷新
    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    /// 并发转换整个输入流
    ///
    /// 返回扫描端或写入端遇到的第一个错误。写入线程在返回前退出；写入失败时
    /// 扫描线程可能仍阻塞在读取中，读取返回后它自行退出并交还扫描器。
    pub fn convert(&mut self) -> Result<()>
    where
        'f: 'static,
        R: 'static,
    {
        let mut scanner = self.take_scanner()?;
        if let Some(err) = scanner.take_err() {
            self.scanner = Some(scanner);
            return Err(err);
        }

        #[cfg(feature = "logging")]
        tracing::info!(
            "开始并发转换，写入端: {}，队列容量: {}，缓冲: {}",
            self.writer.name(),
            self.queue_size,
            self.buffered
        );

        let (log_tx, log_rx) = bounded::<Log<'f>>(self.queue_size);
        let (err_tx, err_rx) = bounded::<ConvertError>(1);
        let (quit_tx, quit_rx) = bounded::<()>(0);
        let (back_tx, back_rx) = bounded(1);

        let scan_err_tx = err_tx.clone();
        let scan_quit_rx = quit_rx.clone();
        thread::spawn(move || {
            scan_loop(&mut scanner, log_tx, scan_err_tx, scan_quit_rx);
            let _ = back_tx.send(scanner);
        });
        self.pending = Some(back_rx);

        let writer = &mut self.writer;
        let buffered = self.buffered;
        thread::scope(|s| {
            s.spawn(move || write_loop(writer, log_rx, err_tx, quit_tx, buffered));

            // 只有在完成信号关闭时才会返回
            let _ = quit_rx.recv();
        });

        let result = match err_rx.try_recv() {
            Ok(err) => Err(err),
            // 写入端正常结束说明队列已关闭，扫描线程随即交还扫描器
            Err(_) => match self.wait_scanner() {
                Some(_) => Ok(()),
                None => Err(lost_scanner()),
            },
        };
        self.log_summary(&result);
        result
    }

    /// 在当前线程中逐条扫描并写入
    pub fn convert_sync(&mut self) -> Result<()> {
        self.reclaim(true);
        let Some(scanner) = self.scanner.as_mut() else {
            return Err(lost_scanner());
        };
        if let Some(err) = scanner.take_err() {
            return Err(err);
        }

        #[cfg(feature = "logging")]
        tracing::info!(
            "开始同步转换，写入端: {}，缓冲: {}",
            self.writer.name(),
            self.buffered
        );

        let result = run_sync(scanner, &mut self.writer, self.buffered);
        self.log_summary(&result);
        result
    }

    #[cfg(feature = "logging")]
    fn log_summary(&mut self, result: &Result<()>) {
        let write = self.writer.stats();
        let scan = self.scanner().map(|sc| sc.stats());
        match (result, scan) {
            (Ok(()), Some(scan)) => tracing::info!(
                "转换完成，读取 {} 行，匹配 {} 行，跳过 {} 行，写入 {} 条记录",
                scan.lines,
                scan.matched,
                scan.skipped,
                write.written_records
            ),
            (Ok(()), None) => tracing::info!(
                "转换完成，写入 {} 条记录",
                write.written_records
            ),
            (Err(e), Some(scan)) => tracing::error!(
                "转换失败: {}，已读取 {} 行，已写入 {} 条记录",
                e,
                scan.lines,
                write.written_records
            ),
            (Err(e), None) => tracing::error!(
                "转换失败: {}，已写入 {} 条记录，扫描线程仍在读取",
                e,
                write.written_records
            ),
        }
    }

    #[cfg(not(feature = "logging"))]
    fn log_summary(&mut self, _result: &Result<()>) {}
}

fn lost_scanner() -> ConvertError {
    ConvertError::read_error(io::Error::other("扫描线程异常退出，扫描器已丢失"))
}

fn run_sync<R: BufRead, W: LogWriter>(
    scanner: &mut Scanner<'_, R>,
    writer: &mut W,
    buffered: bool,
) -> Result<()> {
    while let Some(log) = scanner.scan_log() {
        writer.write_log(&log)?;
        if !buffered {
            writer.flush()?;
        }
    }

    let scan_err = scanner.take_err();
    if buffered {
        if let Err(e) = writer.flush() {
            return Err(scan_err.unwrap_or(e));
        }
    }

    match scan_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// 写入端是否已经结束
fn is_cancelled(quit_rx: &Receiver<()>) -> bool {
    matches!(quit_rx.try_recv(), Err(TryRecvError::Disconnected))
}

/// 写入错误槽，槽已被占用时丢弃
fn report(err_tx: &Sender<ConvertError>, err: ConvertError) {
    if let Err(_dropped) = err_tx.try_send(err) {
        #[cfg(feature = "logging")]
        tracing::debug!("错误槽已被占用，丢弃后续错误: {}", _dropped.into_inner());
    }
}

/// 扫描循环：读取记录并入队，结束时关闭队列
fn scan_loop<'f, R: BufRead>(
    scanner: &mut Scanner<'f, R>,
    log_tx: Sender<Log<'f>>,
    err_tx: Sender<ConvertError>,
    quit_rx: Receiver<()>,
) {
    #[cfg(feature = "logging")]
    tracing::debug!("扫描线程启动");

    loop {
        if is_cancelled(&quit_rx) {
            #[cfg(feature = "logging")]
            tracing::debug!("写入端已结束，扫描线程退出");
            break;
        }

        let Some(log) = scanner.scan_log() else {
            if let Some(err) = scanner.take_err() {
                report(&err_tx, err);
            }
            break;
        };

        select! {
            send(log_tx, log) -> res => {
                if res.is_err() {
                    break;
                }
            }
            recv(quit_rx) -> _ => {
                #[cfg(feature = "logging")]
                tracing::debug!("入队时写入端已结束，扫描线程退出");
                break;
            }
        }
    }

    // log_tx 在此释放，写入端随后看到队列关闭
}

/// 写入循环：逐条写入直到队列关闭或写入失败，退出时关闭完成信号
fn write_loop<W: LogWriter>(
    writer: &mut W,
    log_rx: Receiver<Log<'_>>,
    err_tx: Sender<ConvertError>,
    quit_tx: Sender<()>,
    buffered: bool,
) {
    #[cfg(feature = "logging")]
    tracing::debug!("写入线程启动");

    if let Err(err) = drain(writer, &log_rx, buffered) {
        report(&err_tx, err);
    }

    drop(log_rx);
    drop(quit_tx);
}

fn drain<W: LogWriter>(
    writer: &mut W,
    log_rx: &Receiver<Log<'_>>,
    buffered: bool,
) -> Result<()> {
    for log in log_rx.iter() {
        writer.write_log(&log)?;
        if !buffered {
            writer.flush()?;
        }
    }

    if buffered {
        writer.flush()?;
    }
    Ok(())
}

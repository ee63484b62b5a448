use std::{
    fs,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use odens_core::TeamColor;
use tokio::sync::mpsc;

use crate::{log_codec::LogFileWriter, TickRecord};

enum WorkerMsg {
    Tick { timestamp_ns: i64, record: TickRecord },
    Flush,
}

/// Records one [`TickRecord`] per control tick to a match log file.
///
/// Records are handed to a background thread, so logging never blocks the control
/// loop on disk I/O. Dropping the logger writes out everything queued so far.
pub struct MatchLogger {
    path: PathBuf,
    sender: Option<mpsc::UnboundedSender<WorkerMsg>>,
    worker: Option<JoinHandle<()>>,
}

impl MatchLogger {
    /// Create a new log file in `directory`, named after the current local time, our
    /// colour and our number.
    pub fn start(directory: impl AsRef<Path>, color: TeamColor, number: usize) -> Result<Self> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {:?}", directory))?;
        let path = directory.join(log_file_name(&Local::now(), color, number));
        Self::open(path)
    }

    /// Create the log file at `path`, which must not exist yet.
    pub fn open(path: PathBuf) -> Result<Self> {
        let writer = LogFileWriter::open(&path)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = thread::Builder::new()
            .name("match-logger".to_owned())
            .spawn(move || run_worker(receiver, writer))
            .context("Failed to spawn match logger thread")?;
        log::info!("Writing match log to {}", path.display());
        Ok(Self {
            path,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_tick(&self, record: TickRecord) {
        let timestamp_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.send(WorkerMsg::Tick {
            timestamp_ns,
            record,
        });
    }

    pub fn flush(&self) {
        self.send(WorkerMsg::Flush);
    }

    fn send(&self, msg: WorkerMsg) {
        let sent = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(msg).is_ok());
        if !sent {
            log::warn!("Match logger worker has stopped, dropping message");
        }
    }
}

fn run_worker(mut receiver: mpsc::UnboundedReceiver<WorkerMsg>, mut writer: LogFileWriter) {
    while let Some(msg) = receiver.blocking_recv() {
        let result = match msg {
            WorkerMsg::Tick {
                timestamp_ns,
                record,
            } => writer.write_tick(timestamp_ns, &record),
            WorkerMsg::Flush => writer.flush(),
        };
        if let Err(e) = result {
            log::error!("Failed to write match log: {}", e);
        }
    }
    if let Err(e) = writer.flush() {
        log::error!("Failed to flush match log: {}", e);
    }
}

impl Drop for MatchLogger {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue is drained.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Match logger thread panicked");
            }
        }
    }
}

/// `YYYYMMDDHHMMSS` followed by `b` or `y` and our number.
pub fn log_file_name<Tz: TimeZone>(time: &DateTime<Tz>, color: TeamColor, number: usize) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let color = match color {
        TeamColor::Blue => 'b',
        TeamColor::Yellow => 'y',
    };
    format!("{}{}{}.log", time.format("%Y%m%d%H%M%S"), color, number)
}

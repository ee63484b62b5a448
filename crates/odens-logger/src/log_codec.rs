use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};

use crate::TickRecord;

const LOG_FILE_HEADER: &[u8; 12] = b"SSL_LOG_FILE";
pub const LOG_FILE_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFileMessageType {
    /// Messages that are not SSL packets; tick records are stored with this type.
    Blank = 0,
    Unknown = 1,
    SSLVision2010 = 2,
    SSLRefbox2013 = 3,
    SSLVision2014 = 4,
}

impl LogFileMessageType {
    fn from_i32(value: i32) -> LogFileMessageType {
        match value {
            0 => LogFileMessageType::Blank,
            2 => LogFileMessageType::SSLVision2010,
            3 => LogFileMessageType::SSLRefbox2013,
            4 => LogFileMessageType::SSLVision2014,
            _ => LogFileMessageType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogMessage {
    Tick(TickRecord),
    /// A message this crate does not decode, e.g. a raw SSL packet.
    Raw {
        message_type: LogFileMessageType,
        payload: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedMessage {
    /// Receive time in seconds since the epoch.
    pub timestamp: f64,
    pub message: LogMessage,
}

/// Writes messages in the SSL log file format: a `SSL_LOG_FILE` header and version,
/// then per message a big-endian timestamp (ns), type and size followed by the
/// payload.
pub struct LogFileWriter {
    file: BufWriter<File>,
    buf: Vec<u8>,
}

impl LogFileWriter {
    /// Open a new log file for writing and write the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or if an I/O error occurs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("Log file already exists: {:?}", path);
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {:?}", path))?;
        let mut writer = LogFileWriter {
            file: BufWriter::new(file),
            buf: Vec::new(),
        };
        writer.write_header()?;
        Ok(writer)
    }

    fn write_header(&mut self) -> Result<()> {
        self.file.write_all(LOG_FILE_HEADER)?;
        self.file.write_all(&LOG_FILE_VERSION.to_be_bytes())?;
        Ok(())
    }

    /// Write one tick record, MessagePack encoded.
    pub fn write_tick(&mut self, timestamp_ns: i64, record: &TickRecord) -> Result<()> {
        self.buf.clear();
        rmp_serde::encode::write_named(&mut self.buf, record)
            .context("Failed to encode tick record")?;
        let payload = std::mem::take(&mut self.buf);
        let result = self.write_message(timestamp_ns, LogFileMessageType::Blank, &payload);
        self.buf = payload;
        result
    }

    pub fn write_message(
        &mut self,
        timestamp_ns: i64,
        message_type: LogFileMessageType,
        payload: &[u8],
    ) -> Result<()> {
        let message_size =
            i32::try_from(payload.len()).context("Log message too large for the log format")?;
        self.file.write_all(&timestamp_ns.to_be_bytes())?;
        self.file.write_all(&(message_type as i32).to_be_bytes())?;
        self.file.write_all(&message_size.to_be_bytes())?;
        self.file.write_all(payload)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// A log file read back into memory.
pub struct LogFile {
    version: i32,
    messages: Vec<TimestampedMessage>,
}

impl LogFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open log file {:?}", path))?;
        Self::read(BufReader::new(file))
    }

    /// Read a log from any source. A truncated last message is dropped.
    pub fn read(mut source: impl Read) -> Result<Self> {
        let mut buf = [0u8; 12 + 4];
        source.read_exact(&mut buf)?;
        if &buf[0..12] != LOG_FILE_HEADER {
            bail!(
                "Invalid log file type: {}",
                String::from_utf8_lossy(&buf[0..12])
            );
        }
        let version = i32::from_be_bytes(buf[12..16].try_into()?);
        if version != LOG_FILE_VERSION {
            bail!("Unsupported log file version: {}", version);
        }

        let mut messages = Vec::new();
        loop {
            let mut header = [0u8; 16];
            match source.read_exact(&mut header) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let timestamp_ns = i64::from_be_bytes(header[0..8].try_into()?);
            let message_type =
                LogFileMessageType::from_i32(i32::from_be_bytes(header[8..12].try_into()?));
            let message_size = i32::from_be_bytes(header[12..16].try_into()?);
            let Ok(message_size) = usize::try_from(message_size) else {
                bail!("Negative message size {}", message_size);
            };

            // Read through `take` so a corrupt size cannot force a huge allocation.
            let mut payload = Vec::new();
            source
                .by_ref()
                .take(message_size as u64)
                .read_to_end(&mut payload)?;
            if payload.len() < message_size {
                log::warn!("Log file ends inside a message");
                break;
            }

            let message = match message_type {
                LogFileMessageType::Blank => match rmp_serde::from_slice(&payload) {
                    Ok(record) => LogMessage::Tick(record),
                    Err(e) => {
                        log::warn!("Failed to decode tick record: {}", e);
                        continue;
                    }
                },
                message_type => LogMessage::Raw {
                    message_type,
                    payload,
                },
            };
            messages.push(TimestampedMessage {
                timestamp: timestamp_ns as f64 * 1e-9,
                message,
            });
        }

        Ok(LogFile { version, messages })
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn messages(&self) -> &[TimestampedMessage] {
        &self.messages
    }

    /// Iterate over the tick records only.
    pub fn ticks(&self) -> impl Iterator<Item = &TickRecord> {
        self.messages.iter().filter_map(|msg| match &msg.message {
            LogMessage::Tick(record) => Some(record),
            LogMessage::Raw { .. } => None,
        })
    }
}

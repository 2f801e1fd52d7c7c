//! Sequential store of simulated events.
//!
//! The on-disk form is JSON lines: one [`SimFileHeader`] line followed by one
//! [`SimEvent`] per line. Reading follows a fixed lifecycle:
//! ```text
//! open() -> init() -> read_event()* -> close()
//! ```
//! Calls made out of that order return [`SimFileError::Lifecycle`]. A failed
//! `init` closes the file again, so a retry starts over from `open`.

use crate::event::SimEvent;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FORMAT_NAME: &str = "sbs-gem-sim";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimFileHeader {
    pub format: String,
    pub version: u32,
    #[serde(default)]
    pub description: String,
}

impl SimFileHeader {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Closed,
    Open,
    Initialized,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileState::Closed => write!(f, "closed"),
            FileState::Open => write!(f, "open"),
            FileState::Initialized => write!(f, "initialized"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimFileError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed entry {entry}: {source}")]
    Json {
        entry: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("cannot {operation} while file is {state}")]
    Lifecycle {
        operation: &'static str,
        state: FileState,
    },
}

/// Reader over a simulated-event file.
pub struct SimFile {
    file_name: PathBuf,
    description: String,
    state: FileState,
    reader: Option<BufReader<File>>,
    header: Option<SimFileHeader>,
    entry_count: u64,
    entry: u64,
    current: Option<SimEvent>,
}

impl SimFile {
    pub fn new(file_name: impl Into<PathBuf>, description: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            description: description.into(),
            state: FileState::Closed,
            reader: None,
            header: None,
            entry_count: 0,
            entry: 0,
            current: None,
        }
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    /// Point at another file. Only allowed while closed.
    pub fn set_file_name(&mut self, file_name: impl Into<PathBuf>) -> Result<(), SimFileError> {
        self.require(FileState::Closed, "rename")?;
        self.file_name = file_name.into();
        Ok(())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    pub fn header(&self) -> Option<&SimFileHeader> {
        self.header.as_ref()
    }

    /// Total events in the file, known after `init`
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Number of events read so far
    pub fn current_entry(&self) -> u64 {
        self.entry
    }

    fn require(&self, state: FileState, operation: &'static str) -> Result<(), SimFileError> {
        if self.state != state {
            return Err(SimFileError::Lifecycle {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> SimFileError {
        SimFileError::Io {
            path: self.file_name.clone(),
            source,
        }
    }

    pub fn open(&mut self) -> Result<(), SimFileError> {
        self.require(FileState::Closed, "open")?;
        let file = File::open(&self.file_name).map_err(|e| self.io_error(e))?;
        self.reader = Some(BufReader::new(file));
        self.state = FileState::Open;
        info!("opened simulation file {}", self.file_name.display());
        Ok(())
    }

    /// Validate the header and count the events.
    pub fn init(&mut self) -> Result<(), SimFileError> {
        self.require(FileState::Open, "init")?;

        let (header, entry_count) = match self.read_header() {
            Ok(found) => found,
            Err(e) => {
                warn!("closing {} after failed init: {}", self.file_name.display(), e);
                self.reader = None;
                self.state = FileState::Closed;
                return Err(e);
            }
        };

        info!(
            "simulation file {}: {} events, {}",
            self.file_name.display(),
            entry_count,
            header.description
        );

        self.header = Some(header);
        self.entry_count = entry_count;
        self.entry = 0;
        self.state = FileState::Initialized;
        Ok(())
    }

    fn read_header(&mut self) -> Result<(SimFileHeader, u64), SimFileError> {
        let mut line = String::new();
        let reader = self.reader.as_mut().ok_or(SimFileError::Lifecycle {
            operation: "init",
            state: FileState::Closed,
        })?;
        reader.read_line(&mut line).map_err(|e| SimFileError::Io {
            path: self.file_name.clone(),
            source: e,
        })?;

        let header: SimFileHeader = serde_json::from_str(line.trim())
            .map_err(|e| SimFileError::Schema(format!("unreadable header: {e}")))?;
        if header.format != FORMAT_NAME {
            return Err(SimFileError::Schema(format!(
                "expected format '{FORMAT_NAME}', found '{}'",
                header.format
            )));
        }
        if header.version != FORMAT_VERSION {
            return Err(SimFileError::Schema(format!(
                "unsupported version {} (reader supports {FORMAT_VERSION})",
                header.version
            )));
        }

        // Count with a second handle so the main reader stays after the header
        let counter = File::open(&self.file_name).map_err(|e| self.io_error(e))?;
        let mut entry_count = 0;
        for line in BufReader::new(counter).lines().skip(1) {
            let line = line.map_err(|e| self.io_error(e))?;
            if !line.trim().is_empty() {
                entry_count += 1;
            }
        }
        Ok((header, entry_count))
    }

    /// Advance to the next event. `Ok(None)` at end of stream.
    pub fn read_event(&mut self) -> Result<Option<&SimEvent>, SimFileError> {
        self.require(FileState::Initialized, "read an event")?;

        let reader = self.reader.as_mut().ok_or(SimFileError::Lifecycle {
            operation: "read an event",
            state: FileState::Closed,
        })?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line).map_err(|e| SimFileError::Io {
                path: self.file_name.clone(),
                source: e,
            })?;
            if n == 0 {
                self.current = None;
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        let event: SimEvent = serde_json::from_str(line.trim()).map_err(|e| SimFileError::Json {
            entry: self.entry,
            source: e,
        })?;
        self.entry += 1;
        debug!("read event {} (entry {})", event.event_number, self.entry);
        self.current = Some(event);
        Ok(self.current.as_ref())
    }

    /// Event returned by the last successful `read_event`
    pub fn current_event(&self) -> Option<&SimEvent> {
        self.current.as_ref()
    }

    pub fn close(&mut self) -> Result<(), SimFileError> {
        if self.state == FileState::Closed {
            return Err(SimFileError::Lifecycle {
                operation: "close",
                state: self.state,
            });
        }
        self.reader = None;
        self.current = None;
        self.state = FileState::Closed;
        info!(
            "closed simulation file {} after {} events",
            self.file_name.display(),
            self.entry
        );
        Ok(())
    }
}

/// Writes a simulated-event file in the layout [`SimFile`] reads.
pub struct SimFileWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl SimFileWriter {
    pub fn create(path: impl Into<PathBuf>, header: &SimFileHeader) -> Result<Self, SimFileError> {
        let path = path.into();
        let io = |source| SimFileError::Io {
            path: path.clone(),
            source,
        };
        let mut writer = BufWriter::new(File::create(&path).map_err(io)?);
        let line = serde_json::to_string(header)
            .map_err(|e| SimFileError::Schema(format!("cannot encode header: {e}")))?;
        writeln!(writer, "{line}").map_err(io)?;
        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    pub fn write_event(&mut self, event: &SimEvent) -> Result<(), SimFileError> {
        let line = serde_json::to_string(event).map_err(|e| SimFileError::Json {
            entry: self.written,
            source: e,
        })?;
        writeln!(self.writer, "{line}").map_err(|source| SimFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.written += 1;
        Ok(())
    }

    /// Flush and return the number of events written.
    pub fn finish(mut self) -> Result<u64, SimFileError> {
        self.writer.flush().map_err(|source| SimFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.written)
    }
}

//! Incremental line reading from the followed file.
//!
//! A poll opens the file, compares its identity and length with what the
//! previous poll saw, and returns every complete line appended since the last
//! read position. Rotation policy: on unix a different `(device, inode)` pair
//! means the file was replaced; on every platform a length below the read
//! position means it was truncated. Both restart reading at offset 0.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Identity of the file behind a path, used to notice replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileIdentity {
    device: u64,
    inode: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &std::fs::Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(_metadata: &std::fs::Metadata) -> Option<Self> {
        None
    }
}

/// Polling state of one follow.
#[derive(Debug, Clone)]
pub(crate) struct FollowState {
    pub path: PathBuf,
    /// Byte offset just past the last complete line consumed.
    pub position: u64,
    pub identity: Option<FileIdentity>,
    /// Sequence index of the next emitted line, starting at 1.
    pub next_index: u64,
}

impl FollowState {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            position: 0,
            identity: None,
            next_index: 1,
        }
    }
}

/// What a poll found out about the file.
#[derive(Debug)]
pub(crate) enum SourceEvent {
    /// Nothing new.
    Idle,
    /// New complete lines were read.
    Appended,
    /// The file was replaced or truncated; lines were read from offset 0.
    Rotated,
    NotFound,
    Error(Error),
}

#[derive(Debug)]
pub(crate) struct PollOutcome {
    pub lines: Vec<String>,
    pub event: SourceEvent,
}

impl PollOutcome {
    fn without_lines(event: SourceEvent) -> Self {
        Self {
            lines: Vec::new(),
            event,
        }
    }
}

/// Read the complete lines appended since `state.position`.
pub(crate) async fn poll(state: &mut FollowState, separator: &str) -> PollOutcome {
    match read_new_lines(state, separator).await {
        Ok(outcome) => outcome,
        Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
            PollOutcome::without_lines(SourceEvent::NotFound)
        }
        Err(e) => PollOutcome::without_lines(SourceEvent::Error(e)),
    }
}

/// Move the read position past the last complete line currently in the file.
///
/// An unterminated trailing line is left unread so it is delivered whole once
/// it is finished. A missing file is left for the first poll to report.
pub(crate) async fn seek_to_end(state: &mut FollowState, separator: &str) -> Result<()> {
    let mut file = match File::open(&state.path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata().await?;
    state.position = last_line_end(&mut file, metadata.len(), separator.as_bytes()).await?;
    state.identity = FileIdentity::of(&metadata);
    Ok(())
}

/// Offset just past the last `separator` in the first `len` bytes, or 0.
async fn last_line_end(file: &mut File, len: u64, separator: &[u8]) -> Result<u64> {
    const CHUNK: u64 = 8 * 1024;
    // Chunks overlap so a separator straddling a chunk boundary is still found.
    let overlap = separator.len().saturating_sub(1) as u64;
    let mut end = len;

    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        let read_end = (end + overlap).min(len);

        file.seek(std::io::SeekFrom::Start(start)).await?;
        let mut chunk = Vec::new();
        (&mut *file).take(read_end - start).read_to_end(&mut chunk).await?;

        if let Some(offset) = rfind(&chunk, separator) {
            return Ok(start + (offset + separator.len()) as u64);
        }
        end = start;
    }
    Ok(0)
}

async fn read_new_lines(state: &mut FollowState, separator: &str) -> Result<PollOutcome> {
    let mut file = File::open(&state.path).await?;
    let metadata = file.metadata().await?;
    let current_size = metadata.len();
    let identity = FileIdentity::of(&metadata);

    let rotated = detect_rotation(state.identity, identity, current_size, state.position);
    if rotated {
        state.position = 0;
    }
    state.identity = identity;

    let bytes_to_read = match calculate_bytes_to_read(current_size, state.position) {
        Some(bytes) => bytes,
        None => {
            let event = if rotated {
                SourceEvent::Rotated
            } else {
                SourceEvent::Idle
            };
            return Ok(PollOutcome::without_lines(event));
        }
    };

    file.seek(std::io::SeekFrom::Start(state.position)).await?;

    let mut content = Vec::new();
    file.take(bytes_to_read).read_to_end(&mut content).await?;

    let (lines, consumed) = split_complete_lines(&content, separator);
    state.position += consumed;

    let event = if rotated {
        SourceEvent::Rotated
    } else if lines.is_empty() {
        SourceEvent::Idle
    } else {
        SourceEvent::Appended
    };
    Ok(PollOutcome { lines, event })
}

/// A file was rotated when it is a different file or shorter than what was already read.
fn detect_rotation(
    previous: Option<FileIdentity>,
    current: Option<FileIdentity>,
    current_size: u64,
    last_position: u64,
) -> bool {
    let replaced = matches!((previous, current), (Some(p), Some(c)) if p != c);
    replaced || current_size < last_position
}

fn calculate_bytes_to_read(current_size: u64, last_position: u64) -> Option<u64> {
    if current_size <= last_position {
        None
    } else {
        Some(current_size - last_position)
    }
}

/// Split `content` into the lines terminated by `separator`.
///
/// Returns the lines and the number of bytes they span, terminators included.
/// Bytes after the last terminator are not consumed.
fn split_complete_lines(content: &[u8], separator: &str) -> (Vec<String>, u64) {
    let needle = separator.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;

    while let Some(offset) = find(&content[start..], needle) {
        let end = start + offset;
        lines.push(decode_line(&content[start..end], separator));
        start = end + needle.len();
    }

    (lines, start as u64)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

fn decode_line(raw: &[u8], separator: &str) -> String {
    let raw = match raw {
        [rest @ .., b'\r'] if separator == "\n" => rest,
        _ => raw,
    };
    String::from_utf8_lossy(raw).into_owned()
}

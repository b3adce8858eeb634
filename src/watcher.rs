//! Tails the control file.
//!
//! The file is read from the start, then polled for appended bytes. Raw
//! chunks are forwarded as they arrive; splitting them into lines is the
//! control loop's job.
//!
//! The file counts as a new command stream when it shrinks, when the path
//! now names a different file (replaced by rename, or removed), or when its
//! first bytes no longer match what was read. The watcher then sends
//! [`WatchEvent::Restart`] and reads the new contents from the beginning.
//! Any I/O error is forwarded once and ends the watch.

use log::{debug, info};
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHUNK_SIZE: usize = 8 * 1024;
const CHANNEL_CAPACITY: usize = 64;

/// Leading bytes remembered to notice an in-place rewrite
const HEAD_LEN: usize = 256;

/// What the watcher saw in the control file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Everything delivered so far is void; a new command stream follows.
    Restart,

    /// Bytes appended to the current stream
    Data(Vec<u8>),
}

/// What the watcher delivers: an event, or the error that stopped it.
pub type ControlInput = io::Result<WatchEvent>;

pub struct ControlFile {
    path: PathBuf,
    poll_interval: Duration,
}

/// Open handle plus how far it has been read.
struct Cursor {
    file: File,
    offset: u64,
    head: Vec<u8>,
}

impl Cursor {
    fn new(file: File) -> Self {
        Cursor {
            file,
            offset: 0,
            head: Vec::new(),
        }
    }

    fn advance(&mut self, chunk: &[u8]) {
        self.offset += chunk.len() as u64;
        let missing = HEAD_LEN.saturating_sub(self.head.len()).min(chunk.len());
        self.head.extend_from_slice(&chunk[..missing]);
    }

    /// Re-reads the leading bytes and compares them with what was consumed.
    async fn head_matches(&mut self) -> io::Result<bool> {
        if self.head.is_empty() {
            return Ok(true);
        }

        let mut current = vec![0u8; self.head.len()];
        self.file.seek(SeekFrom::Start(0)).await?;
        match self.file.read_exact(&mut current).await {
            Ok(_) => Ok(current == self.head),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl ControlFile {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        ControlFile {
            path: path.into(),
            poll_interval,
        }
    }

    /// Starts tailing on the current runtime.
    pub fn spawn(self) -> (mpsc::Receiver<ControlInput>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            if let Err(e) = self.tail(&tx).await {
                // the receiver may already be gone on shutdown
                let _ = tx.send(Err(e)).await;
            }
        });
        (rx, handle)
    }

    async fn tail(&self, tx: &mpsc::Sender<ControlInput>) -> io::Result<()> {
        let mut cursor = Cursor::new(self.open().await?);
        let mut buf = vec![0u8; CHUNK_SIZE];

        info!("Watching control file {}", self.path.display());

        loop {
            if let Some(reason) = self.restart_reason(&mut cursor).await? {
                info!("Control file {}, reading it again from the start", reason);
                cursor = Cursor::new(self.open().await?);
                if tx.send(Ok(WatchEvent::Restart)).await.is_err() {
                    debug!("Control loop gone, stopping watcher");
                    return Ok(());
                }
            }

            let len = cursor.file.metadata().await?.len();
            if len > cursor.offset {
                cursor.file.seek(SeekFrom::Start(cursor.offset)).await?;
                loop {
                    let n = cursor.file.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    cursor.advance(&buf[..n]);
                    if tx.send(Ok(WatchEvent::Data(buf[..n].to_vec()))).await.is_err() {
                        debug!("Control loop gone, stopping watcher");
                        return Ok(());
                    }
                }
            }

            if tx.is_closed() {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Why the open handle no longer reflects the command stream, if it doesn't.
    async fn restart_reason(&self, cursor: &mut Cursor) -> io::Result<Option<&'static str>> {
        let on_disk = match fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Some("was removed")),
            Err(e) => return Err(e),
        };

        if !same_file(&on_disk, &cursor.file.metadata().await?) {
            return Ok(Some("was replaced"));
        }
        if on_disk.len() < cursor.offset {
            return Ok(Some("shrank"));
        }
        if on_disk.len() > cursor.offset && !cursor.head_matches().await? {
            return Ok(Some("was rewritten"));
        }
        Ok(None)
    }

    async fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(_: &Metadata, _: &Metadata) -> bool {
    true
}

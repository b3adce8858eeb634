//! Publishing `Stats` to the status file.

use crate::error::Result;
use crate::stats::Stats;
use log::debug;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination of published snapshots.
///
/// A publish replaces the whole previous snapshot; readers never see a mix
/// of old and new content.
pub trait StatusSink {
    fn publish(&mut self, stats: &Stats) -> Result<()>;
}

/// Writes a snapshot as pretty-printed JSON.
pub fn write_snapshot<W: Write>(stats: &Stats, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, stats)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Status file replaced atomically on every publish.
///
/// The snapshot is written to a sibling `<name>.tmp` file, synced, and then
/// renamed over the target, which is atomic on POSIX filesystems.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StatusFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("status"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatusSink for StatusFile {
    fn publish(&mut self, stats: &Stats) -> Result<()> {
        let temp_path = self.temp_path();

        let mut file = File::create(&temp_path)?;
        write_snapshot(stats, &mut file)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        debug!("Published snapshot to {}", self.path.display());
        Ok(())
    }
}

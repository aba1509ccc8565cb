use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

/// Log file writer that only creates the file on first write
///
/// Nothing touches the disk until something is actually logged. A file deleted while the
/// process runs is recreated on the next write.
#[derive(Debug, Clone)]
pub struct LazyFileWriter {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl LazyFileWriter {
    /// Writer appending to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Arc::default(),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path { &self.path }
}

/// Per-event writer handed out by `LazyFileWriter`
#[derive(Debug)]
pub struct LazyWriter {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl LazyWriter {
    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl Write for LazyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file_guard = self.lock();

        if file_guard.is_none() || !self.path.exists() {
            *file_guard = Some(self.open()?);
        }

        if let Some(Ok(bytes)) = file_guard.as_mut().map(|file| file.write(buf)) {
            return Ok(bytes);
        }

        // stale handle
        let mut file = self.open()?;
        let bytes = file.write(buf)?;
        *file_guard = Some(file);
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file_guard = self.lock();
        match file_guard.as_mut().map(Write::flush) {
            Some(Err(_)) if self.path.exists() => {
                *file_guard = Some(self.open()?);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LazyFileWriter {
    type Writer = LazyWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LazyWriter {
            path: self.path.clone(),
            file: Arc::clone(&self.file),
        }
    }
}

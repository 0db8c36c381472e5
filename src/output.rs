// src/output.rs - Output sinks a virtual printer writes finished jobs to
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::print_job::JobId;

/// Factory for the stream one job writes its converted output to.
///
/// The returned writer is owned by the job for one submission and dropped on
/// every exit path.
pub trait OutputTarget: Send + Sync {
    fn open(&self, job_id: &JobId, mime_type: &str) -> io::Result<Box<dyn Write + Send>>;
}

/// Hands every printer its own [`OutputTarget`].
pub trait OutputProvider: Send + Sync {
    fn output_for(&self, printer_name: &str) -> Arc<dyn OutputTarget>;
}

/// A document captured by [`MemoryOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub job_id: JobId,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Keeps every finished document in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    captured: Arc<Mutex<Vec<CapturedOutput>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> Vec<CapturedOutput> {
        self.captured.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.captured.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.lock().is_empty()
    }

    pub fn clear(&self) {
        self.captured.lock().clear();
    }
}

impl OutputTarget for MemoryOutput {
    fn open(&self, job_id: &JobId, mime_type: &str) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(MemorySink {
            entry: Some(CapturedOutput {
                job_id: job_id.clone(),
                mime_type: mime_type.to_string(),
                data: Vec::new(),
            }),
            captured: self.captured.clone(),
        }))
    }
}

// Commits its buffer on drop, so a partially written document is still visible.
struct MemorySink {
    entry: Option<CapturedOutput>,
    captured: Arc<Mutex<Vec<CapturedOutput>>>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.entry.as_mut() {
            Some(entry) => entry.data.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.captured.lock().push(entry);
        }
    }
}

/// Writes one file per job into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    directory: PathBuf,
}

impl DirectoryOutput {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, job_id: &JobId, mime_type: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", job_id, extension_for(mime_type)))
    }
}

impl OutputTarget for DirectoryOutput {
    fn open(&self, job_id: &JobId, mime_type: &str) -> io::Result<Box<dyn Write + Send>> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for(job_id, mime_type);
        tracing::debug!("Opening output file {}", path.display());
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "application/postscript" => "ps",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        _ => "bin",
    }
}

/// One [`MemoryOutput`] per printer, retrievable by printer name.
#[derive(Debug, Default)]
pub struct MemoryOutputProvider {
    outputs: Mutex<HashMap<String, MemoryOutput>>,
}

impl MemoryOutputProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, printer_name: &str) -> Option<MemoryOutput> {
        self.outputs.lock().get(printer_name).cloned()
    }
}

impl OutputProvider for MemoryOutputProvider {
    fn output_for(&self, printer_name: &str) -> Arc<dyn OutputTarget> {
        let output = self
            .outputs
            .lock()
            .entry(printer_name.to_string())
            .or_default()
            .clone();
        Arc::new(output)
    }
}

/// `<root>/<printer name>/<job id>.<ext>`
#[derive(Debug, Clone)]
pub struct DirectoryOutputProvider {
    root: PathBuf,
}

impl DirectoryOutputProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl OutputProvider for DirectoryOutputProvider {
    fn output_for(&self, printer_name: &str) -> Arc<dyn OutputTarget> {
        Arc::new(DirectoryOutput::new(self.root.join(sanitize(printer_name))))
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

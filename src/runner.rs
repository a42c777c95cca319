//! The boundary between the engine and persisted documents.
//!
//! A [`DocumentSink`] owns the persisted form of one Document. The runner
//! reads, applies, and commits the result back only on success: a failed
//! match performs no write, leaving the sink byte-identical. The read-write
//! sequence is not transactional against concurrent external modification;
//! single-operator, single-run invocations are the target.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::document::{Document, Span};
use crate::engine::{PatchOutcome, PatchRequest};
use crate::locate::LocateError;

/// An external read/write target holding a Document's persisted form.
///
/// The sink is injected rather than hardcoded so callers can patch files,
/// in-memory fixtures, or anything else that round-trips UTF-8 text.
pub trait DocumentSink {
    fn read(&mut self) -> Result<Document, SinkError>;
    fn write(&mut self, document: &Document) -> Result<(), SinkError>;
    /// Human-readable identifier for reporting.
    fn describe(&self) -> String;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} is not valid UTF-8")]
    Encoding { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// What a run did to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RunReport should be checked for patched/already-applied"]
pub enum RunReport {
    /// The sink was rewritten; `span` is the altered region of the document
    /// that was read.
    Patched { span: Span },
    /// Guarded run found the payload already in place; nothing was written.
    AlreadyApplied,
}

/// Read a Document from `sink`, apply `request`, and commit the result.
///
/// On failure no write happens and the sink keeps its prior content.
pub fn run(sink: &mut dyn DocumentSink, request: &PatchRequest) -> Result<RunReport, RunError> {
    let document = sink.read()?;
    let outcome = request.apply(&document)?;
    commit(sink, outcome)
}

/// As [`run`], with the re-run guard of [`PatchRequest::apply_guarded`].
pub fn run_guarded(
    sink: &mut dyn DocumentSink,
    request: &PatchRequest,
) -> Result<RunReport, RunError> {
    let document = sink.read()?;
    let outcome = request.apply_guarded(&document)?;
    commit(sink, outcome)
}

fn commit(sink: &mut dyn DocumentSink, outcome: PatchOutcome) -> Result<RunReport, RunError> {
    match outcome {
        PatchOutcome::Applied { document, span } => {
            sink.write(&document)?;
            Ok(RunReport::Patched { span })
        }
        PatchOutcome::AlreadyApplied { .. } => Ok(RunReport::AlreadyApplied),
    }
}

/// A file-backed sink. UTF-8 is the declared encoding on both read and
/// write; invalid bytes fail the read before any matching happens.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSink for FileSink {
    fn read(&mut self) -> Result<Document, SinkError> {
        let bytes = fs::read(&self.path)?;
        let text = String::from_utf8(bytes).map_err(|_| SinkError::Encoding {
            path: self.path.clone(),
        })?;
        Ok(Document::new(text))
    }

    fn write(&mut self, document: &Document) -> Result<(), SinkError> {
        atomic_write(&self.path, document.as_str().as_bytes())?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the prior content stays.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// An in-memory sink for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    content: String,
}

impl MemorySink {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl DocumentSink for MemorySink {
    fn read(&mut self) -> Result<Document, SinkError> {
        Ok(Document::new(self.content.clone()))
    }

    fn write(&mut self, document: &Document) -> Result<(), SinkError> {
        self.content = document.as_str().to_string();
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

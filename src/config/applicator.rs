//! Batch application of a patch set against a document tree.
//!
//! Groups patches by target file so each file is read once, spliced in
//! memory patch by patch, and written back at most once. A patch that fails
//! to locate leaves the in-memory Document exactly as the previous patch
//! left it; a file none of whose patches applied is never written at all.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{OperationSpec, PatchDefinition, SpliceConfig, VerifySpec};
use crate::document::Document;
use crate::engine::{PatchOutcome, PatchRequest, SpanCheck};
use crate::locate::{BoundaryPattern, LocateError, Marker};
use crate::runner::atomic_write;
use crate::safety::{RootGuard, SafetyError};

/// Result of applying a single patch from a set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchStatus should be checked for applied/already-applied"]
pub enum PatchStatus {
    /// The patch was spliced into the file's Document.
    Applied { file: PathBuf },
    /// The guard found the payload already in place.
    AlreadyApplied { file: PathBuf },
}

impl fmt::Display for PatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchStatus::Applied { file } => write!(f, "applied to {}", file.display()),
            PatchStatus::AlreadyApplied { file } => {
                write!(f, "already applied to {}", file.display())
            }
        }
    }
}

/// Errors during batch application.
#[derive(Debug)]
pub enum ApplicationError {
    /// File or payload I/O failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Target file is not valid UTF-8.
    Encoding { path: PathBuf },
    /// A marker or boundary pattern failed to match.
    Locate { file: PathBuf, source: LocateError },
    /// Target path escaped the declared root.
    Safety { path: PathBuf, reason: String },
    /// The located span did not hold the expected before-text.
    VerifyMismatch { file: PathBuf, found: String },
    /// `verify.expected` was not a parseable hex literal.
    BadHashLiteral { value: String },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Encoding { path } => {
                write!(f, "{} is not valid UTF-8", path.display())
            }
            ApplicationError::Locate { file, source } => {
                write!(f, "match failed in {}: {}", file.display(), source)
            }
            ApplicationError::Safety { path, reason } => {
                write!(f, "unsafe target path {}: {}", path.display(), reason)
            }
            ApplicationError::VerifyMismatch { file, found } => {
                write!(
                    f,
                    "verification failed on {}: span holds {:?}",
                    file.display(),
                    found
                )
            }
            ApplicationError::BadHashLiteral { value } => {
                write!(f, "invalid hash literal {:?} (expected 0x-prefixed hex)", value)
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Locate { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Apply a patch set, writing each touched file back atomically.
///
/// # Arguments
///
/// * `config` - the (validated) patch set
/// * `root` - directory patch targets resolve against when
///   `meta.root_relative` is set
/// * `config_dir` - directory `payload_file` entries resolve against
///   (normally the directory the patch set was loaded from)
///
/// # Returns
///
/// One `(patch id, result)` pair per patch, in config order.
pub fn apply_all(
    config: &SpliceConfig,
    root: &Path,
    config_dir: &Path,
) -> Vec<(String, Result<PatchStatus, ApplicationError>)> {
    run_batch(config, root, config_dir, true)
}

/// Evaluate a patch set without writing anything.
///
/// Result semantics mirror [`apply_all`]: `Applied` means "would apply".
pub fn check_all(
    config: &SpliceConfig,
    root: &Path,
    config_dir: &Path,
) -> Vec<(String, Result<PatchStatus, ApplicationError>)> {
    run_batch(config, root, config_dir, false)
}

fn run_batch(
    config: &SpliceConfig,
    root: &Path,
    config_dir: &Path,
    commit: bool,
) -> Vec<(String, Result<PatchStatus, ApplicationError>)> {
    let guard = if config.meta.root_relative {
        match RootGuard::new(root) {
            Ok(guard) => Some(guard),
            Err(e) => {
                // the root itself is unusable; every patch fails the same way
                let reason = e.to_string();
                return config
                    .patches
                    .iter()
                    .map(|patch| {
                        (
                            patch.id.clone(),
                            Err(ApplicationError::Safety {
                                path: root.to_path_buf(),
                                reason: reason.clone(),
                            }),
                        )
                    })
                    .collect();
            }
        }
    } else {
        None
    };

    // Group patches by resolved target file so each file is read once
    let mut patches_by_file: HashMap<PathBuf, Vec<&PatchDefinition>> = HashMap::new();
    let mut all_results = Vec::new();

    for patch in &config.patches {
        match resolve_target(&patch.file, root, guard.as_ref()) {
            Ok(file_path) => patches_by_file.entry(file_path).or_default().push(patch),
            Err(e) => all_results.push((patch.id.clone(), Err(e))),
        }
    }

    for (file_path, patches) in patches_by_file {
        let bytes = match fs::read(&file_path) {
            Ok(bytes) => bytes,
            Err(source) => {
                // std::io::Error is not Clone; rebuild one per patch
                let kind = source.kind();
                let msg = source.to_string();
                for patch in patches {
                    all_results.push((
                        patch.id.clone(),
                        Err(ApplicationError::Io {
                            path: file_path.clone(),
                            source: std::io::Error::new(kind, msg.clone()),
                        }),
                    ));
                }
                continue;
            }
        };

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                for patch in patches {
                    all_results.push((
                        patch.id.clone(),
                        Err(ApplicationError::Encoding {
                            path: file_path.clone(),
                        }),
                    ));
                }
                continue;
            }
        };

        let original = Document::new(content);
        let mut doc = original.clone();
        let mut file_results = Vec::with_capacity(patches.len());

        for patch in patches {
            match apply_one(patch, &doc, &file_path, config_dir) {
                Ok((next, status)) => {
                    doc = next;
                    file_results.push((patch.id.clone(), Ok(status)));
                }
                Err(e) => file_results.push((patch.id.clone(), Err(e))),
            }
        }

        if commit && doc != original {
            if let Err(source) = atomic_write(&file_path, doc.as_str().as_bytes()) {
                // nothing landed on disk; every patch that applied in memory
                // must report the write failure instead
                let kind = source.kind();
                let msg = source.to_string();
                for (_, result) in file_results.iter_mut() {
                    if result.is_ok() {
                        *result = Err(ApplicationError::Io {
                            path: file_path.clone(),
                            source: std::io::Error::new(kind, msg.clone()),
                        });
                    }
                }
            }
        }

        all_results.extend(file_results);
    }

    // Restore config.patches order; HashMap iteration is unordered.
    let patch_order: HashMap<&str, usize> = config
        .patches
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();
    all_results.sort_by_key(|(id, _)| patch_order.get(id.as_str()).copied().unwrap_or(usize::MAX));

    all_results
}

fn resolve_target(
    file: &str,
    root: &Path,
    guard: Option<&RootGuard>,
) -> Result<PathBuf, ApplicationError> {
    match guard {
        Some(guard) => guard.validate_path(file).map_err(|e| match e {
            SafetyError::OutsideRoot { path, .. } => ApplicationError::Safety {
                path,
                reason: "escapes the declared root".to_string(),
            },
            SafetyError::Canonicalize(source) => ApplicationError::Io {
                path: root.join(file),
                source,
            },
        }),
        None => Ok(PathBuf::from(file)),
    }
}

fn apply_one(
    patch: &PatchDefinition,
    doc: &Document,
    file_path: &Path,
    config_dir: &Path,
) -> Result<(Document, PatchStatus), ApplicationError> {
    let locate_err = |source: LocateError| ApplicationError::Locate {
        file: file_path.to_path_buf(),
        source,
    };

    let payload = resolve_payload(&patch.operation, config_dir)?;
    let request = build_request(&patch.operation, payload).map_err(locate_err)?;

    if let Some(verify) = &patch.verify {
        let span = request.locate(doc).map_err(locate_err)?;
        let found = doc.slice(span);
        if !span_check(verify)?.matches(found) {
            return Err(ApplicationError::VerifyMismatch {
                file: file_path.to_path_buf(),
                found: preview(found),
            });
        }
    }

    let outcome = if patch.guard {
        request.apply_guarded(doc)
    } else {
        request.apply(doc)
    }
    .map_err(locate_err)?;

    Ok(match outcome {
        PatchOutcome::Applied { document, .. } => (
            document,
            PatchStatus::Applied {
                file: file_path.to_path_buf(),
            },
        ),
        PatchOutcome::AlreadyApplied { document } => (
            document,
            PatchStatus::AlreadyApplied {
                file: file_path.to_path_buf(),
            },
        ),
    })
}

fn resolve_payload(
    operation: &OperationSpec,
    config_dir: &Path,
) -> Result<String, ApplicationError> {
    if let Some(inline) = operation.inline_payload() {
        return Ok(inline.to_string());
    }

    // payload files travel with the patch set, not with the target tree
    let relative = operation
        .payload_file()
        .expect("validated: exactly one payload source");
    let path = config_dir.join(relative);
    fs::read_to_string(&path).map_err(|source| ApplicationError::Io { path, source })
}

fn build_request(operation: &OperationSpec, payload: String) -> Result<PatchRequest, LocateError> {
    match operation {
        OperationSpec::Insert { marker, .. } => Ok(PatchRequest::Insert {
            marker: Marker::new(marker.clone())?,
            payload,
        }),
        OperationSpec::Replace { start, boundary, .. } => Ok(PatchRequest::Replace {
            start: Marker::new(start.clone())?,
            boundary: BoundaryPattern::new(boundary.clone())?,
            payload,
        }),
    }
}

fn span_check(verify: &VerifySpec) -> Result<SpanCheck, ApplicationError> {
    match verify {
        VerifySpec::ExactMatch { expected_text } => {
            Ok(SpanCheck::ExactMatch(expected_text.clone()))
        }
        VerifySpec::Hash { expected } => {
            let digits = expected.trim().trim_start_matches("0x");
            u64::from_str_radix(digits, 16)
                .map(SpanCheck::Hash)
                .map_err(|_| ApplicationError::BadHashLiteral {
                    value: expected.clone(),
                })
        }
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut cut = MAX;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

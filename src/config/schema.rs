use serde::Deserialize;
use std::fmt;

/// A patch set: metadata plus an ordered list of patch definitions.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SpliceConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve patch targets against the root passed at application time,
    /// and refuse targets that escape it.
    #[serde(default)]
    pub root_relative: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    pub file: String,
    pub operation: OperationSpec,
    /// Skip the patch when its payload is already in place.
    #[serde(default)]
    pub guard: bool,
    /// Expected before-text for the replaced span (replace only).
    #[serde(default)]
    pub verify: Option<VerifySpec>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperationSpec {
    /// Insert the payload immediately before a literal marker.
    Insert {
        marker: String,
        #[serde(default)]
        payload: Option<String>,
        #[serde(default)]
        payload_file: Option<String>,
    },
    /// Replace from a start marker up to (but not including) a boundary
    /// pattern match.
    Replace {
        start: String,
        boundary: String,
        #[serde(default)]
        payload: Option<String>,
        #[serde(default)]
        payload_file: Option<String>,
    },
}

impl OperationSpec {
    pub fn inline_payload(&self) -> Option<&str> {
        match self {
            OperationSpec::Insert { payload, .. } => payload.as_deref(),
            OperationSpec::Replace { payload, .. } => payload.as_deref(),
        }
    }

    pub fn payload_file(&self) -> Option<&str> {
        match self {
            OperationSpec::Insert { payload_file, .. } => payload_file.as_deref(),
            OperationSpec::Replace { payload_file, .. } => payload_file.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VerifySpec {
    ExactMatch {
        expected_text: String,
    },
    /// xxh3 hash of the expected span, as a hex literal (`0x...`).
    Hash {
        expected: String,
    },
}

impl SpliceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            }
            if patch.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: Some(patch.id.clone()),
                    field: "file",
                });
            }

            match &patch.operation {
                OperationSpec::Insert { marker, .. } => {
                    if marker.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.marker",
                        });
                    }
                    if patch.verify.is_some() {
                        issues.push(ValidationIssue::InvalidCombo {
                            patch_id: Some(patch.id.clone()),
                            message: "verify requires a replace operation".to_string(),
                        });
                    }
                }
                OperationSpec::Replace { start, boundary, .. } => {
                    if start.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.start",
                        });
                    }
                    if boundary.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.boundary",
                        });
                    }
                }
            }

            match (
                patch.operation.inline_payload(),
                patch.operation.payload_file(),
            ) {
                (Some(_), Some(_)) | (None, None) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        patch_id: Some(patch.id.clone()),
                        message: "exactly one of payload and payload_file is required"
                            .to_string(),
                    });
                }
                _ => {}
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch set contains no patches"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch configuration: {message}"),
            },
        }
    }
}

//! Error types for archive content operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for listing, opening and saving archive entries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No archive has been registered with the application context.
    #[error("No archive is open")]
    NoArchiveOpen,

    /// The entry listing could not be produced.
    #[error("Listing failed: {0}")]
    ListingFailed(String),

    /// The archiving tool failed, or the extracted file could not be read.
    #[error("Extraction of '{entry}' failed: {source}")]
    ExtractionFailed {
        entry: String,
        #[source]
        source: ToolError,
    },

    /// The entry was extracted but does not look like text.
    #[error("'{entry}' is a binary file or its text encoding could not be detected")]
    UndecodableContent {
        entry: String,
        /// Best guess of the detector, if any
        encoding: Option<String>,
        confidence: f32,
    },

    /// Writing the entry back into the archive failed. Local edits are kept.
    #[error("Update of '{entry}' failed: {source}")]
    RepackFailed {
        entry: String,
        #[source]
        source: ToolError,
    },

    /// A scratch directory could not be removed. Only ever logged.
    #[error("Could not remove scratch directory {path}: {source}")]
    ScratchCleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A second archive was offered while one is already open.
    #[error("Another archive is already open: {0}")]
    DuplicateOpenAttempt(PathBuf),

    /// The entry's extension is not in the editable allow-list.
    #[error("Entry is not editable: {0}")]
    NotEditable(String),

    /// The entry path would escape the scratch directory.
    #[error("Invalid entry path: {0}")]
    InvalidEntryPath(#[from] SecurityError),

    /// An I/O error occurred outside the archiving tool.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Exit code reported by the archiving tool, when the failure carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::ExtractionFailed { source, .. }
            | PipelineError::RepackFailed { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}

/// Failures of the external archiving tool and the scratch I/O around it.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No archiving tool binary could be located.
    #[error("Archiving tool not found (set sevenZipPath or ZIPEDIT_7Z, or install 7za/7zz/7z)")]
    NotFound,

    /// The tool process could not be started.
    #[error("Could not start archiving tool: {0}")]
    Spawn(std::io::Error),

    /// The tool ran and exited unsuccessfully.
    #[error("{}", exit_message(.code, .detail))]
    Exit {
        /// `None` when the process was terminated by a signal
        code: Option<i32>,
        detail: String,
    },

    /// The tool finished but reported errors for individual files.
    #[error("Tool reported errors for: {}", format_statuses(.0))]
    FileErrors(Vec<FileStatus>),

    /// The scratch directory could not be created.
    #[error("Could not prepare scratch directory: {0}")]
    Scratch(std::io::Error),

    /// The extracted file could not be read back.
    #[error("Could not read extracted file: {0}")]
    Read(std::io::Error),

    /// The edited text could not be staged for the tool.
    #[error("Could not stage file for update: {0}")]
    Write(std::io::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

/// Operations refused by an [`EntrySession`](crate::session::EntrySession).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session holds edits that were never saved.
    #[error("'{0}' has unsaved changes; save or discard them first")]
    UnsavedChanges(String),

    /// The action does not apply in the current state.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Per-file status line reported by the archiving tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// File the status refers to; empty when the tool did not name one
    pub file: String,
    pub message: String,
}

/// Security-related errors for entry paths.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Path traversal attempt detected (e.g., "../../../etc/passwd").
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    /// Absolute path not allowed in archive entries.
    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),

    /// Entry path the archiving tool would parse as a switch (`-`) or a list
    /// file (`@`).
    #[error("Entry path would be read as a tool option: {0}")]
    SwitchLikePath(String),
}

fn exit_message(code: &Option<i32>, detail: &str) -> String {
    let head = match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    if detail.is_empty() {
        head
    } else {
        format!("{}: {}", head, detail)
    }
}

fn format_statuses(statuses: &[FileStatus]) -> String {
    statuses
        .iter()
        .map(|s| {
            if s.file.is_empty() {
                s.message.clone()
            } else {
                format!("{} ({})", s.file, s.message)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

//! User-facing operations, ready to be bound to an IPC layer.
//!
//! Each returns a human-readable message on failure.

use crate::error::{PipelineError, ToolError};
use crate::pipeline::ContentPipeline;
use crate::types::EntryDescriptor;
use std::path::PathBuf;

/// Register the archive delivered by the open-file signal.
pub fn open_archive(pipeline: &ContentPipeline, path: String) -> Result<(), String> {
    let path = PathBuf::from(path);
    if pipeline.slot().try_set(path.clone()) {
        return Ok(());
    }

    let active = pipeline
        .slot()
        .get()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    Err(format!(
        "Another archive is already open ({}). Close it before opening {}.",
        active,
        path.display()
    ))
}

/// List the editable candidates of the open archive. Empty when nothing can
/// be listed.
pub async fn list_zip_entries(pipeline: &ContentPipeline) -> Vec<EntryDescriptor> {
    pipeline.list_entries().await
}

/// Text of `entry_path`, decoded from whatever encoding it was stored in.
pub async fn get_file_content(
    pipeline: &ContentPipeline,
    entry_path: String,
    password: Option<String>,
) -> Result<String, String> {
    pipeline
        .open_entry(&entry_path, password.as_deref())
        .await
        .map(|content| content.text)
        .map_err(|e| user_message(&e))
}

/// Replace `entry_path` with `text`, stored as UTF-8.
pub async fn update_file_content(
    pipeline: &ContentPipeline,
    entry_path: String,
    text: String,
    password: Option<String>,
) -> Result<(), String> {
    pipeline
        .save_entry(&entry_path, &text, password.as_deref())
        .await
        .map_err(|e| user_message(&e))
}

/// Convert a pipeline error to a user-friendly message
pub fn user_message(err: &PipelineError) -> String {
    match err {
        PipelineError::NoArchiveOpen => {
            "No archive is open. Open a ZIP file first.".to_string()
        }
        PipelineError::ListingFailed(msg) => {
            format!("Could not read the archive's file list: {}", msg)
        }
        PipelineError::ExtractionFailed { entry, source } => match source {
            ToolError::FileErrors(_) | ToolError::Exit { .. } => format!(
                "Could not extract '{}'. Check the password. ({})",
                entry, source
            ),
            _ => format!("Could not extract '{}': {}", entry, source),
        },
        PipelineError::UndecodableContent { entry, .. } => format!(
            "'{}' looks like a binary file or uses a text encoding that could not be detected.",
            entry
        ),
        PipelineError::RepackFailed { entry, source } => match source.exit_code() {
            Some(code) => format!(
                "Failed to update '{}' (exit code {}). Your edits are kept.",
                entry, code
            ),
            None => format!(
                "Failed to update '{}': {}. Your edits are kept.",
                entry, source
            ),
        },
        PipelineError::NotEditable(entry) => {
            format!("'{}' cannot be edited: its file type is not in the editable list.", entry)
        }
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::state::ArchiveSlot;
    use std::sync::Arc;

    fn pipeline() -> ContentPipeline {
        let settings = Settings {
            seven_zip_path: Some(PathBuf::from("/nonexistent/7z")),
            ..Settings::default()
        };
        ContentPipeline::from_settings(&settings, Arc::new(ArchiveSlot::new()))
    }

    #[test]
    fn test_second_open_is_refused() {
        let pipeline = pipeline();
        open_archive(&pipeline, "/data/first.zip".to_string()).unwrap();

        let msg = open_archive(&pipeline, "/data/second.zip".to_string()).unwrap_err();
        assert!(msg.contains("/data/first.zip"));
        assert_eq!(pipeline.slot().get(), Some(PathBuf::from("/data/first.zip")));
    }

    #[test]
    fn test_repack_message_has_exit_code() {
        let err = PipelineError::RepackFailed {
            entry: "notes.txt".to_string(),
            source: ToolError::Exit {
                code: Some(2),
                detail: "ERROR: Wrong password".to_string(),
            },
        };
        let msg = user_message(&err);
        assert!(msg.contains("exit code 2"), "{}", msg);
        assert!(msg.contains("notes.txt"));
    }

    #[test]
    fn test_undecodable_message_is_distinct() {
        let undecodable = user_message(&PipelineError::UndecodableContent {
            entry: "a.bin.txt".to_string(),
            encoding: None,
            confidence: 0.0,
        });
        let failed = user_message(&PipelineError::ExtractionFailed {
            entry: "a.bin.txt".to_string(),
            source: ToolError::NotFound,
        });
        assert!(undecodable.contains("binary"));
        assert_ne!(undecodable, failed);
    }

    #[tokio::test]
    async fn test_commands_without_archive() {
        let pipeline = pipeline();
        assert!(list_zip_entries(&pipeline).await.is_empty());

        let msg = get_file_content(&pipeline, "a.txt".to_string(), None)
            .await
            .unwrap_err();
        assert!(msg.contains("No archive is open"));
    }

    #[tokio::test]
    async fn test_list_unreadable_archive_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = pipeline();
        open_archive(&pipeline, dir.path().join("missing.zip").display().to_string()).unwrap();
        assert!(list_zip_entries(&pipeline).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_missing_tool_reports_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            seven_zip_path: Some(dir.path().join("no-such-7z")),
            scratch_root: Some(dir.path().join("scratch")),
            ..Settings::default()
        };
        let pipeline = ContentPipeline::from_settings(&settings, Arc::new(ArchiveSlot::new()));
        open_archive(&pipeline, dir.path().join("a.zip").display().to_string()).unwrap();

        let msg = update_file_content(&pipeline, "a.txt".to_string(), "x".to_string(), None)
            .await
            .unwrap_err();
        assert!(msg.starts_with("Failed to update 'a.txt'"), "{}", msg);
        assert!(msg.contains("Your edits are kept"));
    }
}

//! Write edited text back into the archive.
//!
//! The text is staged at `<scratch>/<entry>` and the archiving tool is run in
//! add mode with the scratch directory as its working directory, so the
//! relative path it records is exactly the entry path. On a decomposing
//! filesystem only the staged file name is decomposed; the tool is still
//! given the entry path as the caller spelled it, and the filesystem resolves
//! that name to the staged file.

use crate::error::{PipelineError, ToolError};
use crate::safety::validate_entry_path;
use crate::scratch::ScratchSpace;
use crate::tool::SevenZip;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;
use unicode_normalization::UnicodeNormalization;

/// Whether this platform's filesystem stores file names decomposed (NFD).
pub const DECOMPOSING_FILESYSTEM: bool = cfg!(target_os = "macos");

/// Form of `entry` to use as an on-disk path.
///
/// On a decomposing filesystem a precomposed name such as `café.txt` is
/// stored as `cafe\u{301}.txt`, so the staged file is written under that form.
/// Elsewhere the entry is used unchanged. Never used as an archive path.
pub fn filesystem_entry_path(entry: &str, decompose: bool) -> Cow<'_, str> {
    if decompose {
        Cow::Owned(entry.nfd().collect())
    } else {
        Cow::Borrowed(entry)
    }
}

/// Stages edited text in a scratch directory and repacks it.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    tool: Option<SevenZip>,
    scratch_root: PathBuf,
    decompose: bool,
}

impl ArchiveWriter {
    pub fn new(tool: Option<SevenZip>, scratch_root: PathBuf) -> Self {
        Self {
            tool,
            scratch_root,
            decompose: DECOMPOSING_FILESYSTEM,
        }
    }

    /// Override the platform's path normalization.
    pub fn with_decomposition(mut self, decompose: bool) -> Self {
        self.decompose = decompose;
        self
    }

    /// Write `text` as UTF-8 to `entry` inside `archive`.
    ///
    /// The scratch directory is removed before this returns, including when
    /// the tool cannot be started.
    pub async fn save_one(
        &self,
        archive: &Path,
        entry: &str,
        text: &str,
        password: Option<&str>,
    ) -> Result<(), PipelineError> {
        let relative = validate_entry_path(entry)?;
        let relative = relative.to_string_lossy();
        let fs_relative = filesystem_entry_path(&relative, self.decompose);

        // The tool runs from the scratch directory, so the archive path must
        // not depend on our working directory
        let archive = std::path::absolute(archive)?;

        let scratch = ScratchSpace::acquire(self.scratch_root.clone())
            .await
            .map_err(|e| PipelineError::RepackFailed {
                entry: entry.to_string(),
                source: ToolError::Scratch(e),
            })?;

        let result = self
            .stage_and_add(&scratch, &archive, &relative, &fs_relative, text, password)
            .await
            .map_err(|source| PipelineError::RepackFailed {
                entry: entry.to_string(),
                source,
            });
        scratch.dispose().await;

        match &result {
            Ok(()) => info!(entry = %entry, bytes = text.len(), "Saved entry"),
            Err(e) => info!(entry = %entry, error = %e, "Save failed"),
        }
        result
    }

    async fn stage_and_add(
        &self,
        scratch: &ScratchSpace,
        archive: &Path,
        relative: &str,
        fs_relative: &str,
        text: &str,
        password: Option<&str>,
    ) -> Result<(), ToolError> {
        let staged = scratch.path().join(fs_relative);
        if let Some(parent) = staged.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ToolError::Write)?;
        }
        tokio::fs::write(&staged, text.as_bytes())
            .await
            .map_err(ToolError::Write)?;

        let tool = self.tool.as_ref().ok_or(ToolError::NotFound)?;
        tool.add(archive, scratch.path(), relative, password)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_entry_path_decomposes() {
        let path = filesystem_entry_path("caf\u{e9}.txt", true);
        assert_eq!(path, "cafe\u{301}.txt");
        assert_ne!(path, "caf\u{e9}.txt");
    }

    #[test]
    fn test_filesystem_entry_path_unchanged() {
        let path = filesystem_entry_path("caf\u{e9}.txt", false);
        assert!(matches!(path, Cow::Borrowed(_)));
        assert_eq!(path, "caf\u{e9}.txt");
    }

    #[test]
    fn test_filesystem_entry_path_ascii_is_stable() {
        assert_eq!(filesystem_entry_path("dir/a.txt", true), "dir/a.txt");
    }

    #[test]
    fn test_default_decomposition_follows_platform() {
        let writer = ArchiveWriter::new(None, std::env::temp_dir());
        assert_eq!(writer.decompose, cfg!(target_os = "macos"));
    }

    #[tokio::test]
    async fn test_missing_tool_cleans_up() {
        let root = tempfile::TempDir::new().unwrap();
        let writer = ArchiveWriter::new(None, root.path().to_path_buf());

        let err = writer
            .save_one(Path::new("sample.zip"), "docs/a.txt", "text", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RepackFailed {
                source: ToolError::NotFound,
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_cleans_up() {
        let root = tempfile::TempDir::new().unwrap();
        let tool = SevenZip::new(root.path().join("no-such-7z"));
        let scratch_root = root.path().join("scratch");
        let writer = ArchiveWriter::new(Some(tool), scratch_root.clone());

        let err = writer
            .save_one(Path::new("sample.zip"), "a.txt", "text", Some("pw"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RepackFailed {
                source: ToolError::Spawn(_),
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(&scratch_root).unwrap().count(), 0);
    }
}

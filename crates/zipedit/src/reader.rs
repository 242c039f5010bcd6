//! Extract a single entry and decode it as text.

use crate::error::{PipelineError, ToolError};
use crate::safety::validate_entry_path;
use crate::scratch::ScratchSpace;
use crate::sniff::{self, EncodingSniffer};
use crate::tool::SevenZip;
use crate::types::DecodedContent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence the detector must exceed before bytes are decoded as text.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.9;

/// Extracts one entry into a scratch directory and decodes it.
#[derive(Clone)]
pub struct ArchiveReader {
    tool: Option<SevenZip>,
    sniffer: Arc<dyn EncodingSniffer>,
    scratch_root: PathBuf,
    threshold: f32,
}

impl ArchiveReader {
    pub fn new(
        tool: Option<SevenZip>,
        sniffer: Arc<dyn EncodingSniffer>,
        scratch_root: PathBuf,
        threshold: f32,
    ) -> Self {
        Self {
            tool,
            sniffer,
            scratch_root,
            threshold,
        }
    }

    /// Extract `entry` from `archive` and return its text.
    ///
    /// The scratch directory is removed before this returns, whatever the
    /// outcome. Per-file errors reported by the tool fail the extraction even
    /// when the tool itself exits successfully.
    pub async fn extract_one(
        &self,
        archive: &Path,
        entry: &str,
        password: Option<&str>,
    ) -> Result<DecodedContent, PipelineError> {
        let relative = validate_entry_path(entry)?;

        let scratch = ScratchSpace::acquire(self.scratch_root.clone())
            .await
            .map_err(|e| PipelineError::ExtractionFailed {
                entry: entry.to_string(),
                source: ToolError::Scratch(e),
            })?;

        let result = self
            .extract_into(&scratch, archive, entry, &relative, password)
            .await;
        scratch.dispose().await;

        match &result {
            Ok(content) => info!(
                entry = %entry,
                encoding = %content.encoding,
                "Opened entry"
            ),
            Err(e) => info!(entry = %entry, error = %e, "Open failed"),
        }
        result
    }

    async fn extract_into(
        &self,
        scratch: &ScratchSpace,
        archive: &Path,
        entry: &str,
        relative: &Path,
        password: Option<&str>,
    ) -> Result<DecodedContent, PipelineError> {
        let failed = |source: ToolError| PipelineError::ExtractionFailed {
            entry: entry.to_string(),
            source,
        };

        let tool = self.tool.as_ref().ok_or_else(|| failed(ToolError::NotFound))?;
        let report = tool
            .extract_one(archive, scratch.path(), entry, password)
            .await
            .map_err(failed)?;

        if !report.file_errors.is_empty() {
            return Err(failed(ToolError::FileErrors(report.file_errors)));
        }

        let bytes = tokio::fs::read(scratch.path().join(relative))
            .await
            .map_err(|e| failed(ToolError::Read(e)))?;

        self.decode(entry, &bytes)
    }

    /// Apply the confidence gate and decode.
    pub fn decode(&self, entry: &str, bytes: &[u8]) -> Result<DecodedContent, PipelineError> {
        let detection = self.sniffer.detect(bytes);
        debug!(
            entry = %entry,
            encoding = ?detection.encoding,
            confidence = detection.confidence,
            "Detected encoding"
        );

        let undecodable = || PipelineError::UndecodableContent {
            entry: entry.to_string(),
            encoding: detection.encoding.clone(),
            confidence: detection.confidence,
        };

        let Some(label) = detection.encoding.as_deref() else {
            return Err(undecodable());
        };
        if detection.confidence <= self.threshold {
            return Err(undecodable());
        }

        let text = sniff::decode(bytes, label).ok_or_else(undecodable)?;
        Ok(DecodedContent {
            text,
            encoding: label.to_string(),
            confidence: detection.confidence,
        })
    }
}

//! Type definitions shared between the pipeline and its callers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One file entry of the open archive, as presented to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export_to = "../../bindings/")]
pub struct EntryDescriptor {
    /// Archive-relative path of the entry
    pub path: String,

    /// Whether the entry is a regular file (directories are filtered out)
    pub is_file: bool,

    /// Whether the entry needs a password to extract
    pub is_encrypted: bool,
}

/// Text of an extracted entry together with the encoding it was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export_to = "../../bindings/")]
#[serde(rename_all = "camelCase")]
pub struct DecodedContent {
    pub text: String,

    /// Label of the source encoding (e.g. "UTF-8", "Shift_JIS")
    pub encoding: String,

    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

/// Result of charset detection. A `None` encoding or low confidence is a
/// normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub encoding: Option<String>,
    pub confidence: f32,
}

impl Detection {
    pub fn new(encoding: impl Into<String>, confidence: f32) -> Self {
        Self {
            encoding: Some(encoding.into()),
            confidence,
        }
    }

    /// Nothing usable was detected.
    pub fn none() -> Self {
        Self {
            encoding: None,
            confidence: 0.0,
        }
    }
}

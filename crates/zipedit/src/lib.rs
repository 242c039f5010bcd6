//! # zipedit
//!
//! Open a text entry of a ZIP archive, edit it, and write it back in place.
//!
//! Entries are listed from the archive bytes in memory, extracted one at a
//! time with an external 7-Zip binary into a throwaway scratch directory,
//! decoded from whatever encoding they were stored in, and repacked as UTF-8
//! under their original path. Encrypted entries take a password.
//!
//! ## Guarantees
//!
//! - Every scratch directory is removed before the operation that created it
//!   returns, on success, on tool failure and when the tool cannot start.
//! - Entries are only decoded when the detector is more than 90% confident
//!   (configurable); anything else is reported as binary.
//! - One archive per process, and one operation on it at a time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zipedit::{ArchiveSlot, ContentPipeline, Settings};
//!
//! # async fn run() -> Result<(), zipedit::PipelineError> {
//! let pipeline = ContentPipeline::from_settings(&Settings::default(), Arc::new(ArchiveSlot::new()));
//! pipeline.slot().try_set("/data/sample.zip");
//!
//! for entry in pipeline.list_entries().await {
//!     println!("{}{}", entry.path, if entry.is_encrypted { " (locked)" } else { "" });
//! }
//!
//! let content = pipeline.open_entry("docs/readme.txt", None).await?;
//! println!("{} [{}]", content.text, content.encoding);
//!
//! pipeline
//!     .save_entry("docs/readme.txt", &format!("{}\nedited", content.text), None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod listing;
pub mod pipeline;
pub mod reader;
pub mod safety;
pub mod scratch;
pub mod session;
pub mod sniff;
pub mod state;
pub mod tool;
pub mod types;
pub mod writer;

// Re-export main types
pub use config::{load_settings, save_settings, settings_path, Settings};
pub use error::{FileStatus, PipelineError, SecurityError, SessionError, ToolError};
pub use listing::EntryLister;
pub use pipeline::ContentPipeline;
pub use reader::ArchiveReader;
pub use scratch::ScratchSpace;
pub use session::{EntrySession, EntryStore, SessionState};
pub use sniff::{CharsetSniffer, EncodingSniffer};
pub use state::ArchiveSlot;
pub use tool::SevenZip;
pub use types::{DecodedContent, Detection, EntryDescriptor};
pub use writer::ArchiveWriter;

//! Orchestration of the open archive: listing, opening and saving entries.
//!
//! Every operation takes the pipeline lock for its whole duration, so against
//! the one open archive there is never more than a single listing, extract or
//! save in flight.

use crate::config::Settings;
use crate::error::PipelineError;
use crate::listing::EntryLister;
use crate::reader::ArchiveReader;
use crate::safety::is_editable;
use crate::sniff::CharsetSniffer;
use crate::state::ArchiveSlot;
use crate::types::{DecodedContent, EntryDescriptor};
use crate::writer::ArchiveWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub struct ContentPipeline {
    slot: Arc<ArchiveSlot>,
    lister: EntryLister,
    reader: ArchiveReader,
    writer: ArchiveWriter,
    editable_extensions: Vec<String>,
    lock: Mutex<()>,
}

impl ContentPipeline {
    pub fn new(
        slot: Arc<ArchiveSlot>,
        lister: EntryLister,
        reader: ArchiveReader,
        writer: ArchiveWriter,
        editable_extensions: Vec<String>,
    ) -> Self {
        Self {
            slot,
            lister,
            reader,
            writer,
            editable_extensions,
            lock: Mutex::new(()),
        }
    }

    /// Build the default pipeline for `settings`.
    pub fn from_settings(settings: &Settings, slot: Arc<ArchiveSlot>) -> Self {
        let tool = settings.tool();
        match &tool {
            Some(tool) => debug!(binary = %tool.binary().display(), "Using archiving tool"),
            None => warn!("No archiving tool found; opening and saving entries will fail"),
        }

        let scratch_root = settings.scratch_root();
        let reader = ArchiveReader::new(
            tool.clone(),
            Arc::new(CharsetSniffer),
            scratch_root.clone(),
            settings.confidence_threshold,
        );
        let writer = ArchiveWriter::new(tool, scratch_root);

        Self::new(
            slot,
            EntryLister::default(),
            reader,
            writer,
            settings.editable_extensions.clone(),
        )
    }

    pub fn slot(&self) -> &ArchiveSlot {
        &self.slot
    }

    /// Whether `entry` may be opened and saved.
    pub fn is_editable(&self, entry: &str) -> bool {
        is_editable(entry, self.editable_extensions.as_slice())
    }

    fn active_archive(&self) -> Result<PathBuf, PipelineError> {
        self.slot.get().ok_or(PipelineError::NoArchiveOpen)
    }

    fn ensure_editable(&self, entry: &str) -> Result<(), PipelineError> {
        if self.is_editable(entry) {
            Ok(())
        } else {
            Err(PipelineError::NotEditable(entry.to_string()))
        }
    }

    /// File entries of the open archive.
    ///
    /// Never fails: with no archive open, an unreadable file or a listing the
    /// scanner cannot produce, the problem is logged and the list is empty.
    pub async fn list_entries(&self) -> Vec<EntryDescriptor> {
        let archive = match self.active_archive() {
            Ok(archive) => archive,
            Err(e) => {
                error!(error = %e, "Cannot list entries");
                return Vec::new();
            }
        };
        let _guard = self.lock.lock().await;

        let bytes = match tokio::fs::read(&archive).await {
            Ok(bytes) => bytes,
            Err(source) => {
                let err = PipelineError::Io(source);
                error!(archive = %archive.display(), error = %err, "Cannot read archive");
                return Vec::new();
            }
        };
        let lister = self.lister.clone();

        match tokio::task::spawn_blocking(move || lister.list(&bytes)).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Listing task failed");
                Vec::new()
            }
        }
    }

    /// Extract and decode `entry` of the open archive.
    pub async fn open_entry(
        &self,
        entry: &str,
        password: Option<&str>,
    ) -> Result<DecodedContent, PipelineError> {
        let archive = self.active_archive()?;
        self.ensure_editable(entry)?;
        let _guard = self.lock.lock().await;

        self.reader.extract_one(&archive, entry, password).await
    }

    /// Write `text` back to `entry` of the open archive.
    pub async fn save_entry(
        &self,
        entry: &str,
        text: &str,
        password: Option<&str>,
    ) -> Result<(), PipelineError> {
        let archive = self.active_archive()?;
        self.ensure_editable(entry)?;
        let _guard = self.lock.lock().await;

        self.writer.save_one(&archive, entry, text, password).await
    }
}

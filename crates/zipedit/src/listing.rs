//! Entry listing through the zipscan C ABI.
//!
//! Each call makes three allocations on the library side: the input buffer,
//! the JSON bytes and the result descriptor. Every one is held by a guard
//! that frees it on drop, so all three are released exactly once whether
//! decoding succeeds or not.

use crate::error::PipelineError;
use crate::types::EntryDescriptor;
use serde::Deserialize;
use std::ptr;
use std::sync::Arc;
use tracing::{debug, error};
use zipscan::{JsonResult, RawEntry};

/// Prefix of the resource-fork folder macOS adds to archives it creates.
const MACOS_METADATA_PREFIX: &str = "__MACOSX";

/// The alloc/list/free surface of a binary-parsing library.
///
/// # Safety
///
/// Implementations must follow the zipscan protocol: pointers handed out by
/// `alloc` and `list_entries` stay valid until passed to the matching free.
pub unsafe trait ScanBackend: Send + Sync {
    fn alloc(&self, len: usize) -> *mut u8;

    /// # Safety
    /// `ptr`/`len` must come from this backend and not have been freed.
    unsafe fn free(&self, ptr: *mut u8, len: usize);

    /// # Safety
    /// `ptr` must be readable for `len` bytes.
    unsafe fn list_entries(&self, ptr: *const u8, len: usize) -> *mut JsonResult;

    /// # Safety
    /// `result` must come from `list_entries` and not have been freed.
    unsafe fn free_result(&self, result: *mut JsonResult);
}

/// The zipscan crate linked into this binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct Zipscan;

unsafe impl ScanBackend for Zipscan {
    fn alloc(&self, len: usize) -> *mut u8 {
        zipscan::zipscan_alloc(len)
    }

    unsafe fn free(&self, ptr: *mut u8, len: usize) {
        unsafe { zipscan::zipscan_free(ptr, len) }
    }

    unsafe fn list_entries(&self, ptr: *const u8, len: usize) -> *mut JsonResult {
        unsafe { zipscan::zipscan_list_entries(ptr, len) }
    }

    unsafe fn free_result(&self, result: *mut JsonResult) {
        unsafe { zipscan::zipscan_free_result(result) }
    }
}

/// A byte region owned by the backend, released with `free`.
struct BackendBuffer<'a> {
    backend: &'a dyn ScanBackend,
    ptr: *mut u8,
    len: usize,
}

impl<'a> BackendBuffer<'a> {
    fn copy_of(backend: &'a dyn ScanBackend, bytes: &[u8]) -> Option<Self> {
        let ptr = backend.alloc(bytes.len());
        if ptr.is_null() {
            return None;
        }
        // SAFETY: alloc returned a writable region of bytes.len() bytes
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        Some(Self {
            backend,
            ptr,
            len: bytes.len(),
        })
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: the region stays allocated until drop
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for BackendBuffer<'_> {
    fn drop(&mut self) {
        // SAFETY: ptr/len came from the backend and are freed only here
        unsafe { self.backend.free(self.ptr, self.len) }
    }
}

/// A result descriptor, released with `free_result`.
struct ResultDescriptor<'a> {
    backend: &'a dyn ScanBackend,
    ptr: *mut JsonResult,
}

impl Drop for ResultDescriptor<'_> {
    fn drop(&mut self) {
        // SAFETY: ptr came from list_entries and is freed only here
        unsafe { self.backend.free_result(self.ptr) }
    }
}

/// What the library returns: the entries, or an error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScanReply {
    Entries(Vec<RawEntry>),
    Failure { error: String },
}

impl From<RawEntry> for EntryDescriptor {
    fn from(raw: RawEntry) -> Self {
        Self {
            path: raw.path,
            is_file: raw.is_file,
            is_encrypted: raw.is_encrypted,
        }
    }
}

/// Drop macOS metadata and anything that is not a regular file.
pub fn filter_entries(entries: Vec<EntryDescriptor>) -> Vec<EntryDescriptor> {
    entries
        .into_iter()
        .filter(|e| e.is_file && !e.path.starts_with(MACOS_METADATA_PREFIX))
        .collect()
}

/// Lists the file entries of an archive held in memory.
#[derive(Clone)]
pub struct EntryLister {
    backend: Arc<dyn ScanBackend>,
}

impl Default for EntryLister {
    fn default() -> Self {
        Self::new(Arc::new(Zipscan))
    }
}

impl EntryLister {
    pub fn new(backend: Arc<dyn ScanBackend>) -> Self {
        Self { backend }
    }

    /// Filtered listing. Failures are logged and yield an empty list.
    pub fn list(&self, archive: &[u8]) -> Vec<EntryDescriptor> {
        match self.try_list(archive) {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Listing archive entries failed");
                Vec::new()
            }
        }
    }

    /// Filtered listing, failing with [`PipelineError::ListingFailed`].
    pub fn try_list(&self, archive: &[u8]) -> Result<Vec<EntryDescriptor>, PipelineError> {
        let backend = self.backend.as_ref();

        let input = BackendBuffer::copy_of(backend, archive)
            .ok_or_else(|| PipelineError::ListingFailed("input allocation failed".into()))?;

        // SAFETY: input is readable for its whole length
        let result = unsafe { backend.list_entries(input.ptr, input.len) };
        if result.is_null() {
            return Err(PipelineError::ListingFailed(
                "scanner returned no result".into(),
            ));
        }
        let result = ResultDescriptor {
            backend,
            ptr: result,
        };

        // SAFETY: the descriptor is valid until `result` drops
        let (json_ptr, json_len) = unsafe { ((*result.ptr).ptr, (*result.ptr).len) };
        let json = BackendBuffer {
            backend,
            ptr: json_ptr,
            len: json_len,
        };

        let reply: ScanReply = serde_json::from_slice(json.as_slice())
            .map_err(|e| PipelineError::ListingFailed(format!("malformed listing: {}", e)))?;

        let entries = match reply {
            ScanReply::Entries(raw) => raw.into_iter().map(EntryDescriptor::from).collect(),
            ScanReply::Failure { error } => return Err(PipelineError::ListingFailed(error)),
        };

        let entries = filter_entries(entries);
        debug!(count = entries.len(), "Listed archive entries");
        Ok(entries)
    }
}

//! # zipscan
//!
//! Lists the entries of a ZIP container held in memory and reports them as
//! JSON across a C ABI, so hosts that only share a flat memory region with the
//! library (a WebAssembly embedder, a foreign runtime) can use it.
//!
//! ## Protocol
//!
//! 1. `zipscan_alloc(len)` reserves an input buffer; the host copies the
//!    archive bytes into it.
//! 2. `zipscan_list_entries(ptr, len)` returns a pointer to a [`JsonResult`]
//!    describing a UTF-8 JSON document. On success the document is an array
//!    `[{"path": .., "is_file": .., "is_encrypted": ..}, ..]`; when the bytes
//!    are not a ZIP container it is an object `{"error": ".."}`.
//! 3. The host releases, in any order and exactly once each: the input buffer
//!    (`zipscan_free(ptr, len)`), the JSON bytes
//!    (`zipscan_free(result.ptr, result.len)`) and the descriptor itself
//!    (`zipscan_free_result(result)`).
//!
//! Rust callers can skip the ABI entirely and use [`scan`].

pub mod scan;

pub use scan::{scan, RawEntry, ScanError};

use serde::Serialize;
use std::ptr;

/// Location of a JSON document owned by the library.
#[repr(C)]
#[derive(Debug)]
pub struct JsonResult {
    pub ptr: *mut u8,
    pub len: usize,
}

#[derive(Serialize)]
struct ScanFailure {
    error: String,
}

/// Allocate a zeroed buffer of `len` bytes owned by the library.
#[no_mangle]
pub extern "C" fn zipscan_alloc(len: usize) -> *mut u8 {
    let buffer = vec![0u8; len].into_boxed_slice();
    Box::into_raw(buffer) as *mut u8
}

/// Release a buffer returned by [`zipscan_alloc`] or a [`JsonResult`] payload.
///
/// # Safety
///
/// `ptr` must come from this library with exactly `len` bytes and must not
/// be freed twice. Null is ignored.
#[no_mangle]
pub unsafe extern "C" fn zipscan_free(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: caller guarantees ptr/len describe a boxed slice we handed out
    unsafe { drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len))) }
}

/// Scan `len` bytes at `ptr` and return a descriptor of the JSON listing.
///
/// Returns null only when `ptr` is null or the listing cannot be serialized.
///
/// # Safety
///
/// `ptr` must be valid for reads of `len` bytes for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn zipscan_list_entries(ptr: *const u8, len: usize) -> *mut JsonResult {
    if ptr.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: caller guarantees the region is readable
    let data = unsafe { std::slice::from_raw_parts(ptr, len) };

    let json = match scan::scan(data) {
        Ok(entries) => serde_json::to_vec(&entries),
        Err(e) => serde_json::to_vec(&ScanFailure {
            error: e.to_string(),
        }),
    };
    let Ok(json) = json else {
        return ptr::null_mut();
    };

    let bytes = json.into_boxed_slice();
    let len = bytes.len();
    let json_ptr = Box::into_raw(bytes) as *mut u8;

    Box::into_raw(Box::new(JsonResult { ptr: json_ptr, len }))
}

/// Release a descriptor returned by [`zipscan_list_entries`].
///
/// The JSON bytes it points to are released separately with [`zipscan_free`].
///
/// # Safety
///
/// `ptr` must come from [`zipscan_list_entries`] and must not be freed twice.
/// Null is ignored.
#[no_mangle]
pub unsafe extern "C" fn zipscan_free_result(ptr: *mut JsonResult) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: caller guarantees ptr came from Box::into_raw above
    unsafe { drop(Box::from_raw(ptr)) }
}

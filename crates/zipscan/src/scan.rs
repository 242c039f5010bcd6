//! Entry discovery for ZIP containers.
//!
//! The central directory is authoritative and is read first. Archives whose
//! central directory is missing or damaged (truncated downloads, partially
//! written files) are walked forward through their local file headers instead,
//! which recovers every entry whose header survived.

use encoding_rs::SHIFT_JIS;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

const LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"PK\x03\x04";
const LOCAL_HEADER_LEN: usize = 30;

/// General purpose bit 0: entry data is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose bit 3: sizes live in a trailing data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
/// General purpose bit 11: file name is UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// One record as reported to callers of the listing ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub path: String,
    pub is_file: bool,
    pub is_encrypted: bool,
}

/// Errors produced while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Neither the central directory nor any local header could be read.
    #[error("Not a ZIP archive: {0}")]
    NotAZip(String),
}

/// List every entry in `data`, directories included.
pub fn scan(data: &[u8]) -> Result<Vec<RawEntry>, ScanError> {
    match scan_central_directory(data) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            let entries = scan_local_headers(data);
            if entries.is_empty() {
                Err(ScanError::NotAZip(e.to_string()))
            } else {
                Ok(entries)
            }
        }
    }
}

/// Read entries from the central directory without decrypting anything.
pub fn scan_central_directory(data: &[u8]) -> Result<Vec<RawEntry>, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        // Raw access: encrypted entries would otherwise demand a password
        let file = archive.by_index_raw(i)?;
        let path = decode_name(file.name_raw(), false);

        entries.push(RawEntry {
            is_file: !path.ends_with('/'),
            is_encrypted: file.encrypted(),
            path,
        });
    }

    Ok(entries)
}

/// Walk local file headers from the start of `data`.
///
/// Payloads are skipped when the header states their size; entries written
/// with a data descriptor fall back to a byte-wise search for the next
/// signature.
pub fn scan_local_headers(data: &[u8]) -> Vec<RawEntry> {
    let mut entries = Vec::new();
    let mut i = 0usize;

    while i + LOCAL_HEADER_LEN <= data.len() {
        if &data[i..i + 4] != LOCAL_HEADER_SIGNATURE {
            i += 1;
            continue;
        }

        let flags = read_u16(data, i + 6);
        let compressed_size = read_u32(data, i + 18);
        let name_len = read_u16(data, i + 26) as usize;
        let extra_len = read_u16(data, i + 28) as usize;

        let name_start = i + LOCAL_HEADER_LEN;
        let name_end = name_start + name_len;
        if name_end > data.len() {
            break;
        }

        let path = decode_name(&data[name_start..name_end], flags & FLAG_UTF8 != 0);
        entries.push(RawEntry {
            is_file: !path.ends_with('/'),
            is_encrypted: flags & FLAG_ENCRYPTED != 0,
            path,
        });

        let mut next = name_end.saturating_add(extra_len);
        // 0xFFFFFFFF means the real size is in a ZIP64 extra field
        if flags & FLAG_DATA_DESCRIPTOR == 0 && compressed_size != u32::MAX {
            next = next.saturating_add(compressed_size as usize);
        }
        i = next.max(i + 1);
    }

    entries
}

/// Decode an entry name.
///
/// Names flagged as UTF-8, or that happen to be valid UTF-8, are used as is.
/// Anything else is assumed to come from a Japanese-locale archiver and is
/// decoded as Shift_JIS.
pub fn decode_name(raw: &[u8], utf8_flag: bool) -> String {
    match std::str::from_utf8(raw) {
        Ok(name) => name.to_string(),
        Err(_) if utf8_flag => String::from_utf8_lossy(raw).into_owned(),
        Err(_) => SHIFT_JIS.decode(raw).0.into_owned(),
    }
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

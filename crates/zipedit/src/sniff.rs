//! Text encoding detection.
//!
//! Cheap structural checks run first: a byte-order mark is decisive, NUL bytes
//! mean binary, and valid UTF-8 is taken as UTF-8 (everything this tool writes
//! back is UTF-8, so re-opening a saved entry must never hinge on statistics).
//! Only the remaining inputs go through the statistical detector.

use crate::types::Detection;
use encoding_rs::Encoding;

/// Detects the most likely encoding of a byte buffer. Pure and synchronous.
pub trait EncodingSniffer: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Detection;
}

/// Default sniffer backed by the universal charset detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharsetSniffer;

impl EncodingSniffer for CharsetSniffer {
    fn detect(&self, bytes: &[u8]) -> Detection {
        if bytes.is_empty() {
            return Detection::new(encoding_rs::UTF_8.name(), 1.0);
        }

        if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
            return Detection::new(encoding.name(), 1.0);
        }

        if bytes.contains(&0) {
            return Detection::none();
        }

        if std::str::from_utf8(bytes).is_ok() {
            return Detection::new(encoding_rs::UTF_8.name(), 1.0);
        }

        let (charset, confidence, _language) = chardet::detect(&bytes.to_vec());
        if charset.is_empty() {
            return Detection {
                encoding: None,
                confidence: confidence.clamp(0.0, 1.0),
            };
        }

        let label = chardet::charset2encoding(&charset).to_string();
        Detection::new(label, confidence.clamp(0.0, 1.0))
    }
}

/// Resolve a detector label to a decoder.
///
/// Labels encoding_rs does not know, and labels it maps to the "replacement"
/// encoding (which decodes everything to U+FFFD), resolve to `None`.
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    let trimmed = label.trim();
    // Python-style BOM variants
    let trimmed = trimmed
        .strip_suffix("-SIG")
        .or_else(|| trimmed.strip_suffix("-sig"))
        .unwrap_or(trimmed);

    Encoding::for_label(trimmed.as_bytes()).filter(|e| *e != encoding_rs::REPLACEMENT)
}

/// Decode `bytes` as `label`. A byte-order mark, if present, wins and is
/// stripped. Returns `None` when the label is unusable or the bytes are not
/// valid in that encoding.
pub fn decode(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = lookup(label)?;
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = actual.name(), "Malformed input for detected encoding");
        return None;
    }
    Some(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_empty_is_utf8() {
        let d = CharsetSniffer.detect(b"");
        assert_eq!(d.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn test_detect_utf8_multibyte() {
        let d = CharsetSniffer.detect("café – naïve 日本語".as_bytes());
        assert_eq!(d.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn test_detect_bom() {
        let d = CharsetSniffer.detect(b"\xFF\xFEh\0i\0");
        assert_eq!(d.encoding.as_deref(), Some("UTF-16LE"));
        assert_eq!(d.confidence, 1.0);

        let d = CharsetSniffer.detect(b"\xEF\xBB\xBFhello");
        assert_eq!(d.encoding.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_detect_binary() {
        let d = CharsetSniffer.detect(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR");
        assert_eq!(d.encoding, None);
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_detect_statistical_confidence_in_range() {
        let d = CharsetSniffer.detect(b"caf\xe9 cr\xe8me br\xfbl\xe9e");
        assert!((0.0..=1.0).contains(&d.confidence));
    }

    #[test]
    fn test_decode_bom_is_stripped() {
        assert_eq!(decode(b"\xFF\xFEh\0i\0", "UTF-16LE").unwrap(), "hi");
        assert_eq!(decode(b"\xEF\xBB\xBFhello", "UTF-8").unwrap(), "hello");
    }

    #[test]
    fn test_decode_shift_jis() {
        // "メモ" in Shift_JIS
        let bytes = [0x83, 0x81, 0x83, 0x82];
        assert_eq!(decode(&bytes, "SHIFT_JIS").unwrap(), "メモ");
        assert_eq!(decode(&bytes, "windows-31j").unwrap(), "メモ");
    }

    #[test]
    fn test_decode_malformed_is_none() {
        assert!(decode(b"caf\xe9", "UTF-8").is_none());
        // Truncated double-byte sequence
        assert!(decode(&[0x83, 0x81, 0x83], "SHIFT_JIS").is_none());
    }

    #[test]
    fn test_lookup_labels() {
        assert_eq!(lookup("UTF-8-SIG"), Some(encoding_rs::UTF_8));
        assert_eq!(lookup(" euc-jp "), Some(encoding_rs::EUC_JP));
        assert!(lookup("UTF-32").is_none());
        assert!(lookup("hz-gb-2312").is_none());
        assert!(lookup("").is_none());
    }
}

mod common;

use common::create_zip;
use proptest::prelude::*;
use tempfile::TempDir;
use zipedit::listing::filter_entries;
use zipedit::{EntryDescriptor, EntryLister, PipelineError};

fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.zip");
    create_zip(&path, files).unwrap();
    std::fs::read(path).unwrap()
}

#[test]
fn test_list_filters_directories_and_macos_metadata() {
    let bytes = zip_bytes(&[
        ("notes/", b""),
        ("notes/todo.txt", b"- write tests"),
        ("__MACOSX/", b""),
        ("__MACOSX/notes/._todo.txt", b"resource fork"),
        ("config.json", b"{}"),
    ]);

    let entries = EntryLister::default().list(&bytes);
    assert_eq!(
        entries,
        vec![
            EntryDescriptor {
                path: "notes/todo.txt".to_string(),
                is_file: true,
                is_encrypted: false,
            },
            EntryDescriptor {
                path: "config.json".to_string(),
                is_file: true,
                is_encrypted: false,
            },
        ]
    );
}

#[test]
fn test_list_keeps_unicode_names() {
    let bytes = zip_bytes(&[("\u{65e5}\u{672c}/\u{30e1}\u{30e2}.txt", b"memo")]);
    let entries = EntryLister::default().list(&bytes);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "\u{65e5}\u{672c}/\u{30e1}\u{30e2}.txt");
}

#[test]
fn test_try_list_reports_non_zip() {
    let err = EntryLister::default()
        .try_list(b"plain text, not an archive")
        .unwrap_err();
    assert!(matches!(err, PipelineError::ListingFailed(_)));
}

#[test]
fn test_list_truncated_archive_recovers_entries() {
    let bytes = zip_bytes(&[("a.txt", b"first"), ("b.txt", b"second")]);
    // Chop off the central directory
    let truncated = &bytes[..bytes.len() - 40];

    let entries = EntryLister::default().list(truncated);
    let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_entry_descriptor_serialization() {
    let entry = EntryDescriptor {
        path: "secret/notes.txt".to_string(),
        is_file: true,
        is_encrypted: true,
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"path": "secret/notes.txt", "is_file": true, "is_encrypted": true})
    );
}

fn arb_entry() -> impl Strategy<Value = EntryDescriptor> {
    let path = prop_oneof![
        "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.(txt|md|png)",
        "__MACOSX(/[a-z._]{1,8}){0,2}",
        "[a-z]{1,8}/",
    ];
    (path, any::<bool>(), any::<bool>()).prop_map(|(path, is_file, is_encrypted)| {
        EntryDescriptor {
            path,
            is_file,
            is_encrypted,
        }
    })
}

proptest! {
    #[test]
    fn prop_filter_is_idempotent(entries in proptest::collection::vec(arb_entry(), 0..32)) {
        let once = filter_entries(entries);
        let twice = filter_entries(once.clone());
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn prop_filter_drops_directories_and_metadata(
        entries in proptest::collection::vec(arb_entry(), 0..32)
    ) {
        let kept = filter_entries(entries.clone());
        for entry in &kept {
            prop_assert!(entry.is_file);
            prop_assert!(!entry.path.starts_with("__MACOSX"));
        }
        let expected = entries
            .iter()
            .filter(|e| e.is_file && !e.path.starts_with("__MACOSX"))
            .count();
        prop_assert_eq!(kept.len(), expected);
    }
}

use crate::error::PipelineError;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The archive this process is working on. Set once; a second path offered
/// while one is active is refused and the active path stays.
#[derive(Debug, Default)]
pub struct ArchiveSlot {
    path: Mutex<Option<PathBuf>>,
}

impl ArchiveSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` as the open archive. Returns false, leaving the slot
    /// unchanged, when an archive is already open.
    pub fn try_set(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let mut slot = self.path.lock();

        if let Some(active) = slot.as_ref() {
            let err = PipelineError::DuplicateOpenAttempt(path);
            warn!(active = %active.display(), error = %err, "Ignoring archive open");
            return false;
        }

        info!(path = %path.display(), "Archive opened");
        *slot = Some(path);
        true
    }

    pub fn get(&self) -> Option<PathBuf> {
        self.path.lock().clone()
    }

    /// Whether `path` is the open archive.
    pub fn is_active(&self, path: &Path) -> bool {
        self.path.lock().as_deref() == Some(path)
    }

    /// Forget the open archive, e.g. when its window closes.
    pub fn clear(&self) {
        self.path.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_open_wins() {
        let slot = ArchiveSlot::new();
        assert!(slot.get().is_none());

        assert!(slot.try_set("/data/first.zip"));
        assert!(!slot.try_set("/data/second.zip"));
        assert_eq!(slot.get(), Some(PathBuf::from("/data/first.zip")));
        assert!(slot.is_active(Path::new("/data/first.zip")));
        assert!(!slot.is_active(Path::new("/data/second.zip")));
    }

    #[test]
    fn test_same_path_twice_is_refused() {
        let slot = ArchiveSlot::new();
        assert!(slot.try_set("/data/a.zip"));
        assert!(!slot.try_set("/data/a.zip"));
    }

    #[test]
    fn test_clear_allows_new_open() {
        let slot = ArchiveSlot::new();
        assert!(slot.try_set("/data/a.zip"));
        slot.clear();
        assert!(slot.get().is_none());
        assert!(slot.try_set("/data/b.zip"));
        assert_eq!(slot.get(), Some(PathBuf::from("/data/b.zip")));
    }

    #[test]
    fn test_concurrent_opens_have_one_winner() {
        let slot = Arc::new(ArchiveSlot::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let slot = slot.clone();
                std::thread::spawn(move || slot.try_set(format!("/data/{}.zip", i)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(slot.get().is_some());
    }
}

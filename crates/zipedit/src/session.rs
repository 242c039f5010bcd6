//! Lifecycle of one open entry.
//!
//! ```text
//! Idle -> Extracting -> Decoded -> Editing -> Saving -> Decoded
//!               \-> Failed                     \-> Editing (save failed)
//! ```
//!
//! Every transition takes `&mut self`, so a session never runs two
//! operations at once. A failed save keeps the draft.

use crate::error::{PipelineError, SessionError};
use crate::pipeline::ContentPipeline;
use crate::types::DecodedContent;
use std::future::Future;
use tracing::debug;

/// Where entries are opened from and saved to.
pub trait EntryStore {
    fn open_entry(
        &self,
        entry: &str,
        password: Option<&str>,
    ) -> impl Future<Output = Result<DecodedContent, PipelineError>> + Send;

    fn save_entry(
        &self,
        entry: &str,
        text: &str,
        password: Option<&str>,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

impl EntryStore for ContentPipeline {
    fn open_entry(
        &self,
        entry: &str,
        password: Option<&str>,
    ) -> impl Future<Output = Result<DecodedContent, PipelineError>> + Send {
        ContentPipeline::open_entry(self, entry, password)
    }

    fn save_entry(
        &self,
        entry: &str,
        text: &str,
        password: Option<&str>,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send {
        ContentPipeline::save_entry(self, entry, text, password)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Extracting,
    Decoded(DecodedContent),
    Editing {
        base: DecodedContent,
        draft: String,
    },
    Saving {
        base: DecodedContent,
        draft: String,
    },
    Failed(String),
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Extracting => "extracting",
            SessionState::Decoded(_) => "decoded",
            SessionState::Editing { .. } => "editing",
            SessionState::Saving { .. } => "saving",
            SessionState::Failed(_) => "failed",
        }
    }
}

/// One entry of the open archive and its local edits.
#[derive(Debug)]
pub struct EntrySession {
    entry: String,
    password: Option<String>,
    state: SessionState,
}

impl EntrySession {
    pub fn new(entry: impl Into<String>, password: Option<String>) -> Self {
        Self {
            entry: entry.into(),
            password,
            state: SessionState::Idle,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Text as currently shown: the draft while editing, else the decoded text.
    pub fn text(&self) -> Option<&str> {
        match &self.state {
            SessionState::Decoded(content) => Some(&content.text),
            SessionState::Editing { draft, .. } | SessionState::Saving { draft, .. } => {
                Some(draft)
            }
            _ => None,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        matches!(
            self.state,
            SessionState::Editing { .. } | SessionState::Saving { .. }
        )
    }

    /// Use `password` for subsequent opens and saves.
    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    /// Extract and decode the entry. Refused while there are unsaved edits.
    pub async fn open<S: EntryStore>(&mut self, store: &S) -> Result<&str, SessionError> {
        if self.has_unsaved_changes() {
            return Err(SessionError::UnsavedChanges(self.entry.clone()));
        }

        self.transition(SessionState::Extracting);
        match store.open_entry(&self.entry, self.password.as_deref()).await {
            Ok(content) => {
                self.transition(SessionState::Decoded(content));
                Ok(self.text().unwrap_or_default())
            }
            Err(e) => {
                self.transition(SessionState::Failed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Replace the local text.
    pub fn edit(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let draft = text.into();
        let base = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Decoded(base)
            | SessionState::Editing { base, .. }
            | SessionState::Saving { base, .. } => base,
            other => {
                let state = other.name();
                self.state = other;
                return Err(SessionError::InvalidTransition {
                    action: "edit",
                    state,
                });
            }
        };
        self.transition(SessionState::Editing { base, draft });
        Ok(())
    }

    /// Drop local edits. The caller confirms with the user first.
    pub fn discard(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Editing { base, .. } | SessionState::Saving { base, .. } => {
                self.transition(SessionState::Decoded(base));
                Ok(())
            }
            other => {
                let state = other.name();
                self.state = other;
                Err(SessionError::InvalidTransition {
                    action: "discard",
                    state,
                })
            }
        }
    }

    /// Write the draft back. On failure the session stays in `Editing`.
    pub async fn save<S: EntryStore>(&mut self, store: &S) -> Result<(), SessionError> {
        let (base, draft) = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Editing { base, draft } | SessionState::Saving { base, draft } => {
                (base, draft)
            }
            other => {
                let state = other.name();
                self.state = other;
                return Err(SessionError::InvalidTransition {
                    action: "save",
                    state,
                });
            }
        };

        self.transition(SessionState::Saving {
            base: base.clone(),
            draft: draft.clone(),
        });

        match store
            .save_entry(&self.entry, &draft, self.password.as_deref())
            .await
        {
            Ok(()) => {
                // Saved text is always UTF-8
                self.transition(SessionState::Decoded(DecodedContent {
                    text: draft,
                    encoding: encoding_rs::UTF_8.name().to_string(),
                    confidence: 1.0,
                }));
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Editing { base, draft });
                Err(e.into())
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            entry = %self.entry,
            from = self.state.name(),
            to = next.name(),
            "Session transition"
        );
        self.state = next;
    }
}

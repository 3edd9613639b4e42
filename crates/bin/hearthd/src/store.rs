//! JSON state-document persistence.
//!
//! The document survives restarts so named actuators and sensor
//! subscriptions come back after a reboot. A missing file is not an error —
//! a fresh installation starts from an empty document.

use std::path::PathBuf;

use hearth_domain::document::StateDocument;

/// Loads and saves the state document at a fixed path.
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Create a store for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the document, or the default empty shape when the file does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load(&self) -> Result<StateDocument, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(StoreError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(StateDocument::default())
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Write the document back to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when serialization or the write fails.
    pub fn save(&self, document: &StateDocument) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(document).map_err(StoreError::Parse)?;
        std::fs::write(&self.path, content).map_err(StoreError::Io)
    }
}

/// State-document persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("failed to access state document")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization failure.
    #[error("failed to parse state document")]
    Parse(#[from] serde_json::Error),
}

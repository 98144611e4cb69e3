//! Export handle for capturing the composed meme.
//!
//! An [`ExportHandle`] is created by the embedder and passed to the component
//! in its props. Every render publishes the latest composition into the handle;
//! the embedder keeps its clone and takes a [`Snapshot`] whenever it wants to
//! save or share the image.

use crate::{DisplaySize, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// One composed frame
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Display size the frame was composed at, `None` while the image was pending
    pub size: Option<DisplaySize>,
    /// SVG markup
    pub svg: String,
}

impl Snapshot {
    /// Hex-encoded SHA-256 of the markup, suitable as a content address
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.svg.as_bytes()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.svg.as_bytes())?;
        Ok(())
    }
}

/// Shared slot holding the most recent [`Snapshot`]
#[derive(Debug, Clone, Default)]
pub struct ExportHandle {
    latest: Arc<Mutex<Option<Snapshot>>>,
}

impl ExportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, snapshot: Snapshot) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// The latest composition, if anything has been rendered yet
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the latest composition was made with a known display size
    pub fn is_ready(&self) -> bool {
        self.snapshot().map(|s| s.size.is_some()).unwrap_or(false)
    }
}

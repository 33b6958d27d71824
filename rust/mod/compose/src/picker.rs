//! Image selection: file → data URL, newest selection wins.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use picpost_blob::{DataUrl, mime_for_path};

use crate::error::PickError;

/// Issued when a file is chosen. Only the most recently issued ticket may
/// apply its read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PickTicket(u64);

/// Hands out monotonically increasing pick tickets.
#[derive(Debug, Default)]
pub struct PickSequence {
    latest: AtomicU64,
}

impl PickSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> PickTicket {
        PickTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: PickTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Whether a finished read was applied to the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    Applied,
    /// A newer selection was made while this one was being read.
    Superseded,
}

/// Read a local file into a data URL, typing it by extension.
pub async fn read_data_url(path: &Path) -> Result<DataUrl, PickError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| PickError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(DataUrl::from_bytes(mime_for_path(path), &bytes))
}

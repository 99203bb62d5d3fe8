//! Card reader session.
//!
//! Wraps a reader transport and turns each scan into a [`ScanResult`]. The
//! reader is opened once; if that fails, every later scan returns
//! [`ScanResult::Unavailable`] immediately instead of blocking. Tags whose
//! identifier cannot be encoded become [`ScanResult::Failed`], which the
//! controller treats like no card.

use std::time::Duration;

use autolock_core::{CardId, ScanResult};
use autolock_hardware::{AnyCardReader, CardReader, ReaderInfo};
use tracing::{debug, info, warn};

/// One reader, opened once.
#[derive(Debug)]
pub struct CardSession {
    reader: AnyCardReader,
    info: Option<ReaderInfo>,
}

impl CardSession {
    /// Open `reader` and wrap it.
    ///
    /// Never fails: a reader that cannot be opened yields a session whose
    /// scans all report `Unavailable`.
    pub async fn open(mut reader: AnyCardReader) -> Self {
        let info = match reader.open().await {
            Ok(info) => {
                info!(
                    "Card reader ready: {} ({})",
                    info.name,
                    info.protocols.join(", ")
                );
                Some(info)
            }
            Err(e) => {
                warn!("Card reader unavailable, scans disabled: {}", e);
                None
            }
        };

        Self { reader, info }
    }

    /// Returns `true` if the reader opened successfully.
    pub fn is_available(&self) -> bool {
        self.info.is_some()
    }

    /// Reader metadata, if it opened.
    pub fn info(&self) -> Option<&ReaderInfo> {
        self.info.as_ref()
    }

    /// Wait up to `timeout` for one tag.
    pub async fn scan(&mut self, timeout: Duration) -> ScanResult {
        if self.info.is_none() {
            return ScanResult::Unavailable;
        }

        match self.reader.scan_once(timeout).await {
            Ok(None) => ScanResult::NoCard,
            Ok(Some(read)) => match CardId::from_bytes(&read.uid) {
                Ok(id) => {
                    debug!(
                        "Read {} tag {} at {}",
                        read.tag_type.name(),
                        id,
                        read.timestamp.format("%H:%M:%S%.3f")
                    );
                    ScanResult::Card(id)
                }
                Err(e) => {
                    warn!("Discarding {} tag: {}", read.tag_type.name(), e);
                    ScanResult::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) if e.is_unavailable() => {
                debug!("Card reader unavailable: {}", e);
                ScanResult::Unavailable
            }
            Err(e) => {
                warn!("Card scan failed: {}", e);
                ScanResult::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

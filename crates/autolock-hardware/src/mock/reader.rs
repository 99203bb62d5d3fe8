//! Mock card reader implementation for testing and development.
//!
//! This module provides a simulated card reader transport that can be
//! controlled programmatically for testing without a physical reader.

use super::lock;
use crate::{
    HardwareError, Result,
    traits::{CardRead, CardReader, TagType},
    types::ReaderInfo,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct ReaderState {
    present: bool,
    opened: bool,
    scans: usize,
    glitch: Option<String>,
}

/// Mock card reader.
///
/// Tags are presented through a [`MockCardReaderHandle`] and delivered to
/// the next `scan_once` call. A reader created with
/// [`MockCardReader::unplugged`] fails to open, like a host without a reader
/// attached.
///
/// # Examples
///
/// ```
/// use autolock_hardware::mock::MockCardReader;
/// use autolock_hardware::traits::CardReader;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> autolock_hardware::Result<()> {
///     let (mut reader, handle) = MockCardReader::new();
///     reader.open().await?;
///
///     handle.present_card(vec![0x04, 0xA1, 0xB2, 0xC3]).await?;
///
///     let read = reader.scan_once(Duration::from_secs(1)).await?;
///     assert_eq!(read.map(|r| r.uid), Some(vec![0x04, 0xA1, 0xB2, 0xC3]));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    /// Channel receiver for presented tags
    event_rx: mpsc::Receiver<CardRead>,

    /// Device name
    name: String,

    /// State shared with the handle
    state: Arc<Mutex<ReaderState>>,
}

impl MockCardReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockCardReader, MockCardReaderHandle) where the
    /// handle can be used to present tags.
    pub fn new() -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock NFC Reader".to_string(), true)
    }

    /// Create a reader that fails to open.
    pub fn unplugged() -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock NFC Reader".to_string(), false)
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String, present: bool) -> (Self, MockCardReaderHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(ReaderState {
            present,
            ..Default::default()
        }));

        let reader = Self {
            event_rx,
            name,
            state: Arc::clone(&state),
        };

        let handle = MockCardReaderHandle { event_tx, state };

        (reader, handle)
    }
}

impl CardReader for MockCardReader {
    async fn open(&mut self) -> Result<ReaderInfo> {
        let mut state = lock(&self.state);
        if !state.present {
            return Err(HardwareError::initialization_failed(format!(
                "{}: no such device",
                self.name
            )));
        }
        state.opened = true;

        Ok(ReaderInfo::new(
            self.name.clone(),
            vec!["ISO14443A".to_string(), "FeliCa".to_string()],
        ))
    }

    async fn scan_once(&mut self, timeout: Duration) -> Result<Option<CardRead>> {
        {
            let mut state = lock(&self.state);
            if !state.present || !state.opened {
                return Err(HardwareError::disconnected(self.name.clone()));
            }
            state.scans += 1;
            if let Some(message) = state.glitch.take() {
                return Err(HardwareError::communication(message));
            }
        }

        match tokio::time::timeout(timeout, self.event_rx.recv()).await {
            Ok(Some(read)) => Ok(Some(read)),
            Ok(None) => Err(HardwareError::disconnected("Card event channel closed")),
            Err(_) => Ok(None),
        }
    }
}

/// Handle for controlling a mock card reader.
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    /// Channel sender for presented tags
    event_tx: mpsc::Sender<CardRead>,

    /// State shared with the reader
    state: Arc<Mutex<ReaderState>>,
}

impl MockCardReaderHandle {
    /// Present a FeliCa tag with the given identifier bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_card(&self, uid: Vec<u8>) -> Result<()> {
        self.present(CardRead::new(uid, TagType::Type3)).await
    }

    /// Present an arbitrary tag read, including malformed ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present(&self, read: CardRead) -> Result<()> {
        self.event_tx
            .send(read)
            .await
            .map_err(|_| HardwareError::disconnected("Card event channel closed"))
    }

    /// Make the next scan fail with a transient communication error.
    pub fn glitch(&self, message: impl Into<String>) {
        lock(&self.state).glitch = Some(message.into());
    }

    /// Simulate pulling the reader's cable.
    pub fn unplug(&self) {
        lock(&self.state).present = false;
    }

    /// Number of scans that reached the transport.
    pub fn scan_count(&self) -> usize {
        lock(&self.state).scans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_present_and_scan() {
        let (mut reader, handle) = MockCardReader::new();
        reader.open().await.unwrap();

        let uid = vec![0x04, 0xA1, 0xB2, 0xC3];
        handle.present_card(uid.clone()).await.unwrap();

        let read = reader
            .scan_once(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.uid, uid);
        assert_eq!(read.tag_type, TagType::Type3);
        assert_eq!(handle.scan_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_times_out_without_tag() {
        let (mut reader, _handle) = MockCardReader::new();
        reader.open().await.unwrap();

        let start = tokio::time::Instant::now();
        let read = reader.scan_once(Duration::from_secs(1)).await.unwrap();

        assert!(read.is_none());
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unplugged_reader_fails_to_open() {
        let (mut reader, handle) = MockCardReader::unplugged();

        let err = reader.open().await.unwrap_err();
        assert!(err.is_unavailable());

        let err = reader.scan_once(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, HardwareError::Disconnected { .. }));
        assert_eq!(handle.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_before_open_fails() {
        let (mut reader, _handle) = MockCardReader::new();
        assert!(reader.scan_once(Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_unplug_after_open() {
        let (mut reader, handle) = MockCardReader::new();
        let info = reader.open().await.unwrap();
        assert_eq!(info.name, "Mock NFC Reader");

        handle.unplug();
        let err = reader.scan_once(Duration::from_millis(10)).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_glitch_fails_one_scan() {
        let (mut reader, handle) = MockCardReader::new();
        reader.open().await.unwrap();

        handle.glitch("CRC mismatch");
        let err = reader.scan_once(Duration::from_millis(10)).await.unwrap_err();
        assert!(!err.is_unavailable());

        assert!(reader.scan_once(Duration::from_millis(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_read_is_delivered_raw() {
        let (mut reader, handle) = MockCardReader::new();
        reader.open().await.unwrap();

        handle
            .present(CardRead::new(vec![0xFF], TagType::Unknown))
            .await
            .unwrap();

        let read = reader
            .scan_once(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.uid, vec![0xFF]);
    }
}

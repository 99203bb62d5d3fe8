//! Hardware device trait definitions.
//!
//! This module defines the contract between the lock controller and its
//! peripherals: the latch servo, the two status indicators, the buzzer, the
//! manual switch and the card reader transport. Output devices expose a
//! single idempotent "set" style operation; the controller owns all sequencing
//! (cue, move, settle, indicator update).
//!
//! Operations that take real time (tone playback, card scanning) are native
//! `async fn` methods (Rust 1.90 + Edition 2024 RPITIT). Instantaneous pin
//! writes and reads are synchronous.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use crate::error::Result;
use crate::types::{Level, ReaderInfo};

/// Latch servo.
///
/// `set_position` is fire-and-forget: it starts the pulse train for the
/// requested angle and returns immediately. Writing the neutral angle (0)
/// stops the pulse train.
pub trait LatchActuator: Send + Sync {
    /// Drive the servo towards `angle` degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if the PWM channel cannot be written.
    fn set_position(&mut self, angle: u16) -> Result<()>;
}

/// Single-color status indicator.
pub trait Indicator: Send + Sync {
    /// Light or darken the indicator.
    fn set(&mut self, lit: bool) -> Result<()>;

    /// Light the indicator.
    fn on(&mut self) -> Result<()> {
        self.set(true)
    }

    /// Darken the indicator.
    fn off(&mut self) -> Result<()> {
        self.set(false)
    }
}

/// Buzzer driven by a tone generator.
///
/// # Examples
///
/// ```no_run
/// use autolock_hardware::traits::ToneDevice;
/// use autolock_hardware::error::Result;
///
/// async fn chirp<T: ToneDevice>(buzzer: &mut T) -> Result<()> {
///     buzzer.play(&[500, 1000]).await
/// }
/// ```
pub trait ToneDevice: Send + Sync {
    /// Play each frequency (Hz, `0` = rest) for one step, then silence the
    /// device.
    ///
    /// Completes after the whole sequence has been played.
    async fn play(&mut self, frequencies: &[u32]) -> Result<()>;
}

/// Digital input pin.
pub trait DigitalInput: Send + Sync {
    /// Instantaneous, non-blocking read of the pin level.
    fn read(&mut self) -> Result<Level>;
}

/// Tag technology reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagType {
    /// NFC Forum Type 2 (Mifare Ultralight, NTAG).
    Type2,
    /// NFC Forum Type 3 (FeliCa).
    Type3,
    /// NFC Forum Type 4 (ISO-DEP).
    Type4,
    /// Anything the reader could not classify.
    Unknown,
}

impl TagType {
    /// Get a human-readable name for the tag type.
    pub fn name(&self) -> &str {
        match self {
            Self::Type2 => "Type2Tag",
            Self::Type3 => "Type3Tag",
            Self::Type4 => "Type4Tag",
            Self::Unknown => "Unknown",
        }
    }
}

/// Raw tag data as delivered by the reader transport.
///
/// The identifier bytes are not validated here; turning them into a
/// registry-comparable identifier is the card session's job.
#[derive(Debug, Clone)]
pub struct CardRead {
    /// Tag identifier bytes.
    pub uid: Vec<u8>,

    /// Tag technology.
    pub tag_type: TagType,

    /// Timestamp when the tag was read.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CardRead {
    /// Create a read stamped with the current time.
    pub fn new(uid: Vec<u8>, tag_type: TagType) -> Self {
        Self {
            uid,
            tag_type,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Card reader transport.
///
/// # Examples
///
/// ```no_run
/// use autolock_hardware::traits::CardReader;
/// use autolock_hardware::error::Result;
/// use std::time::Duration;
///
/// async fn wait_for_tag<R: CardReader>(reader: &mut R) -> Result<Option<Vec<u8>>> {
///     reader.open().await?;
///     let read = reader.scan_once(Duration::from_secs(1)).await?;
///     Ok(read.map(|r| r.uid))
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Open the reader device.
    ///
    /// # Errors
    ///
    /// Returns an error if no reader is present.
    async fn open(&mut self) -> Result<ReaderInfo>;

    /// Wait up to `timeout` for a tag to enter the field.
    ///
    /// Returns `Ok(None)` when the timeout elapses with no tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not open, was disconnected, or the
    /// exchange with the tag failed.
    async fn scan_once(&mut self, timeout: Duration) -> Result<Option<CardRead>>;
}

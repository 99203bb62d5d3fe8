//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) are not object-safe, so
//! `Box<dyn ToneDevice>` is not an option. The controller instead holds these
//! enums, which dispatch to a concrete driver at compile time. Because every
//! variant is a concrete type, the futures they return are known to be `Send`
//! and can run inside spawned Tokio tasks.
//!
//! # Examples
//!
//! ```
//! use autolock_hardware::devices::AnyIndicator;
//! use autolock_hardware::gpio::Gpio;
//! use autolock_hardware::mock::MockIndicator;
//! use autolock_hardware::traits::Indicator;
//!
//! let gpio = Gpio::init().unwrap();
//! let (red, handle) = MockIndicator::new(&gpio, 24).unwrap();
//! let mut red = AnyIndicator::Mock(red);
//!
//! red.on().unwrap();
//! assert!(handle.is_lit());
//! ```

use std::time::Duration;

use crate::mock::{MockCardReader, MockIndicator, MockLatch, MockSwitch, MockTone};
use crate::traits::{CardRead, CardReader, DigitalInput, Indicator, LatchActuator, ToneDevice};
use crate::{Level, ReaderInfo, Result};

/// Enum wrapper for latch servo dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyLatch {
    /// Simulated servo.
    Mock(MockLatch),
}

impl LatchActuator for AnyLatch {
    fn set_position(&mut self, angle: u16) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_position(angle),
        }
    }
}

/// Enum wrapper for indicator dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyIndicator {
    /// Simulated indicator.
    Mock(MockIndicator),
}

impl Indicator for AnyIndicator {
    fn set(&mut self, lit: bool) -> Result<()> {
        match self {
            Self::Mock(device) => device.set(lit),
        }
    }
}

/// Enum wrapper for buzzer dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyToneDevice {
    /// Simulated buzzer.
    Mock(MockTone),
}

impl ToneDevice for AnyToneDevice {
    async fn play(&mut self, frequencies: &[u32]) -> Result<()> {
        match self {
            Self::Mock(device) => device.play(frequencies).await,
        }
    }
}

/// Enum wrapper for switch input dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySwitch {
    /// Simulated switch.
    Mock(MockSwitch),
}

impl DigitalInput for AnySwitch {
    fn read(&mut self) -> Result<Level> {
        match self {
            Self::Mock(device) => device.read(),
        }
    }
}

/// Enum wrapper for card reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Simulated reader.
    Mock(MockCardReader),
}

impl CardReader for AnyCardReader {
    async fn open(&mut self) -> Result<ReaderInfo> {
        match self {
            Self::Mock(device) => device.open().await,
        }
    }

    async fn scan_once(&mut self, timeout: Duration) -> Result<Option<CardRead>> {
        match self {
            Self::Mock(device) => device.scan_once(timeout).await,
        }
    }
}

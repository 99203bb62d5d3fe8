//! Hardware device abstraction layer for the Autolock door controller.
//!
//! This crate provides trait-based abstractions for the peripherals of a
//! card-operated door lock: the latch servo, the red and green status
//! indicators, the buzzer, the manual switch and the card reader. The traits
//! allow swapping simulated devices (for development and testing) with real
//! drivers without touching the controller.
//!
//! # Design Philosophy
//!
//! - **Explicit initialization**: the pin controller is brought up once with
//!   [`Gpio::init`] and the handle is passed into every driver constructor.
//!   Drivers claim their pins through it, so a pin can never be driven twice.
//! - **Async where time passes**: tone playback and card scans are native
//!   `async fn` (Rust 1.90 + Edition 2024 RPITIT); pin reads and writes are
//!   synchronous.
//! - **Enum dispatch**: the [`devices`] module wraps drivers in enums so the
//!   controller can run them inside spawned Tokio tasks.
//! - **Error-aware**: all operations return [`Result<T>`][error::Result]
//!   with a [`HardwareError`].
//!
//! # Example
//!
//! ```
//! use autolock_hardware::gpio::Gpio;
//! use autolock_hardware::mock::{MockIndicator, MockLatch};
//! use autolock_hardware::traits::{Indicator, LatchActuator};
//!
//! let gpio = Gpio::init().unwrap();
//!
//! let (mut latch, latch_handle) = MockLatch::new(&gpio, 18).unwrap();
//! let (mut green, green_handle) = MockIndicator::new(&gpio, 23).unwrap();
//!
//! latch.set_position(150).unwrap();
//! green.on().unwrap();
//!
//! assert_eq!(latch_handle.current_angle(), Some(150));
//! assert!(green_handle.is_lit());
//! ```

pub mod devices;
pub mod error;
pub mod gpio;
pub mod mock;
pub mod pwm;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use gpio::{Gpio, PinClaim};
pub use traits::{CardRead, CardReader, DigitalInput, Indicator, LatchActuator, TagType, ToneDevice};
pub use types::{Level, PinMode, ReaderInfo};

// Re-export dispatch wrappers
pub use devices::{AnyCardReader, AnyIndicator, AnyLatch, AnySwitch, AnyToneDevice};

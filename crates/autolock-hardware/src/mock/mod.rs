//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled and observed
//! programmatically without physical hardware. Each constructor returns the
//! device together with a handle; the handle drives inputs (switch level,
//! presented cards) or records outputs (servo positions, indicator state,
//! played tones).

pub mod indicator;
pub mod latch;
pub mod reader;
pub mod switch;
pub mod tone;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use indicator::{MockIndicator, MockIndicatorHandle};
pub use latch::{MockLatch, MockLatchHandle, ServoWrite};
pub use reader::{MockCardReader, MockCardReaderHandle};
pub use switch::{MockSwitch, MockSwitchHandle};
pub use tone::{MockTone, MockToneHandle};

/// Lock shared mock state, recovering from a poisoned mutex.
fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

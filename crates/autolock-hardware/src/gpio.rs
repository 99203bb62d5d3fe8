//! GPIO capability.
//!
//! The board's pin controller is initialized exactly once by the process
//! entry point with [`Gpio::init`]. The returned handle is passed into every
//! driver constructor, which claims its pin through it. There is no implicit
//! process-wide "already initialized" state: a driver cannot exist without a
//! handle, and two drivers cannot claim the same pin.
//!
//! # Examples
//!
//! ```
//! use autolock_hardware::gpio::Gpio;
//! use autolock_hardware::types::PinMode;
//!
//! let gpio = Gpio::init().unwrap();
//!
//! let claim = gpio.claim(23, PinMode::Output).unwrap();
//! assert!(gpio.claim(23, PinMode::Output).is_err());
//!
//! drop(claim);
//! assert!(gpio.claim(23, PinMode::Output).is_ok());
//! ```

use crate::error::{HardwareError, Result};
use crate::types::PinMode;
use autolock_core::constants::MAX_GPIO_PIN;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle to an initialized pin controller.
///
/// Cloning is cheap; all clones share the same claim table.
#[derive(Debug, Clone)]
pub struct Gpio {
    claims: Arc<Mutex<BTreeMap<u8, PinMode>>>,
}

impl Gpio {
    /// Initialize the pin controller.
    ///
    /// Call this once from the process entry point and hand the result to
    /// each driver.
    pub fn init() -> Result<Self> {
        Ok(Self {
            claims: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Claim `pin` in `mode`.
    ///
    /// The claim is released when the returned [`PinClaim`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidPin`] for pins outside the board's
    /// range and [`HardwareError::PinInUse`] if the pin is already claimed.
    pub fn claim(&self, pin: u8, mode: PinMode) -> Result<PinClaim> {
        if pin > MAX_GPIO_PIN {
            return Err(HardwareError::InvalidPin { pin });
        }

        let mut claims = self.lock();
        if claims.contains_key(&pin) {
            return Err(HardwareError::PinInUse { pin });
        }
        claims.insert(pin, mode);

        Ok(PinClaim {
            pin,
            mode,
            gpio: self.clone(),
        })
    }

    /// Mode of a claimed pin, `None` if the pin is free.
    pub fn mode_of(&self, pin: u8) -> Option<PinMode> {
        self.lock().get(&pin).copied()
    }

    /// Currently claimed pins in ascending order.
    pub fn claimed_pins(&self) -> Vec<u8> {
        self.lock().keys().copied().collect()
    }

    fn release(&self, pin: u8) {
        self.lock().remove(&pin);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u8, PinMode>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive ownership of one pin.
#[derive(Debug)]
pub struct PinClaim {
    pin: u8,
    mode: PinMode,
    gpio: Gpio,
}

impl PinClaim {
    /// The claimed pin number.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// The mode the pin was claimed in.
    pub fn mode(&self) -> PinMode {
        self.mode
    }
}

impl Drop for PinClaim {
    fn drop(&mut self) {
        self.gpio.release(self.pin);
    }
}

//! Mock status indicator.

use super::lock;
use crate::{
    Result,
    gpio::{Gpio, PinClaim},
    traits::Indicator,
    types::PinMode,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct IndicatorState {
    lit: bool,
    writes: usize,
}

/// Mock single-color indicator on an output pin.
///
/// # Examples
///
/// ```
/// use autolock_hardware::gpio::Gpio;
/// use autolock_hardware::mock::MockIndicator;
/// use autolock_hardware::traits::Indicator;
///
/// let gpio = Gpio::init().unwrap();
/// let (mut green, handle) = MockIndicator::new(&gpio, 23).unwrap();
///
/// green.on().unwrap();
/// assert!(handle.is_lit());
/// ```
#[derive(Debug)]
pub struct MockIndicator {
    claim: PinClaim,
    state: Arc<Mutex<IndicatorState>>,
}

impl MockIndicator {
    /// Claim `pin` as an output and create a dark indicator.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is invalid or already claimed.
    pub fn new(gpio: &Gpio, pin: u8) -> Result<(Self, MockIndicatorHandle)> {
        let claim = gpio.claim(pin, PinMode::Output)?;
        let state = Arc::new(Mutex::new(IndicatorState::default()));

        let indicator = Self {
            claim,
            state: Arc::clone(&state),
        };

        Ok((indicator, MockIndicatorHandle { state }))
    }

    /// Pin driven by this indicator.
    pub fn pin(&self) -> u8 {
        self.claim.pin()
    }
}

impl Indicator for MockIndicator {
    fn set(&mut self, lit: bool) -> Result<()> {
        let mut state = lock(&self.state);
        state.lit = lit;
        state.writes += 1;
        Ok(())
    }
}

/// Observer for a [`MockIndicator`].
#[derive(Debug, Clone)]
pub struct MockIndicatorHandle {
    state: Arc<Mutex<IndicatorState>>,
}

impl MockIndicatorHandle {
    /// Whether the indicator is currently lit.
    pub fn is_lit(&self) -> bool {
        lock(&self.state).lit
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> usize {
        lock(&self.state).writes
    }
}

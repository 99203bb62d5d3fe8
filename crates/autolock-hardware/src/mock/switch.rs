//! Mock manual switch.

use super::lock;
use crate::{
    HardwareError, Result,
    gpio::{Gpio, PinClaim},
    traits::DigitalInput,
    types::{Level, PinMode},
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct SwitchState {
    level: Level,
    script: VecDeque<Level>,
    reads: usize,
    failing_reads: usize,
}

/// Mock switch on an input pin.
///
/// Each read first consumes the next scripted sample, if any, and otherwise
/// returns the held level. Scripts make tick-exact gesture tests possible;
/// the held level models a person keeping the button down.
///
/// # Examples
///
/// ```
/// use autolock_hardware::gpio::Gpio;
/// use autolock_hardware::mock::MockSwitch;
/// use autolock_hardware::traits::DigitalInput;
/// use autolock_hardware::types::Level;
///
/// let gpio = Gpio::init().unwrap();
/// let (mut switch, handle) = MockSwitch::new(&gpio, 17).unwrap();
///
/// handle.script([Level::High, Level::Low]);
/// handle.set_level(Level::High);
///
/// assert_eq!(switch.read().unwrap(), Level::High);
/// assert_eq!(switch.read().unwrap(), Level::Low);
/// assert_eq!(switch.read().unwrap(), Level::High);
/// assert_eq!(handle.read_count(), 3);
/// ```
#[derive(Debug)]
pub struct MockSwitch {
    claim: PinClaim,
    state: Arc<Mutex<SwitchState>>,
}

impl MockSwitch {
    /// Claim `pin` as an input and create a released switch.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is invalid or already claimed.
    pub fn new(gpio: &Gpio, pin: u8) -> Result<(Self, MockSwitchHandle)> {
        let claim = gpio.claim(pin, PinMode::Input)?;
        let state = Arc::new(Mutex::new(SwitchState::default()));

        let switch = Self {
            claim,
            state: Arc::clone(&state),
        };

        Ok((switch, MockSwitchHandle { state }))
    }

    /// Pin read by this switch.
    pub fn pin(&self) -> u8 {
        self.claim.pin()
    }
}

impl DigitalInput for MockSwitch {
    fn read(&mut self) -> Result<Level> {
        let mut state = lock(&self.state);
        state.reads += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(HardwareError::communication("switch input floating"));
        }
        let level = state.script.pop_front().unwrap_or(state.level);
        Ok(level)
    }
}

/// Controller for a [`MockSwitch`].
#[derive(Debug, Clone)]
pub struct MockSwitchHandle {
    state: Arc<Mutex<SwitchState>>,
}

impl MockSwitchHandle {
    /// Hold the switch at `level` until changed.
    pub fn set_level(&self, level: Level) {
        lock(&self.state).level = level;
    }

    /// Queue samples returned by the next reads, one per read.
    pub fn script(&self, samples: impl IntoIterator<Item = Level>) {
        lock(&self.state).script.extend(samples);
    }

    /// Make the next `count` reads fail. Scripted samples wait until the
    /// failures are used up.
    pub fn fail_reads(&self, count: usize) {
        lock(&self.state).failing_reads += count;
    }

    /// Samples still queued.
    pub fn pending(&self) -> usize {
        lock(&self.state).script.len()
    }

    /// Number of reads so far.
    pub fn read_count(&self) -> usize {
        lock(&self.state).reads
    }
}

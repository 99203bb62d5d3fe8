//! Mock latch servo.

use super::lock;
use crate::{
    Result,
    gpio::{Gpio, PinClaim},
    pwm::PwmChannel,
    traits::LatchActuator,
    types::PinMode,
};
use std::sync::{Arc, Mutex};

/// A single write to the servo's PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoWrite {
    /// Requested angle in degrees.
    pub angle: u16,
    /// Duty value written to the channel.
    pub duty: u32,
}

/// Mock latch servo.
///
/// Claims its pin as PWM and records every write, with the duty value the
/// real channel would have received.
///
/// # Examples
///
/// ```
/// use autolock_hardware::gpio::Gpio;
/// use autolock_hardware::mock::MockLatch;
/// use autolock_hardware::traits::LatchActuator;
///
/// let gpio = Gpio::init().unwrap();
/// let (mut latch, handle) = MockLatch::new(&gpio, 18).unwrap();
///
/// latch.set_position(150).unwrap();
/// latch.set_position(0).unwrap();
///
/// assert_eq!(handle.angles(), vec![150, 0]);
/// assert_eq!(handle.current_angle(), Some(0));
/// ```
#[derive(Debug)]
pub struct MockLatch {
    claim: PinClaim,
    channel: PwmChannel,
    writes: Arc<Mutex<Vec<ServoWrite>>>,
}

impl MockLatch {
    /// Claim `pin` and create the servo.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is invalid or already claimed.
    pub fn new(gpio: &Gpio, pin: u8) -> Result<(Self, MockLatchHandle)> {
        let claim = gpio.claim(pin, PinMode::Pwm)?;
        let writes = Arc::new(Mutex::new(Vec::new()));

        let latch = Self {
            claim,
            channel: PwmChannel::for_pin(pin),
            writes: Arc::clone(&writes),
        };

        Ok((latch, MockLatchHandle { writes }))
    }

    /// Pin driven by this servo.
    pub fn pin(&self) -> u8 {
        self.claim.pin()
    }

    /// PWM channel selected for the pin.
    pub fn channel(&self) -> PwmChannel {
        self.channel
    }
}

impl LatchActuator for MockLatch {
    fn set_position(&mut self, angle: u16) -> Result<()> {
        let duty = self.channel.duty_for(angle);
        lock(&self.writes).push(ServoWrite { angle, duty });
        Ok(())
    }
}

/// Observer for a [`MockLatch`].
#[derive(Debug, Clone)]
pub struct MockLatchHandle {
    writes: Arc<Mutex<Vec<ServoWrite>>>,
}

impl MockLatchHandle {
    /// Every write so far.
    pub fn writes(&self) -> Vec<ServoWrite> {
        lock(&self.writes).clone()
    }

    /// Every requested angle so far.
    pub fn angles(&self) -> Vec<u16> {
        lock(&self.writes).iter().map(|w| w.angle).collect()
    }

    /// Last requested angle, `None` before the first write.
    pub fn current_angle(&self) -> Option<u16> {
        lock(&self.writes).last().map(|w| w.angle)
    }

    /// Forget recorded writes.
    pub fn clear(&self) {
        lock(&self.writes).clear();
    }
}

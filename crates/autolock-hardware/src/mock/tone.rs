//! Mock buzzer.

use super::lock;
use crate::{
    Result,
    gpio::{Gpio, PinClaim},
    traits::ToneDevice,
    types::PinMode,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct ToneState {
    sequences: Vec<Vec<u32>>,
    writes: Vec<u32>,
}

/// Mock tone generator.
///
/// Holds each frequency for `step` of (tokio) time, writes `0` at the end of
/// every sequence, and records what was played.
///
/// # Examples
///
/// ```
/// use autolock_hardware::gpio::Gpio;
/// use autolock_hardware::mock::MockTone;
/// use autolock_hardware::traits::ToneDevice;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> autolock_hardware::Result<()> {
///     let gpio = Gpio::init()?;
///     let (mut buzzer, handle) = MockTone::new(&gpio, 4, Duration::from_millis(1))?;
///
///     buzzer.play(&[500, 1000]).await?;
///
///     assert_eq!(handle.sequences(), vec![vec![500, 1000]]);
///     assert_eq!(handle.writes(), vec![500, 1000, 0]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTone {
    claim: PinClaim,
    step: Duration,
    state: Arc<Mutex<ToneState>>,
}

impl MockTone {
    /// Claim `pin` and create the buzzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is invalid or already claimed.
    pub fn new(gpio: &Gpio, pin: u8, step: Duration) -> Result<(Self, MockToneHandle)> {
        let claim = gpio.claim(pin, PinMode::Pwm)?;
        let state = Arc::new(Mutex::new(ToneState::default()));

        let tone = Self {
            claim,
            step,
            state: Arc::clone(&state),
        };

        Ok((tone, MockToneHandle { state }))
    }

    /// Pin driven by this buzzer.
    pub fn pin(&self) -> u8 {
        self.claim.pin()
    }
}

impl ToneDevice for MockTone {
    async fn play(&mut self, frequencies: &[u32]) -> Result<()> {
        for &hz in frequencies {
            lock(&self.state).writes.push(hz);
            tokio::time::sleep(self.step).await;
        }

        let mut state = lock(&self.state);
        state.writes.push(0);
        state.sequences.push(frequencies.to_vec());
        Ok(())
    }
}

/// Observer for a [`MockTone`].
#[derive(Debug, Clone)]
pub struct MockToneHandle {
    state: Arc<Mutex<ToneState>>,
}

impl MockToneHandle {
    /// Completed sequences in play order.
    pub fn sequences(&self) -> Vec<Vec<u32>> {
        lock(&self.state).sequences.clone()
    }

    /// Every raw frequency write, including the trailing silences.
    pub fn writes(&self) -> Vec<u32> {
        lock(&self.state).writes.clone()
    }

    /// How many times `sequence` was played.
    pub fn count_of(&self, sequence: &[u32]) -> usize {
        lock(&self.state)
            .sequences
            .iter()
            .filter(|played| played.as_slice() == sequence)
            .count()
    }
}

//! Servo PWM mapping.
//!
//! Two pins on the board are wired to the hardware PWM peripheral, which runs
//! in mark-space mode with a range of 1920 and a clock divisor of 200. At that
//! setting an angle value can be written to the channel as-is. Every other pin
//! is driven by software PWM with a range of 100, so angles are scaled down by
//! ten before they are written.
//!
//! ```
//! use autolock_hardware::pwm::PwmChannel;
//!
//! assert_eq!(PwmChannel::for_pin(18).duty_for(150), 150);
//! assert_eq!(PwmChannel::for_pin(22).duty_for(150), 15);
//! ```

use autolock_core::constants::{
    HARDWARE_PWM_CLOCK, HARDWARE_PWM_PINS, HARDWARE_PWM_RANGE, SOFTWARE_PWM_DIVISOR,
    SOFTWARE_PWM_RANGE,
};

/// PWM driver selected for a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmChannel {
    /// Hardware PWM peripheral.
    Hardware { range: u32, clock: u32 },
    /// Bit-banged software PWM.
    Software { range: u32 },
}

impl PwmChannel {
    /// Select the channel type for a pin.
    pub fn for_pin(pin: u8) -> Self {
        if HARDWARE_PWM_PINS.contains(&pin) {
            Self::Hardware {
                range: HARDWARE_PWM_RANGE,
                clock: HARDWARE_PWM_CLOCK,
            }
        } else {
            Self::Software {
                range: SOFTWARE_PWM_RANGE,
            }
        }
    }

    /// Returns `true` for the hardware peripheral.
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware { .. })
    }

    /// Channel range; duty values are clamped to it.
    pub fn range(&self) -> u32 {
        match self {
            Self::Hardware { range, .. } | Self::Software { range } => *range,
        }
    }

    /// Duty value to write for a servo angle.
    pub fn duty_for(&self, angle: u16) -> u32 {
        let raw = match self {
            Self::Hardware { .. } => u32::from(angle),
            Self::Software { .. } => u32::from(angle / SOFTWARE_PWM_DIVISOR),
        };
        raw.min(self.range())
    }
}

//! Core constants for the door lock controller.
//!
//! This module centralizes the default pin assignments, actuator angles,
//! timings and tone tables used across the Autolock workspace. Runtime
//! configuration (see `autolock-storage`) starts from these values and may
//! override any of them.
//!
//! # Usage
//!
//! ```
//! use autolock_core::constants::*;
//! use std::time::Duration;
//!
//! let poll = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
//! assert_eq!(poll, Duration::from_millis(100));
//!
//! assert!(DEFAULT_OPEN_ANGLE > DEFAULT_CLOSE_ANGLE);
//! ```

// ============================================================================
// Pin Assignments (BCM numbering)
// ============================================================================

/// Latch servo pin. Pin 18 is a hardware PWM channel.
pub const DEFAULT_LATCH_PIN: u8 = 18;

/// Red indicator pin (lit while closed).
pub const DEFAULT_RED_PIN: u8 = 24;

/// Green indicator pin (lit while opened).
pub const DEFAULT_GREEN_PIN: u8 = 23;

/// Buzzer pin driven by the tone generator.
pub const DEFAULT_TONE_PIN: u8 = 4;

/// Manual switch input pin.
pub const DEFAULT_SWITCH_PIN: u8 = 17;

/// Highest valid BCM GPIO number on the supported boards.
pub const MAX_GPIO_PIN: u8 = 27;

// ============================================================================
// Latch Actuator
// ============================================================================

/// Servo position that releases the latch.
pub const DEFAULT_OPEN_ANGLE: u16 = 150;

/// Servo position that engages the latch.
pub const DEFAULT_CLOSE_ANGLE: u16 = 50;

/// Neutral servo position. Writing this stops the pulse train.
pub const NEUTRAL_ANGLE: u16 = 0;

/// Time the servo needs to reach a non-neutral position (milliseconds).
pub const DEFAULT_SETTLE_MS: u64 = 600;

// ============================================================================
// PWM
// ============================================================================

/// Pins wired to the hardware PWM peripheral.
///
/// Every other pin falls back to software PWM.
pub const HARDWARE_PWM_PINS: [u8; 2] = [18, 13];

/// Hardware PWM range (mark-space mode).
pub const HARDWARE_PWM_RANGE: u32 = 1920;

/// Hardware PWM clock divisor.
pub const HARDWARE_PWM_CLOCK: u32 = 200;

/// Software PWM range (half of the hardware clock divisor).
pub const SOFTWARE_PWM_RANGE: u32 = HARDWARE_PWM_CLOCK / 2;

/// Divisor applied to an angle before it is written to a software PWM pin.
pub const SOFTWARE_PWM_DIVISOR: u16 = 10;

// ============================================================================
// Tone Generator
// ============================================================================

/// Duration each frequency of a cue is held (milliseconds).
pub const DEFAULT_TONE_STEP_MS: u64 = 100;

/// Rising two-note cue played before the latch opens.
pub const OPEN_CUE_HZ: [u32; 2] = [500, 1000];

/// Falling two-note cue played before the latch closes.
pub const CLOSE_CUE_HZ: [u32; 2] = [1000, 500];

/// Stuttered cue played when a card is not registered. `0` is a rest.
pub const REJECT_CUE_HZ: [u32; 4] = [500, 0, 500, 500];

// ============================================================================
// Switch Sampler
// ============================================================================

/// Interval between two reads of the manual switch (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Samples in the edge-detection window.
pub const SHORT_WINDOW_LEN: usize = 2;

/// Samples in the sustained-level window (5 × 100 ms = 500 ms hold).
pub const DEFAULT_LONG_WINDOW_LEN: usize = 5;

// ============================================================================
// Card Reader
// ============================================================================

/// Upper bound of a single card scan (milliseconds).
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 1000;

/// Minimum UID length in bytes (ISO 14443).
pub const MIN_UID_LENGTH: usize = 4;

/// Maximum UID length in bytes (ISO 14443).
pub const MAX_UID_LENGTH: usize = 10;

// ============================================================================
// Files
// ============================================================================

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "autolock.json";

/// Default registry file name.
pub const DEFAULT_REGISTRY_FILE: &str = "autolock-cards.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cues_are_distinct() {
        assert_ne!(OPEN_CUE_HZ, CLOSE_CUE_HZ);
        assert_ne!(OPEN_CUE_HZ.as_slice(), REJECT_CUE_HZ.as_slice());
    }

    #[test]
    fn test_latch_pin_is_hardware_pwm() {
        assert!(HARDWARE_PWM_PINS.contains(&DEFAULT_LATCH_PIN));
    }

    #[test]
    fn test_software_pwm_range() {
        assert_eq!(SOFTWARE_PWM_RANGE, 100);
    }

    #[test]
    fn test_long_window_exceeds_short_window() {
        assert!(DEFAULT_LONG_WINDOW_LEN > SHORT_WINDOW_LEN);
    }
}

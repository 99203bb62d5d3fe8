//! Controller configuration.
//!
//! The configuration is a JSON document. Every field has a default, so a
//! partial file (or no file at all) is valid:
//!
//! ```json
//! {
//!   "pins": { "latch": 18, "red": 24, "green": 23, "tone": 4, "switch": 17 },
//!   "open_angle": 150,
//!   "close_angle": 50,
//!   "scan_timeout_ms": 1000,
//!   "hold_action": "shutdown",
//!   "registry_path": "autolock-cards.json"
//! }
//! ```

use crate::error::{StorageError, StorageResult};
use autolock_core::constants::{
    DEFAULT_CLOSE_ANGLE, DEFAULT_GREEN_PIN, DEFAULT_LATCH_PIN, DEFAULT_LONG_WINDOW_LEN,
    DEFAULT_OPEN_ANGLE, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RED_PIN, DEFAULT_REGISTRY_FILE,
    DEFAULT_SCAN_TIMEOUT_MS, DEFAULT_SETTLE_MS, DEFAULT_SWITCH_PIN, DEFAULT_TONE_PIN,
    DEFAULT_TONE_STEP_MS, MAX_GPIO_PIN, SHORT_WINDOW_LEN,
};
use autolock_core::{HoldAction, HoldRetrigger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Pin assignments (BCM numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub latch: u8,
    pub red: u8,
    pub green: u8,
    pub tone: u8,
    pub switch: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            latch: DEFAULT_LATCH_PIN,
            red: DEFAULT_RED_PIN,
            green: DEFAULT_GREEN_PIN,
            tone: DEFAULT_TONE_PIN,
            switch: DEFAULT_SWITCH_PIN,
        }
    }
}

impl PinConfig {
    fn all(&self) -> [u8; 5] {
        [self.latch, self.red, self.green, self.tone, self.switch]
    }
}

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutolockConfig {
    /// Pin assignments
    pub pins: PinConfig,

    /// Servo angle that releases the latch
    pub open_angle: u16,

    /// Servo angle that engages the latch
    pub close_angle: u16,

    /// Time the servo needs to reach a position
    pub settle_ms: u64,

    /// Interval between two switch reads
    pub poll_interval_ms: u64,

    /// Upper bound of one card scan
    pub scan_timeout_ms: u64,

    /// Duration of each cue note
    pub tone_step_ms: u64,

    /// Consecutive high samples that make a hold
    pub long_window: usize,

    /// Hold re-trigger cadence while the switch stays down
    pub hold_retrigger: HoldRetrigger,

    /// Action bound to the hold gesture
    pub hold_action: HoldAction,

    /// Registry file location
    pub registry_path: PathBuf,
}

impl Default for AutolockConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            open_angle: DEFAULT_OPEN_ANGLE,
            close_angle: DEFAULT_CLOSE_ANGLE,
            settle_ms: DEFAULT_SETTLE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT_MS,
            tone_step_ms: DEFAULT_TONE_STEP_MS,
            long_window: DEFAULT_LONG_WINDOW_LEN,
            hold_retrigger: HoldRetrigger::default(),
            hold_action: HoldAction::default(),
            registry_path: PathBuf::from(DEFAULT_REGISTRY_FILE),
        }
    }
}

impl AutolockConfig {
    /// Create a default configuration with the given registry location
    pub fn new(registry_path: impl Into<PathBuf>) -> Self {
        Self {
            registry_path: registry_path.into(),
            ..Default::default()
        }
    }

    /// Set the servo angles
    pub fn angles(mut self, open: u16, close: u16) -> Self {
        self.open_angle = open;
        self.close_angle = close;
        self
    }

    /// Set the switch polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the per-scan timeout
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the hold window length in samples
    pub fn long_window(mut self, samples: usize) -> Self {
        self.long_window = samples;
        self
    }

    /// Set the hold re-trigger cadence
    pub fn hold_retrigger(mut self, retrigger: HoldRetrigger) -> Self {
        self.hold_retrigger = retrigger;
        self
    }

    /// Set the action bound to the hold gesture
    pub fn hold_action(mut self, action: HoldAction) -> Self {
        self.hold_action = action;
        self
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scan_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn tone_step(&self) -> Duration {
        Duration::from_millis(self.tone_step_ms)
    }

    /// Check that the values can drive a controller.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` describing the first problem.
    pub fn validate(&self) -> StorageResult<()> {
        let pins = self.pins.all();

        if let Some(pin) = pins.iter().find(|&&p| p > MAX_GPIO_PIN) {
            return Err(StorageError::Configuration(format!(
                "Pin {pin} is outside 0-{MAX_GPIO_PIN}"
            )));
        }

        let distinct: BTreeSet<u8> = pins.iter().copied().collect();
        if distinct.len() != pins.len() {
            return Err(StorageError::Configuration(
                "Each device needs its own pin".to_string(),
            ));
        }

        if self.open_angle == self.close_angle {
            return Err(StorageError::Configuration(format!(
                "Open and close angles are both {}",
                self.open_angle
            )));
        }

        if self.poll_interval_ms == 0 || self.scan_timeout_ms == 0 {
            return Err(StorageError::Configuration(
                "Poll interval and scan timeout must be non-zero".to_string(),
            ));
        }

        if self.long_window <= SHORT_WINDOW_LEN {
            return Err(StorageError::Configuration(format!(
                "Hold window must exceed {SHORT_WINDOW_LEN} samples, got {}",
                self.long_window
            )));
        }

        Ok(())
    }

    /// Load a configuration file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub async fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        let config = match tokio::fs::read(path).await {
            Ok(bytes) => {
                debug!("Loaded configuration from {}", path.display());
                serde_json::from_slice::<Self>(&bytes)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No configuration at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path.as_ref(), json).await?;
        debug!("Saved configuration to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_wiring() {
        let config = AutolockConfig::default();
        assert_eq!(config.pins.latch, 18);
        assert_eq!(config.pins.red, 24);
        assert_eq!(config.pins.green, 23);
        assert_eq!(config.pins.tone, 4);
        assert_eq!(config.open_angle, 150);
        assert_eq!(config.close_angle, 50);
        assert_eq!(config.settle(), Duration::from_millis(600));
        assert_eq!(config.poll_interval_duration(), Duration::from_millis(100));
        assert_eq!(config.scan_timeout_duration(), Duration::from_secs(1));
        assert_eq!(config.long_window, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AutolockConfig::new("/tmp/cards.json")
            .angles(120, 30)
            .poll_interval(Duration::from_millis(50))
            .scan_timeout(Duration::from_millis(500))
            .long_window(8)
            .hold_retrigger(HoldRetrigger::EveryWindow)
            .hold_action(HoldAction::Open);

        assert_eq!(config.registry_path, PathBuf::from("/tmp/cards.json"));
        assert_eq!(config.open_angle, 120);
        assert_eq!(config.close_angle, 30);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.scan_timeout_ms, 500);
        assert_eq!(config.long_window, 8);
        assert_eq!(config.hold_retrigger, HoldRetrigger::EveryWindow);
        assert_eq!(config.hold_action, HoldAction::Open);
    }

    #[test]
    fn test_oversized_durations_saturate() {
        let config = AutolockConfig::default()
            .poll_interval(Duration::MAX)
            .scan_timeout(Duration::MAX);

        assert_eq!(config.poll_interval_ms, u64::MAX);
        assert_eq!(config.scan_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_validate_rejects_shared_pin() {
        let mut config = AutolockConfig::default();
        config.pins.green = config.pins.red;
        assert!(matches!(
            config.validate(),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_pin() {
        let mut config = AutolockConfig::default();
        config.pins.switch = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_equal_angles() {
        assert!(AutolockConfig::default().angles(90, 90).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_hold_window() {
        assert!(AutolockConfig::default().long_window(2).validate().is_err());
        assert!(AutolockConfig::default().long_window(3).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let config = AutolockConfig::default().poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AutolockConfig =
            serde_json::from_str(r#"{ "open_angle": 170, "pins": { "switch": 27 } }"#).unwrap();

        assert_eq!(config.open_angle, 170);
        assert_eq!(config.close_angle, 50);
        assert_eq!(config.pins.switch, 27);
        assert_eq!(config.pins.latch, 18);
    }
}

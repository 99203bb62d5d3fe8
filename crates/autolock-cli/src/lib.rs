//! Autolock command-line interface.
//!
//! # Usage
//!
//! ```bash
//! # Run the controller with a console standing in for the switch and reader
//! autolock run
//!
//! # Move the latch servo on pin 18 to 150 degrees and back to neutral
//! autolock servo 18 150
//!
//! # Register the card presented to the reader
//! autolock register --card 04a1b2c3
//! ```
//!
//! Every command reads `autolock.json` (or `--config`) and falls back to
//! defaults when the file does not exist. Set `RUST_LOG=debug` for per-scan
//! and per-gesture logs.

use std::path::PathBuf;

use anyhow::Context;
use autolock_controller::{ControllerSettings, LockController, LockOutputs};
use autolock_core::constants::DEFAULT_CONFIG_FILE;
use autolock_hardware::mock::{
    MockCardReader, MockCardReaderHandle, MockIndicator, MockLatch, MockSwitch, MockSwitchHandle,
    MockTone,
};
use autolock_hardware::{AnyCardReader, AnyIndicator, AnyLatch, AnySwitch, AnyToneDevice, Gpio};
use autolock_storage::{AnyRegistryStore, AutolockConfig, FileRegistryStore};
use clap::{Parser, Subcommand};

pub mod register;
pub mod run;
pub mod servo;

/// Card-operated door lock controller
#[derive(Parser, Debug)]
#[command(name = "autolock")]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the lock controller with a simulated switch and reader
    Run,

    /// Move a servo to an angle, then back to neutral
    #[command(override_usage = "autolock servo <PWM_ID> <ANGLE>")]
    Servo {
        /// GPIO pin driving the servo (18 and 13 are hardware PWM)
        pin: u8,

        /// Target angle in degrees (0 = neutral)
        angle: u16,
    },

    /// Scan one card and add it to the registry
    Register {
        /// Hex identifier of the card to present to the simulated reader
        #[arg(long)]
        card: Option<String>,

        /// How long to wait for the card
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },
}

/// Load the configuration file, with context for the error message.
pub async fn load_config(path: &std::path::Path) -> anyhow::Result<AutolockConfig> {
    AutolockConfig::load(path)
        .await
        .with_context(|| format!("reading configuration {}", path.display()))
}

/// Simulated devices wired to the configured pins.
///
/// The handles drive the inputs the way a person at the door would.
pub struct SimulatedBoard {
    pub gpio: Gpio,
    pub outputs: LockOutputs,
    pub switch: AnySwitch,
    pub switch_handle: MockSwitchHandle,
    pub reader: AnyCardReader,
    pub reader_handle: MockCardReaderHandle,
}

impl SimulatedBoard {
    /// Claim every configured pin.
    pub fn new(config: &AutolockConfig) -> anyhow::Result<Self> {
        let gpio = Gpio::init().context("initializing GPIO")?;
        let pins = &config.pins;

        let (latch, _) = MockLatch::new(&gpio, pins.latch).context("latch servo")?;
        let (red, _) = MockIndicator::new(&gpio, pins.red).context("red indicator")?;
        let (green, _) = MockIndicator::new(&gpio, pins.green).context("green indicator")?;
        let (tone, _) = MockTone::new(&gpio, pins.tone, config.tone_step()).context("buzzer")?;
        let (switch, switch_handle) = MockSwitch::new(&gpio, pins.switch).context("switch")?;
        let (reader, reader_handle) = MockCardReader::new();

        Ok(Self {
            gpio,
            outputs: LockOutputs {
                latch: AnyLatch::Mock(latch),
                red: AnyIndicator::Mock(red),
                green: AnyIndicator::Mock(green),
                tone: AnyToneDevice::Mock(tone),
            },
            switch: AnySwitch::Mock(switch),
            switch_handle,
            reader: AnyCardReader::Mock(reader),
            reader_handle,
        })
    }
}

/// Build a controller backed by the configured registry file.
pub async fn build_controller(config: &AutolockConfig, outputs: LockOutputs) -> LockController {
    let store = AnyRegistryStore::File(FileRegistryStore::new(&config.registry_path));
    LockController::new(outputs, store, ControllerSettings::from(config)).await
}

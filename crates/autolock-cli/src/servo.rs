//! `autolock servo <PWM_ID> <ANGLE>`: exercise the latch servo by hand.

use std::path::Path;

use anyhow::Context;
use autolock_controller::rotate;
use autolock_hardware::mock::{MockLatch, ServoWrite};
use autolock_hardware::pwm::PwmChannel;
use autolock_hardware::{AnyLatch, Gpio};

use crate::load_config;

/// Rotate the servo on `pin` to `angle`, wait the settle time and return it
/// to neutral. Returns the writes the PWM channel received.
pub async fn rotate_servo(config_path: &Path, pin: u8, angle: u16) -> anyhow::Result<Vec<ServoWrite>> {
    let config = load_config(config_path).await?;
    let gpio = Gpio::init().context("initializing GPIO")?;

    let (latch, handle) = MockLatch::new(&gpio, pin)
        .with_context(|| format!("claiming servo pin {pin}"))?;
    let mut latch = AnyLatch::Mock(latch);

    rotate(&mut latch, angle, config.settle()).await?;
    Ok(handle.writes())
}

pub async fn execute(config_path: &Path, pin: u8, angle: u16) -> anyhow::Result<()> {
    let writes = match rotate_servo(config_path, pin, angle).await {
        Ok(writes) => writes,
        Err(e) => {
            eprintln!("Usage: autolock servo <PWM_ID> <ANGLE>");
            return Err(e);
        }
    };

    let kind = if PwmChannel::for_pin(pin).is_hardware() {
        "hardware"
    } else {
        "software"
    };
    for write in writes {
        println!("pin {pin} ({kind} PWM): angle {} -> duty {}", write.angle, write.duty);
    }

    Ok(())
}

//! Device errors.
//!
//! Drivers distinguish a device that is gone ([`HardwareError::is_unavailable`])
//! from one that failed a single operation. Callers treat the first as "no
//! reader" and the second as a failed scan or actuation.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device unplugged, or its event channel closed.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device could not be opened.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// A single transfer failed; the device may recover.
    #[error("Communication error: {message}")]
    Communication { message: String },

    /// Pin number outside the board's GPIO range.
    #[error("Invalid pin: {pin}")]
    InvalidPin { pin: u8 },

    /// Pin already claimed by another driver.
    #[error("Pin {pin} already in use")]
    PinInUse { pin: u8 },
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Returns `true` if the device is gone rather than momentarily failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::InitializationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HardwareError::disconnected("PN533"), true)]
    #[case(HardwareError::initialization_failed("no reader on usb"), true)]
    #[case(HardwareError::communication("CRC mismatch"), false)]
    #[case(HardwareError::PinInUse { pin: 18 }, false)]
    fn test_unavailable_classification(#[case] error: HardwareError, #[case] unavailable: bool) {
        assert_eq!(error.is_unavailable(), unavailable);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            HardwareError::disconnected("PN533").to_string(),
            "Device disconnected: PN533"
        );
        assert_eq!(
            HardwareError::PinInUse { pin: 18 }.to_string(),
            "Pin 18 already in use"
        );
        assert_eq!(
            HardwareError::InvalidPin { pin: 40 }.to_string(),
            "Invalid pin: 40"
        );
    }
}

use crate::{Error, DEFAULT_REPLY_TIMEOUT_MS};

/// Represents the reporting mode of the SDS011 sensor.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DeviceMode {
    /// In Active mode, the sensor automatically reports data.
    Active,
    /// In Passive (query) mode, the sensor only reports data when queried.
    Passive,
}

impl DeviceMode {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            DeviceMode::Active => 0x00,
            DeviceMode::Passive => 0x01,
        }
    }
}

impl TryFrom<u8> for DeviceMode {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x00 => Ok(DeviceMode::Active),
            0x01 => Ok(DeviceMode::Passive),
            other => Err(Error::UnexpectedValue(other)),
        }
    }
}

/// Represents the unique identifier of the SDS011 sensor.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct DeviceID {
    /// The first (low) byte of the device ID.
    pub id1: u8,
    /// The second (high) byte of the device ID.
    pub id2: u8,
}

impl DeviceID {
    /// Addresses every sensor on the line.
    pub const BROADCAST: DeviceID = DeviceID {
        id1: 0xff,
        id2: 0xff,
    };

    pub fn new(id1: u8, id2: u8) -> DeviceID {
        DeviceID { id1, id2 }
    }

    /// Returns true for the `0xFFFF` wildcard address. Replies to a broadcast
    /// carry the sensor's own id, which is trusted as-is.
    pub fn is_broadcast(&self) -> bool {
        *self == DeviceID::BROADCAST
    }
}

impl From<u16> for DeviceID {
    fn from(id: u16) -> DeviceID {
        let [id1, id2] = id.to_le_bytes();
        DeviceID { id1, id2 }
    }
}

impl From<DeviceID> for u16 {
    fn from(id: DeviceID) -> u16 {
        u16::from_le_bytes([id.id1, id.id2])
    }
}

impl Default for DeviceID {
    /// Returns the default device id.
    fn default() -> DeviceID {
        DeviceID::BROADCAST
    }
}

/// Configuration settings for the SDS011 sensor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// The device ID.
    pub id: DeviceID,
    /// The reporting mode of the sensor.
    pub mode: DeviceMode,
    /// How long to wait for a reply frame, in milliseconds.
    pub reply_timeout_ms: u32,
}

impl Config {
    /// Creates a new `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `id` - The `DeviceID` for the sensor.
    /// * `mode` - The `DeviceMode` for the sensor.
    ///
    /// # Returns
    ///
    /// A new `Config` instance with the specified ID and mode and the default reply timeout.
    pub fn new(id: DeviceID, mode: DeviceMode) -> Config {
        Config {
            id,
            mode,
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
        }
    }
    /// Sets the device ID for the configuration.
    pub fn id(mut self, id: DeviceID) -> Self {
        self.id = id;
        self
    }
    /// Sets the device mode for the configuration.
    pub fn mode(mut self, mode: DeviceMode) -> Self {
        self.mode = mode;
        self
    }
    /// Sets the reply wait budget, in milliseconds.
    pub fn reply_timeout_ms(mut self, timeout: u32) -> Self {
        self.reply_timeout_ms = timeout;
        self
    }
}

/// Provides default configuration values for the SDS011 sensor.
impl Default for Config {
    /// Returns the default configuration.
    ///
    /// The default configuration uses a device ID of `0xFFFF`, `Passive` mode and
    /// a one second reply timeout.
    fn default() -> Config {
        Config::new(DeviceID::default(), DeviceMode::Passive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_little_endian() {
        let id = DeviceID::from(0xA160);
        assert_eq!(id, DeviceID::new(0x60, 0xA1));
        assert_eq!(u16::from(id), 0xA160);
        assert!(!id.is_broadcast());
        assert!(DeviceID::from(0xFFFF).is_broadcast());
    }

    #[test]
    fn reporting_mode_bytes() {
        assert_eq!(DeviceMode::try_from(0x00), Ok(DeviceMode::Active));
        assert_eq!(DeviceMode::try_from(0x01), Ok(DeviceMode::Passive));
        assert_eq!(DeviceMode::try_from(0x07), Err(Error::UnexpectedValue(0x07)));
        assert_eq!(DeviceMode::Passive.to_byte(), 0x01);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::default()
            .id(DeviceID::from(0x1234))
            .mode(DeviceMode::Active)
            .reply_timeout_ms(500);
        assert_eq!(config.id, DeviceID::new(0x34, 0x12));
        assert_eq!(config.mode, DeviceMode::Active);
        assert_eq!(config.reply_timeout_ms, 500);
        assert_eq!(Config::default().reply_timeout_ms, DEFAULT_REPLY_TIMEOUT_MS);
    }
}

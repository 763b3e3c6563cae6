#![cfg_attr(not(test), no_std)]

use embedded_io_async::{Read, ReadReady, Write};
use log::debug;

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

mod clock;
pub use clock::*;

mod frame;
pub use frame::*;

mod query;
mod scanner;
pub use scanner::FrameScanner;

mod session;

#[cfg(test)]
mod mock;

use query::QueryState;

// Represents the operational state of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalState {
    /// Sensor is in low-power sleep mode.
    Sleeping,
    /// Sensor is actively taking measurements.
    Working,
}

impl OperationalState {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            OperationalState::Sleeping => 0x00,
            OperationalState::Working => 0x01,
        }
    }
}

impl TryFrom<u8> for OperationalState {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x00 => Ok(OperationalState::Sleeping),
            0x01 => Ok(OperationalState::Working),
            other => Err(Error::UnexpectedValue(other)),
        }
    }
}

/// Represents a single data sample read from the SDS011 sensor.
///
/// Contains PM2.5 and PM10 particulate matter concentration values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// PM2.5 concentration in µg/m³.
    pub pm2_5: f32,
    /// PM10 concentration in µg/m³.
    pub pm10: f32,
    /// The device that reported the sample.
    pub id: DeviceID,
}

impl SensorReading {
    // The sensor reports tenths of µg/m³.
    pub(crate) fn from_raw((pm2_5, pm10): (u16, u16), id: DeviceID) -> Self {
        Self {
            pm2_5: f32::from(pm2_5) / 10.0,
            pm10: f32::from(pm10) / 10.0,
            id,
        }
    }
}

/// Firmware build date as reported by the sensor (`YY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

/// Represents an SDS011 air quality sensor.
///
/// This struct provides methods to interact with the sensor,
/// such as initializing it, reading data, and configuring its settings.
/// Only one exchange may be in flight at a time; every method takes `&mut self`.
///
/// # Type Parameters
///
/// * `Serial`: The serial interface used to communicate with the sensor.
///   It must implement `embedded_io_async::Read`, `ReadReady` and `Write`.
/// * `Clk`: The [`Clock`] driving reply timeouts and query spacing.
pub struct Sds011<Serial, Clk> {
    serial: Serial,
    clock: Clk,
    config: Config,
    query: QueryState,
    scanner: FrameScanner,
}

impl<S, C> Sds011<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Creates a new `Sds011` sensor instance.
    ///
    /// # Arguments
    ///
    /// * `serial`: The serial interface for communication with the sensor.
    /// * `clock`: The time source for timeouts and rate limiting.
    /// * `config`: The initial configuration for the sensor.
    pub fn new(serial: S, clock: C, config: Config) -> Self {
        Self {
            serial,
            clock,
            config,
            query: QueryState::default(),
            scanner: FrameScanner::new(),
        }
    }

    /// Returns the current configuration, including updates made by
    /// `set_reporting_mode` and `set_device_id`.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the serial interface and the clock.
    pub fn release(self) -> (S, C) {
        (self.serial, self.clock)
    }

    /// Initializes the SDS011 sensor according to the provided configuration.
    ///
    /// This involves:
    /// - Discarding any stale input.
    /// - Setting the reporting mode (Active or Passive).
    /// - If Passive mode, putting the sensor to sleep initially.
    /// - If Active mode, setting the working period to continuous.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.drain().await?;
        let id = self.config.id;

        self.set_reporting_mode(self.config.mode, id)
            .await
            .map_err(|e| {
                log::error!(
                    "Failed to set reporting mode to {:?} during init: {:?}",
                    self.config.mode,
                    e
                );
                e
            })?;

        if self.config.mode == DeviceMode::Passive {
            self.set_operational_state(OperationalState::Sleeping, id)
                .await
                .map_err(|e| {
                    log::error!(
                        "Failed to set state to sleep during init (Passive Mode): {:?}",
                        e
                    );
                    e
                })?;
        } else {
            self.set_working_period(0x00, id).await.map_err(|e| {
                log::error!(
                    "Failed to set working period to continuous during init (Active Mode): {:?}",
                    e
                );
                e
            })?;
        }

        debug!("SDS011 init sequence complete.");
        Ok(())
    }

    /// Reads a single data sample from the configured sensor.
    ///
    /// In Passive mode the sensor is woken up, queried and put back to sleep;
    /// the sleep command is sent even when the query fails. In Active mode the
    /// sensor is queried directly. The query is subject to the same spacing and
    /// duplicate rules as [`Sds011::query_data`].
    pub async fn read_sample(&mut self) -> Result<SensorReading, Error> {
        let id = self.config.id;
        let passive = self.config.mode == DeviceMode::Passive;

        if passive {
            debug!("Waking up sensor (Passive Mode)");
            self.set_operational_state(OperationalState::Working, id)
                .await
                .map_err(|e| {
                    log::error!("Failed to wake up sensor: {:?}", e);
                    e
                })?;
        }

        let sample = self.query_data(id).await.map_err(|e| {
            log::warn!("Failed to query sensor data: {:?}", e);
            e
        });

        if passive {
            debug!("Putting sensor back to sleep (Passive Mode)");
            let slept = self
                .set_operational_state(OperationalState::Sleeping, id)
                .await
                .map_err(|e| {
                    log::error!("Failed to put sensor to sleep: {:?}", e);
                    e
                });
            let sample = sample?;
            slept?;
            return Ok(sample);
        }
        sample
    }

    /// Sets the reporting mode (Active or Passive) of the sensor `id`.
    ///
    /// The reply must echo the mode and, unless `id` is broadcast, the device id.
    /// The configured mode is updated when `id` addresses the configured sensor.
    pub async fn set_reporting_mode(&mut self, mode: DeviceMode, id: DeviceID) -> Result<(), Error> {
        debug!("Setting reporting mode to: {:?}", mode);
        let reply = self
            .exchange(Command::ReportingMode(Access::Set(mode)), id)
            .await?;

        if id == self.config.id || id.is_broadcast() {
            self.config.mode = mode;
        }
        debug!("Reporting mode set to {:?}, reply: {:02X?}", mode, reply.as_bytes());
        Ok(())
    }

    /// Queries the reporting mode of the sensor `id`.
    ///
    /// # Returns
    ///
    /// * `Ok(DeviceMode)` containing the current mode (Active or Passive).
    /// * `Err(Error::UnexpectedValue)` if the sensor reports an unknown mode byte.
    /// * `Err(Error)` if the exchange failed.
    pub async fn get_reporting_mode(&mut self, id: DeviceID) -> Result<DeviceMode, Error> {
        debug!("Querying reporting mode (CMD 0x02, Query)");
        let reply = self
            .exchange(Command::ReportingMode(Access::Get), id)
            .await?;
        let mode = DeviceMode::try_from(reply.data()[2])?;
        debug!("Queried reporting mode: {:?}", mode);
        Ok(mode)
    }

    /// Sets the operational state (Sleeping or Working) of the sensor `id`.
    ///
    /// A sleeping sensor is not obliged to acknowledge, so a timeout while
    /// requesting sleep counts as success.
    pub async fn set_operational_state(
        &mut self,
        state: OperationalState,
        id: DeviceID,
    ) -> Result<(), Error> {
        debug!("Setting operational state to: {:?}", state);
        let command = Command::WorkingMode(Access::Set(state));
        match self.exchange(command, id).await {
            Ok(reply) => {
                debug!(
                    "Operational state set to {:?}, reply: {:02X?}",
                    state,
                    reply.as_bytes()
                );
                Ok(())
            }
            Err(Error::Timeout) if command.is_sleep() => {
                debug!("No acknowledgement to sleep command, assuming asleep");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Queries the operational state of the sensor `id`.
    pub async fn get_operational_state(&mut self, id: DeviceID) -> Result<OperationalState, Error> {
        debug!("Querying operational state (CMD 0x06, Query)");
        let reply = self.exchange(Command::WorkingMode(Access::Get), id).await?;
        let state = OperationalState::try_from(reply.data()[2])?;
        debug!("Queried operational state: {:?}", state);
        Ok(state)
    }

    /// Sets the working period (duty cycle) of the sensor `id`.
    ///
    /// - A value of `0` sets the sensor to continuous working mode.
    /// - Values from `1` to `30` make the sensor work for 30 seconds, then sleep for
    ///   the rest of a `period` minute cycle.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the sensor acknowledged the change.
    /// * `Err(Error::InvalidParameter)` if `period` is greater than 30; nothing is sent.
    /// * `Err(Error)` if the exchange failed.
    pub async fn set_working_period(&mut self, period: u8, id: DeviceID) -> Result<(), Error> {
        if period > MAX_DUTY_CYCLE {
            log::error!("Working period {} out of range (0-30)", period);
            return Err(Error::InvalidParameter);
        }
        debug!("Setting working period to: {} minutes", period);
        let reply = self
            .exchange(Command::DutyCycle(Access::Set(period)), id)
            .await?;
        debug!("Working period set to {}, reply: {:02X?}", period, reply.as_bytes());
        Ok(())
    }

    /// Queries the working period of the sensor `id`, in minutes (0-30).
    ///
    /// A reported value above 30 yields `Err(Error::UnexpectedValue)`.
    pub async fn get_working_period(&mut self, id: DeviceID) -> Result<u8, Error> {
        debug!("Querying working period (CMD 0x08, Query)");
        let reply = self.exchange(Command::DutyCycle(Access::Get), id).await?;
        let period = reply.data()[2];
        if period > MAX_DUTY_CYCLE {
            log::warn!("get_working_period: out of range value {}", period);
            return Err(Error::UnexpectedValue(period));
        }
        debug!("Queried working period: {} minutes", period);
        Ok(period)
    }

    /// Assigns `new_id` to the sensor currently addressed as `id`.
    ///
    /// The reply must carry the new id. The configured id follows the change when
    /// `id` is the configured one or broadcast.
    pub async fn set_device_id(&mut self, new_id: DeviceID, id: DeviceID) -> Result<(), Error> {
        debug!(
            "Setting device ID to: {:02X}{:02X}",
            new_id.id2, new_id.id1
        );
        let reply = self.exchange(Command::SetDeviceId(new_id), id).await?;

        if id == self.config.id || id.is_broadcast() {
            self.config.id = new_id;
        }
        debug!(
            "Device ID updated to {:02X}{:02X}. Reply: {:02X?}",
            new_id.id2,
            new_id.id1,
            reply.as_bytes()
        );
        Ok(())
    }

    /// Retrieves the firmware build date of the sensor `id`.
    ///
    /// For example, a firmware version of "15-10-21" (YY-MM-DD) is returned as
    /// `FirmwareVersion { year: 15, month: 10, day: 21 }`.
    pub async fn get_firmware(&mut self, id: DeviceID) -> Result<FirmwareVersion, Error> {
        debug!("Getting firmware version (CMD 0x07)");
        let reply = self.exchange(Command::FirmwareVersion, id).await?;
        let [_, year, month, day] = reply.data();
        debug!("Firmware version: 20{}-{}-{}", year, month, day);
        Ok(FirmwareVersion { year, month, day })
    }
}

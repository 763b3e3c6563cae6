//! Command frame encoding and reply frame validation.
//!
//! Command frame (19 bytes):
//! `AA B4 <sub> <data 3..=14> <id lo> <id hi> <checksum> AB`
//!
//! Reply frame (10 bytes):
//! `AA <kind> <data 2..=5> <id lo> <id hi> <checksum> AB`
//!
//! Checksums are the low byte of the sum of the data bytes, head, command id
//! and tail excluded.

use crate::{
    DeviceID, DeviceMode, Error, OperationalState, ACCESS_GET, ACCESS_SET, CMD_DUTY_CYCLE,
    CMD_FIRMWARE_VERSION, CMD_QUERY_DATA, CMD_REPORTING_MODE, CMD_SET_DEVICE_ID,
    CMD_WORKING_MODE, COMMAND_ID, COMMAND_LEN, DATA_REPORT_ID, HEAD, MAX_DUTY_CYCLE, REPLY_ID,
    REPLY_LEN, TAIL,
};

/// Whether a command reads the current setting or writes a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<T> {
    Get,
    Set(T),
}

/// A command understood by the sensor, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReportingMode(Access<DeviceMode>),
    Query,
    /// Assigns a new id to the addressed sensor.
    SetDeviceId(DeviceID),
    WorkingMode(Access<OperationalState>),
    /// Duty cycle in minutes, 0 meaning continuous.
    DutyCycle(Access<u8>),
    FirmwareVersion,
}

impl Command {
    /// The sub-command byte at offset 2.
    pub fn subcommand(&self) -> u8 {
        match self {
            Command::ReportingMode(_) => CMD_REPORTING_MODE,
            Command::Query => CMD_QUERY_DATA,
            Command::SetDeviceId(_) => CMD_SET_DEVICE_ID,
            Command::WorkingMode(_) => CMD_WORKING_MODE,
            Command::DutyCycle(_) => CMD_DUTY_CYCLE,
            Command::FirmwareVersion => CMD_FIRMWARE_VERSION,
        }
    }

    /// The command id the sensor answers this command with.
    pub fn reply_id(&self) -> u8 {
        match self {
            Command::Query => DATA_REPORT_ID,
            _ => REPLY_ID,
        }
    }

    /// Returns true when the command puts the sensor to sleep.
    pub fn is_sleep(&self) -> bool {
        matches!(
            self,
            Command::WorkingMode(Access::Set(OperationalState::Sleeping))
        )
    }

    // Access and value bytes (offsets 3 and 4) of the setting commands.
    fn setting(&self) -> Option<(u8, Option<u8>)> {
        fn split<T>(access: &Access<T>, to_byte: impl Fn(&T) -> u8) -> (u8, Option<u8>) {
            match access {
                Access::Get => (ACCESS_GET, None),
                Access::Set(value) => (ACCESS_SET, Some(to_byte(value))),
            }
        }

        match self {
            Command::ReportingMode(access) => Some(split(access, |m| m.to_byte())),
            Command::WorkingMode(access) => Some(split(access, |s| s.to_byte())),
            Command::DutyCycle(access) => Some(split(access, |d| *d)),
            _ => None,
        }
    }
}

/// Low byte of the sum of bytes 2..=16 of a command frame.
pub fn checksum_command(frame: &[u8; COMMAND_LEN]) -> u8 {
    frame[2..=16]
        .iter()
        .fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Low byte of the sum of bytes 2..=7 of a reply frame.
pub fn checksum_reply(frame: &[u8; REPLY_LEN]) -> u8 {
    frame[2..=7].iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Builds the command frame addressed to `id`.
///
/// Returns `Error::InvalidParameter` when the duty cycle exceeds 30 minutes.
pub fn encode_command(command: &Command, id: DeviceID) -> Result<[u8; COMMAND_LEN], Error> {
    let mut frame = [0u8; COMMAND_LEN];
    frame[0] = HEAD;
    frame[1] = COMMAND_ID;
    frame[2] = command.subcommand();

    if let Command::DutyCycle(Access::Set(period)) = command {
        if *period > MAX_DUTY_CYCLE {
            return Err(Error::InvalidParameter);
        }
    }

    if let Some((access, value)) = command.setting() {
        frame[3] = access;
        frame[4] = value.unwrap_or(0x00);
    }

    if let Command::SetDeviceId(new_id) = command {
        frame[13] = new_id.id1;
        frame[14] = new_id.id2;
    }

    frame[15] = id.id1;
    frame[16] = id.id2;
    frame[17] = checksum_command(&frame);
    frame[18] = TAIL;
    Ok(frame)
}

/// A reply frame that passed framing and checksum validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    frame: [u8; REPLY_LEN],
}

impl Reply {
    /// The reply kind (`DATA_REPORT_ID` or `REPLY_ID`).
    pub fn kind(&self) -> u8 {
        self.frame[1]
    }

    /// Data bytes 2..=5.
    pub fn data(&self) -> [u8; 4] {
        [self.frame[2], self.frame[3], self.frame[4], self.frame[5]]
    }

    /// The device id the sensor reported.
    pub fn id(&self) -> DeviceID {
        DeviceID::new(self.frame[6], self.frame[7])
    }

    /// Raw PM2.5 and PM10 values of a measurement report, in tenths of µg/m³.
    pub fn measurement(&self) -> (u16, u16) {
        let [pm25_lo, pm25_hi, pm10_lo, pm10_hi] = self.data();
        (
            u16::from_le_bytes([pm25_lo, pm25_hi]),
            u16::from_le_bytes([pm10_lo, pm10_hi]),
        )
    }

    pub fn as_bytes(&self) -> &[u8; REPLY_LEN] {
        &self.frame
    }
}

/// Validates a reply frame of kind `expected_kind`.
pub fn decode_reply(bytes: &[u8], expected_kind: u8) -> Result<Reply, Error> {
    let frame: [u8; REPLY_LEN] = bytes.try_into().map_err(|_| Error::FramingError)?;

    if frame[0] != HEAD || frame[9] != TAIL || frame[1] != expected_kind {
        return Err(Error::FramingError);
    }

    let expected = checksum_reply(&frame);
    if expected != frame[8] {
        return Err(Error::ChecksumMismatch {
            expected,
            received: frame[8],
        });
    }

    Ok(Reply { frame })
}

/// Checks that `reply` echoes `command` as sent to `target`.
///
/// Unicast replies must carry the addressed id; replies to a broadcast carry the
/// sensor's own id, which is accepted. A `SetDeviceId` reply must carry the new id.
/// Reports the first differing byte.
pub fn check_echo(command: &Command, target: DeviceID, reply: &Reply) -> Result<(), Error> {
    let received = reply.as_bytes();
    let mut expected = *received;
    expected[0] = HEAD;
    expected[1] = command.reply_id();

    match command {
        Command::Query => {}
        Command::FirmwareVersion => expected[2] = CMD_FIRMWARE_VERSION,
        Command::SetDeviceId(new_id) => {
            expected[2] = CMD_SET_DEVICE_ID;
            expected[3..6].fill(0x00);
            expected[6] = new_id.id1;
            expected[7] = new_id.id2;
        }
        _ => {
            expected[2] = command.subcommand();
            if let Some((access, value)) = command.setting() {
                expected[3] = access;
                if let Some(value) = value {
                    expected[4] = value;
                }
            }
            expected[5] = 0x00;
        }
    }

    if !target.is_broadcast() && !matches!(command, Command::SetDeviceId(_)) {
        expected[6] = target.id1;
        expected[7] = target.id2;
    }
    expected[9] = TAIL;

    match expected
        .iter()
        .zip(received.iter())
        .position(|(e, r)| e != r)
    {
        Some(index) => Err(Error::EchoMismatch {
            index,
            expected: expected[index],
            received: received[index],
        }),
        None => Ok(()),
    }
}

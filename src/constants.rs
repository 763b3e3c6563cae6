// COMMAND_ID is the byte that identifies a command frame sent to the sensor.
pub const COMMAND_ID: u8 = 0xB4;

// DATA_REPORT_ID is the byte that identifies a data report frame received from the sensor.
// This is used in active reporting mode and as the reply to a query data command.
pub const DATA_REPORT_ID: u8 = 0xC0;

// REPLY_ID is the byte that identifies a reply frame received from the sensor
// in response to a command.
pub const REPLY_ID: u8 = 0xC5;

// HEAD is the byte that marks the beginning of any frame (command or data).
pub const HEAD: u8 = 0xAA;

// TAIL is the byte that marks the end of any frame (command or data).
pub const TAIL: u8 = 0xAB;

/// Length in bytes of a command frame.
pub const COMMAND_LEN: usize = 19;

/// Length in bytes of a reply frame.
pub const REPLY_LEN: usize = 10;

// Sub-command bytes, carried at offset 2 of a command frame.
pub const CMD_REPORTING_MODE: u8 = 0x02;
pub const CMD_QUERY_DATA: u8 = 0x04;
pub const CMD_SET_DEVICE_ID: u8 = 0x05;
pub const CMD_WORKING_MODE: u8 = 0x06;
pub const CMD_FIRMWARE_VERSION: u8 = 0x07;
pub const CMD_DUTY_CYCLE: u8 = 0x08;

// Access byte at offset 3: read the current value or write a new one.
pub const ACCESS_GET: u8 = 0x00;
pub const ACCESS_SET: u8 = 0x01;

/// Largest duty cycle, in minutes, the sensor accepts.
pub const MAX_DUTY_CYCLE: u8 = 30;

/// Minimum spacing between two measurement queries.
pub const MIN_QUERY_INTERVAL_MS: u64 = 3000;

/// Reply wait budget used when the configuration does not override it.
pub const DEFAULT_REPLY_TIMEOUT_MS: u32 = 1000;

/// Granularity of the reply poll loop.
pub const POLL_INTERVAL_MS: u32 = 1;

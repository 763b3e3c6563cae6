//! Passive reading of measurement reports from a sensor in active mode.
//!
//! No command is sent and there is no timeout: bytes are pushed one by one into
//! a ten byte window which locks onto `AA C0`, and every complete window is
//! validated. A window that fails validation loses its first byte and the scan
//! goes on, so a scan started mid-frame or hit by a corrupted byte recovers on
//! the next good frame.

use embedded_io_async::{Read, ReadReady, Write};
use log::{debug, warn};

use crate::{
    decode_reply, Clock, Error, SensorReading, Sds011, DATA_REPORT_ID, HEAD, REPLY_LEN,
};

/// Frame resynchronisation state machine, free of I/O.
#[derive(Debug, Clone)]
pub struct FrameScanner {
    window: [u8; REPLY_LEN],
    len: usize,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScanner {
    pub fn new() -> Self {
        Self {
            window: [0u8; REPLY_LEN],
            len: 0,
        }
    }

    /// Forgets any partially collected frame.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Feeds one byte; returns a reading when it completes a valid frame.
    pub fn push(&mut self, byte: u8) -> Option<SensorReading> {
        self.window[self.len] = byte;
        self.len += 1;

        loop {
            let misaligned = (self.len > 0 && self.window[0] != HEAD)
                || (self.len > 1 && self.window[1] != DATA_REPORT_ID);
            if misaligned {
                self.shift();
                continue;
            }
            if self.len < REPLY_LEN {
                return None;
            }

            match decode_reply(&self.window, DATA_REPORT_ID) {
                Ok(reply) => {
                    self.len = 0;
                    return Some(SensorReading::from_raw(reply.measurement(), reply.id()));
                }
                Err(e) => {
                    warn!("Dropping invalid report {:02X?}: {:?}", self.window, e);
                    self.shift();
                }
            }
        }
    }

    // Drops the leading byte of the window.
    fn shift(&mut self) {
        self.window.copy_within(1..self.len, 0);
        self.len -= 1;
    }
}

impl<S, C> Sds011<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Waits for the next valid measurement report streamed by the sensor.
    ///
    /// Only meaningful in Active reporting mode. Must not be interleaved with
    /// command exchanges, which consume the same byte stream.
    pub async fn next_reading(&mut self) -> Result<SensorReading, Error> {
        let mut byte = [0u8; 1];
        loop {
            let read = self
                .serial
                .read(&mut byte)
                .await
                .map_err(|_| Error::ReadFailure)?;
            if read == 0 {
                return Err(Error::ReadFailure);
            }
            if let Some(reading) = self.scanner.push(byte[0]) {
                debug!("Streamed reading: {:?}", reading);
                return Ok(reading);
            }
        }
    }

    /// Consumes only the bytes already available and returns a reading if one
    /// completed. Partial frames are kept for the next call.
    pub async fn poll_reading(&mut self) -> Result<Option<SensorReading>, Error> {
        let mut byte = [0u8; 1];
        while self.serial.read_ready().map_err(|_| Error::ReadFailure)? {
            let read = self
                .serial
                .read(&mut byte)
                .await
                .map_err(|_| Error::ReadFailure)?;
            if read == 0 {
                break;
            }
            if let Some(reading) = self.scanner.push(byte[0]) {
                debug!("Streamed reading: {:?}", reading);
                return Ok(Some(reading));
            }
        }
        Ok(None)
    }

    /// Restarts the scan from an empty window.
    pub fn reset_scanner(&mut self) {
        self.scanner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{reply_frame, MockClock, MockSerial};
    use crate::{Config, DeviceID, REPLY_ID};

    const REPORT: [u8; 10] = [0xAA, 0xC0, 0x64, 0x00, 0xC8, 0x00, 0x00, 0x00, 0x2C, 0xAB];

    fn scan(scanner: &mut FrameScanner, bytes: &[u8]) -> Vec<SensorReading> {
        bytes.iter().filter_map(|&b| scanner.push(b)).collect()
    }

    #[test]
    fn valid_report_yields_reading() {
        let readings = scan(&mut FrameScanner::new(), &REPORT);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].pm2_5, 10.0);
        assert_eq!(readings[0].pm10, 20.0);
        assert_eq!(readings[0].id, DeviceID::new(0, 0));
    }

    #[test]
    fn corrupted_leading_byte_is_skipped() {
        let mut bytes = vec![0x13];
        bytes.extend_from_slice(&REPORT);
        let readings = scan(&mut FrameScanner::new(), &bytes);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].pm10, 20.0);
    }

    #[test]
    fn locks_on_when_started_mid_frame() {
        let mut bytes = REPORT[4..].to_vec();
        bytes.extend_from_slice(&REPORT);
        bytes.extend_from_slice(&REPORT);
        assert_eq!(scan(&mut FrameScanner::new(), &bytes).len(), 2);
    }

    #[test]
    fn head_followed_by_head_resyncs() {
        let mut bytes = vec![0xAA, 0xAA];
        bytes.extend_from_slice(&REPORT);
        assert_eq!(scan(&mut FrameScanner::new(), &bytes).len(), 1);
    }

    #[test]
    fn bad_checksum_or_tail_is_dropped() {
        let mut bad_sum = REPORT;
        bad_sum[8] = 0x00;
        let mut bad_tail = REPORT;
        bad_tail[9] = 0x00;

        let mut bytes = bad_sum.to_vec();
        bytes.extend_from_slice(&bad_tail);
        bytes.extend_from_slice(&REPORT);
        let readings = scan(&mut FrameScanner::new(), &bytes);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].pm2_5, 10.0);
    }

    #[test]
    fn command_replies_are_ignored() {
        let ack = reply_frame(REPLY_ID, [0x06, 0x01, 0x01, 0x00], DeviceID::BROADCAST);
        assert!(scan(&mut FrameScanner::new(), &ack).is_empty());
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut scanner = FrameScanner::new();
        assert!(scan(&mut scanner, &REPORT[..6]).is_empty());
        scanner.reset();
        assert!(scan(&mut scanner, &REPORT[6..]).is_empty());
        assert_eq!(scan(&mut scanner, &REPORT).len(), 1);
    }

    #[tokio::test]
    async fn stream_yields_successive_readings() {
        let serial = MockSerial::new();
        let mut sds = Sds011::new(serial.clone(), MockClock::new(), Config::default());
        let second = reply_frame(DATA_REPORT_ID, [0x0A, 0x00, 0x14, 0x00], DeviceID::from(0xA160));
        serial.feed(&[0x00, 0xAB]);
        serial.feed(&REPORT);
        serial.feed(&second);

        assert_eq!(sds.next_reading().await.unwrap().pm2_5, 10.0);
        let reading = sds.next_reading().await.unwrap();
        assert_eq!(reading.pm2_5, 1.0);
        assert_eq!(reading.id, DeviceID::from(0xA160));
        assert_eq!(sds.next_reading().await, Err(Error::ReadFailure));
    }

    #[tokio::test]
    async fn poll_keeps_partial_frame_between_calls() {
        let serial = MockSerial::new();
        let mut sds = Sds011::new(serial.clone(), MockClock::new(), Config::default());
        serial.feed(&REPORT[..7]);
        assert_eq!(sds.poll_reading().await, Ok(None));

        serial.feed(&REPORT[7..]);
        let reading = sds.poll_reading().await.unwrap().unwrap();
        assert_eq!(reading.pm10, 20.0);
        assert_eq!(serial.unread(), 0);
    }
}

//! One request/reply exchange with the sensor.
//!
//! `Idle -> AwaitingReply -> {matched, Timeout, FramingError, ChecksumMismatch,
//! EchoMismatch} -> Idle`. Input is drained before the command goes out and
//! again once the exchange is over, whatever its outcome, so a late or partial
//! frame cannot leak into the next exchange.

use embedded_io_async::{Read, ReadReady, Write};
use log::{debug, warn};

use crate::{
    check_echo, decode_reply, encode_command, Clock, Command, DeviceID, Error, Reply, Sds011,
    COMMAND_LEN, POLL_INTERVAL_MS, REPLY_LEN,
};

impl<S, C> Sds011<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Sends `command` to `target` and returns the validated reply.
    ///
    /// Never retries; the first failure is returned as is.
    pub(crate) async fn exchange(
        &mut self,
        command: Command,
        target: DeviceID,
    ) -> Result<Reply, Error> {
        let frame = encode_command(&command, target)?;

        // The scanner's partial window is meaningless once replies are consumed here.
        self.scanner.reset();
        self.drain().await?;
        self.write(&frame).await?;

        let outcome = self.await_reply(&command, target).await;
        let drained = self.drain().await;
        let reply = outcome?;
        drained?;
        Ok(reply)
    }

    // Writes a 19-byte command and waits until it has left the transmit buffer.
    async fn write(&mut self, command: &[u8; COMMAND_LEN]) -> Result<(), Error> {
        debug!("Executing command: {:02X?}", command);
        self.serial.flush().await.map_err(|_| Error::WriteFailure)?;
        self.serial
            .write_all(command)
            .await
            .map_err(|_| Error::WriteFailure)?;
        self.serial.flush().await.map_err(|_| Error::WriteFailure)?;
        Ok(())
    }

    // Collects one reply frame within the wait budget, then validates it.
    async fn await_reply(&mut self, command: &Command, target: DeviceID) -> Result<Reply, Error> {
        let mut frame = [0u8; REPLY_LEN];
        let mut filled = 0;
        let start = self.clock.now_ms();
        let budget = u64::from(self.config.reply_timeout_ms);

        loop {
            while filled < REPLY_LEN
                && self
                    .serial
                    .read_ready()
                    .map_err(|_| Error::ReadFailure)?
            {
                let read = self
                    .serial
                    .read(&mut frame[filled..])
                    .await
                    .map_err(|_| Error::ReadFailure)?;
                if read == 0 {
                    return Err(Error::ReadFailure);
                }
                filled += read;
            }

            if filled == REPLY_LEN {
                break;
            }

            let elapsed = self.clock.now_ms().saturating_sub(start);
            if elapsed >= budget {
                warn!(
                    "No reply to {:?} after {} ms ({} of {} bytes)",
                    command, elapsed, filled, REPLY_LEN
                );
                return Err(Error::Timeout);
            }
            self.clock.delay_ms(POLL_INTERVAL_MS).await;
        }

        debug!(
            "Reply after {} ms: {:02X?}",
            self.clock.now_ms().saturating_sub(start),
            frame
        );

        let reply = decode_reply(&frame, command.reply_id()).map_err(|e| {
            warn!("Rejected reply frame {:02X?}: {:?}", frame, e);
            e
        })?;
        check_echo(command, target, &reply).map_err(|e| {
            warn!("Reply to {:?} does not match: {:?}", command, e);
            e
        })?;
        Ok(reply)
    }

    /// Discards every byte the transport has ready.
    pub(crate) async fn drain(&mut self) -> Result<(), Error> {
        let mut scratch = [0u8; REPLY_LEN];
        let mut dropped = 0;

        while self.serial.read_ready().map_err(|_| Error::ReadFailure)? {
            let read = self
                .serial
                .read(&mut scratch)
                .await
                .map_err(|_| Error::ReadFailure)?;
            if read == 0 {
                break;
            }
            dropped += read;
        }

        if dropped > 0 {
            debug!("Drained {} stale bytes", dropped);
        }
        Ok(())
    }
}

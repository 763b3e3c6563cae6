// Scripted serial line and virtual clock shared by the unit tests.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_io_async::{ErrorType, Read, ReadReady, Write};

use crate::{checksum_reply, Clock, DeviceID, COMMAND_LEN, HEAD, REPLY_LEN, TAIL};

/// Builds a reply frame with a valid checksum.
pub fn reply_frame(kind: u8, data: [u8; 4], id: DeviceID) -> [u8; REPLY_LEN] {
    let mut frame = [
        HEAD, kind, data[0], data[1], data[2], data[3], id.id1, id.id2, 0x00, TAIL,
    ];
    frame[8] = checksum_reply(&frame);
    frame
}

#[derive(Default)]
struct Line {
    rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
    written: Vec<[u8; COMMAND_LEN]>,
}

/// Delivers the next scripted reply once a complete command has been written.
#[derive(Clone, Default)]
pub struct MockSerial {
    line: Rc<RefCell<Line>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the bytes sent back after the next command. An empty reply
    /// simulates a silent sensor.
    pub fn reply(&self, bytes: &[u8]) {
        self.line.borrow_mut().replies.push_back(bytes.to_vec());
    }

    /// Makes bytes readable right away, as an actively reporting sensor would.
    pub fn feed(&self, bytes: &[u8]) {
        self.line.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn written(&self) -> Vec<[u8; COMMAND_LEN]> {
        self.line.borrow().written.clone()
    }

    pub fn unread(&self) -> usize {
        self.line.borrow().rx.len()
    }
}

impl ErrorType for MockSerial {
    type Error = Infallible;
}

impl Read for MockSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut line = self.line.borrow_mut();
        let mut count = 0;
        while count < buf.len() {
            match line.rx.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.line.borrow().rx.is_empty())
    }
}

impl Write for MockSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut line = self.line.borrow_mut();
        line.pending.extend_from_slice(buf);
        while line.pending.len() >= COMMAND_LEN {
            let mut command = [0u8; COMMAND_LEN];
            command.copy_from_slice(&line.pending[..COMMAND_LEN]);
            line.pending.drain(..COMMAND_LEN);
            line.written.push(command);
            if let Some(reply) = line.replies.pop_front() {
                line.rx.extend(reply);
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Virtual time; `delay_ms` advances it instead of sleeping.
#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

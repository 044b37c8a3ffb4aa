//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! In-memory [`SerialPort`] double used by this crate's and `sercd-core`'s
//! tests. Holds its read/write sides as plain byte queues rather than
//! talking to a real tty.

use crate::error::SerialResult;
use crate::port::{FlowControl, FlushSelector, Parity, SerialPort, StopSize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A fake serial port. `inbound` is what [`SerialPort::read`] drains (data
/// arriving "from the wire"); `outbound` accumulates everything written to
/// it, for a test to assert against.
#[derive(Debug, Default)]
pub struct MockSerialPort {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    outbound_mirror: Option<Arc<Mutex<Vec<u8>>>>,
    baud_rate: u32,
    data_size: u8,
    parity: Parity,
    stop_size: StopSize,
    flow_control: FlowControl,
    break_active: bool,
    dtr: bool,
    rts: bool,
    modem_state: u8,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self {
            baud_rate: 9600,
            data_size: 8,
            ..Default::default()
        }
    }

    /// Queue bytes that a subsequent [`SerialPort::read`] call will return.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Everything written to this port so far.
    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Set the modem-state byte the next [`SerialPort::modem_state`] call
    /// will report.
    pub fn set_modem_state(&mut self, state: u8) {
        self.modem_state = state;
    }

    /// Mirror every future `write` into a handle that stays reachable after
    /// this port is moved into a `Box<dyn SerialPort>` (e.g. owned by a
    /// `Session`), so a test can still inspect what was written.
    pub fn mirror_outbound(&mut self) -> Arc<Mutex<Vec<u8>>> {
        let mirror = Arc::new(Mutex::new(Vec::new()));
        self.outbound_mirror = Some(mirror.clone());
        mirror
    }
}

impl SerialPort for MockSerialPort {
    fn set_baud_rate(&mut self, rate: u32) -> SerialResult<()> {
        self.baud_rate = rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn set_data_size(&mut self, bits: u8) -> SerialResult<()> {
        self.data_size = bits;
        Ok(())
    }

    fn data_size(&self) -> u8 {
        self.data_size
    }

    fn set_parity(&mut self, parity: Parity) -> SerialResult<()> {
        self.parity = parity;
        Ok(())
    }

    fn parity(&self) -> Parity {
        self.parity
    }

    fn set_stop_size(&mut self, stop: StopSize) -> SerialResult<()> {
        self.stop_size = stop;
        Ok(())
    }

    fn stop_size(&self) -> StopSize {
        self.stop_size
    }

    fn set_flow_control(&mut self, flow: FlowControl) -> SerialResult<()> {
        self.flow_control = flow;
        Ok(())
    }

    fn flow_control(&self) -> FlowControl {
        self.flow_control
    }

    fn set_break(&mut self, active: bool) -> SerialResult<()> {
        self.break_active = active;
        Ok(())
    }

    fn is_break_active(&self) -> bool {
        self.break_active
    }

    fn set_dtr(&mut self, asserted: bool) -> SerialResult<()> {
        self.dtr = asserted;
        Ok(())
    }

    fn dtr(&self) -> bool {
        self.dtr
    }

    fn set_rts(&mut self, asserted: bool) -> SerialResult<()> {
        self.rts = asserted;
        Ok(())
    }

    fn rts(&self) -> bool {
        self.rts
    }

    fn flush(&mut self, selector: FlushSelector) -> SerialResult<()> {
        match selector {
            FlushSelector::Input => self.inbound.clear(),
            FlushSelector::Output => self.outbound.clear(),
            FlushSelector::Both => {
                self.inbound.clear();
                self.outbound.clear();
            }
        }
        Ok(())
    }

    fn modem_state(&mut self) -> SerialResult<u8> {
        Ok(self.modem_state)
    }

    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> SerialResult<usize> {
        self.outbound.extend_from_slice(buf);
        if let Some(mirror) = &self.outbound_mirror {
            mirror.lock().unwrap().extend_from_slice(buf);
        }
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_drains_queued_inbound_bytes() {
        let mut port = MockSerialPort::new();
        port.push_inbound(b"hello");
        let mut buf = [0u8; 3];
        assert_eq!(port.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        let mut buf2 = [0u8; 10];
        assert_eq!(port.read(&mut buf2).unwrap(), 2);
        assert_eq!(&buf2[..2], b"lo");
    }

    #[test]
    fn write_accumulates_into_outbound() {
        let mut port = MockSerialPort::new();
        port.write(b"abc").unwrap();
        port.write(b"def").unwrap();
        assert_eq!(port.outbound(), b"abcdef");
    }

    #[test]
    fn flush_selector_clears_the_right_side() {
        let mut port = MockSerialPort::new();
        port.push_inbound(b"x");
        port.write(b"y").unwrap();
        port.flush(FlushSelector::Output).unwrap();
        assert_eq!(port.outbound(), b"");
        let mut buf = [0u8; 1];
        assert_eq!(port.read(&mut buf).unwrap(), 1);
    }
}

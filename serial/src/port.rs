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

use crate::error::SerialResult;

/// Baud rates this gateway accepts without falling back to the 9600 default
/// (spec.md 6).
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800,
];

/// Parity setting, RFC 2217-numbered (spec.md 9, open question 3: follows
/// the RFC assignment, not the source's divergent sub-version).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None = 1,
    Odd = 2,
    Even = 3,
    Mark = 4,
    Space = 5,
}

impl Parity {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Self::Odd,
            3 => Self::Even,
            4 => Self::Mark,
            5 => Self::Space,
            _ => Self::None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Stop-bit setting. 1.5 stop bits (RFC code 3) downgrades to one stop bit
/// with a warning (spec.md 6).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StopSize {
    #[default]
    One = 1,
    Two = 2,
}

impl StopSize {
    pub fn from_code(code: u8) -> (Self, bool) {
        match code {
            2 => (Self::Two, false),
            3 => (Self::One, true), // 1.5 stop bits, downgraded
            _ => (Self::One, false),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// `PURGE_DATA` selector (spec.md 4.5/6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushSelector {
    Input,
    Output,
    Both,
}

impl FlushSelector {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Input),
            2 => Some(Self::Output),
            3 => Some(Self::Both),
            _ => None,
        }
    }
}

/// Outbound hardware/software flow control mode (RFC 2217 SET_CONTROL
/// selectors 1/2/3).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    #[default]
    None,
    XonXoff,
    RtsCts,
}

/// The external serial-port capability bundle (spec.md 4.2).
///
/// The core event loop treats this as an opaque capability: it never
/// inspects termios directly, only calls these methods. Implementations
/// must restore the port's prior settings on `close`.
pub trait SerialPort: Send {
    fn set_baud_rate(&mut self, rate: u32) -> SerialResult<()>;
    fn baud_rate(&self) -> u32;

    fn set_data_size(&mut self, bits: u8) -> SerialResult<()>;
    fn data_size(&self) -> u8;

    fn set_parity(&mut self, parity: Parity) -> SerialResult<()>;
    fn parity(&self) -> Parity;

    fn set_stop_size(&mut self, stop: StopSize) -> SerialResult<()>;
    fn stop_size(&self) -> StopSize;

    fn set_flow_control(&mut self, flow: FlowControl) -> SerialResult<()>;
    fn flow_control(&self) -> FlowControl;

    fn set_break(&mut self, active: bool) -> SerialResult<()>;
    fn is_break_active(&self) -> bool;

    fn set_dtr(&mut self, asserted: bool) -> SerialResult<()>;
    fn dtr(&self) -> bool;

    fn set_rts(&mut self, asserted: bool) -> SerialResult<()>;
    fn rts(&self) -> bool;

    fn flush(&mut self, selector: FlushSelector) -> SerialResult<()>;

    /// Read the current composite modem-state byte (spec.md 4.2/ glossary):
    /// bits 7..4 are DCD/RI/DSR/CTS levels, bits 3..0 are edge-change
    /// indicators versus the previous sample.
    fn modem_state(&mut self) -> SerialResult<u8>;

    /// Non-blocking read into `buf`; `Ok(0)` means no data currently
    /// available (the event loop only calls this when readiness indicated
    /// data, so `Ok(0)` should not normally occur but is not an error).
    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize>;

    /// Non-blocking write of `buf`; returns the number of bytes accepted.
    fn write(&mut self, buf: &[u8]) -> SerialResult<usize>;

    /// The underlying fd, for the event loop to register with the reactor
    /// for readability/writability notification. `None` for doubles that
    /// have no real fd (the event loop falls back to a short poll tick).
    fn raw_fd(&self) -> Option<std::os::fd::RawFd> {
        None
    }
}

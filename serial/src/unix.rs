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

//! Real `termios`-backed [`SerialPort`], ported from
//! `examples/original_source/unix.c`'s `OpenPort`/`SetPortSpeed`/
//! `SetPortDataSize`/`GetModemState` family of functions.

use crate::error::{SerialError, SerialResult};
use crate::lockfile;
use crate::port::{FlowControl, FlushSelector, Parity, SerialPort, StopSize, SUPPORTED_BAUD_RATES};
use nix::fcntl::{self, FcntlArg, OFlag};
use nix::sys::termios::{
    self, BaudRate, ControlFlags, FlushArg, InputFlags, SetArg, SpecialCharacterIndices,
};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

fn baud_rate_to_nix(rate: u32) -> BaudRate {
    match rate {
        50 => BaudRate::B50,
        75 => BaudRate::B75,
        110 => BaudRate::B110,
        134 => BaudRate::B134,
        150 => BaudRate::B150,
        200 => BaudRate::B200,
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        1800 => BaudRate::B1800,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        460800 => BaudRate::B460800,
        _ => BaudRate::B9600,
    }
}

/// A real serial device, opened non-blocking and switched to raw mode, with
/// an HDB lockfile held for the lifetime of the handle.
pub struct UnixSerialPort {
    fd: OwnedFd,
    device_path: PathBuf,
    lock_path: PathBuf,
    initial_termios: termios::Termios,
    baud_rate: u32,
    data_size: u8,
    parity: Parity,
    stop_size: StopSize,
    flow_control: FlowControl,
    break_active: bool,
    last_modem_bits: u8,
}

impl UnixSerialPort {
    /// Acquire the HDB lock at `lock_path`, open `device_path` non-blocking,
    /// and switch it to raw mode, mirroring `OpenPort` in the original
    /// implementation: `cfmakeraw`, then `HUPCL|CLOCAL` set and `BRKINT`
    /// enabled over `IGNBRK`, written with `TCSANOW`.
    pub fn open(device_path: &Path, lock_path: &Path) -> SerialResult<Self> {
        lockfile::acquire_lock(lock_path)?;

        let open_result = nix::fcntl::open(
            device_path,
            OFlag::O_RDWR | OFlag::O_NOCTTY | OFlag::O_NONBLOCK,
            nix::sys::stat::Mode::empty(),
        );
        let fd = match open_result {
            Ok(fd) => fd,
            Err(source) => {
                let _ = lockfile::release_lock(lock_path);
                return Err(SerialError::Io {
                    path: device_path.display().to_string(),
                    source: std::io::Error::from(source),
                });
            }
        };
        // SAFETY: `fd` was just returned by a successful `open` call above
        // and is not owned anywhere else yet.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let initial_termios = termios::tcgetattr(fd.as_fd())?;
        let mut raw = initial_termios.clone();
        termios::cfmakeraw(&mut raw);
        raw.control_flags
            .insert(ControlFlags::HUPCL | ControlFlags::CLOCAL);
        raw.input_flags.remove(InputFlags::IGNBRK);
        raw.input_flags.insert(InputFlags::BRKINT);
        termios::tcsetattr(fd.as_fd(), SetArg::TCSANOW, &raw)?;

        let existing_flags = fcntl::fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)
            .map(OFlag::from_bits_truncate)
            .unwrap_or(OFlag::empty());
        let _ = fcntl::fcntl(
            fd.as_raw_fd(),
            FcntlArg::F_SETFL(existing_flags & !OFlag::O_NONBLOCK),
        );

        Ok(Self {
            fd,
            device_path: device_path.to_path_buf(),
            lock_path: lock_path.to_path_buf(),
            initial_termios,
            baud_rate: 9600,
            data_size: 8,
            parity: Parity::None,
            stop_size: StopSize::One,
            flow_control: FlowControl::None,
            break_active: false,
            last_modem_bits: 0,
        })
    }

    fn borrow(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    fn with_termios<F>(&mut self, f: F) -> SerialResult<()>
    where
        F: FnOnce(&mut termios::Termios),
    {
        let mut t = termios::tcgetattr(self.borrow())?;
        f(&mut t);
        termios::tcsetattr(self.borrow(), SetArg::TCSADRAIN, &t)?;
        Ok(())
    }
}

impl Drop for UnixSerialPort {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(self.borrow(), SetArg::TCSANOW, &self.initial_termios);
        let _ = lockfile::release_lock(&self.lock_path);
        tracing::debug!(device = %self.device_path.display(), "closed serial port");
    }
}

impl SerialPort for UnixSerialPort {
    fn set_baud_rate(&mut self, rate: u32) -> SerialResult<()> {
        let rate = if SUPPORTED_BAUD_RATES.contains(&rate) {
            rate
        } else {
            tracing::warn!(requested = rate, "unsupported baud rate, using 9600");
            9600
        };
        let nix_rate = baud_rate_to_nix(rate);
        self.with_termios(|t| {
            let _ = termios::cfsetispeed(t, nix_rate);
            let _ = termios::cfsetospeed(t, nix_rate);
        })?;
        self.baud_rate = rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn set_data_size(&mut self, bits: u8) -> SerialResult<()> {
        let cs = match bits {
            5 => ControlFlags::CS5,
            6 => ControlFlags::CS6,
            7 => ControlFlags::CS7,
            _ => ControlFlags::CS8,
        };
        self.with_termios(|t| {
            t.control_flags.remove(ControlFlags::CSIZE);
            t.control_flags.insert(cs);
        })?;
        self.data_size = if (5..=8).contains(&bits) { bits } else { 8 };
        Ok(())
    }

    fn data_size(&self) -> u8 {
        self.data_size
    }

    fn set_parity(&mut self, parity: Parity) -> SerialResult<()> {
        self.with_termios(|t| {
            t.control_flags
                .remove(ControlFlags::PARENB | ControlFlags::PARODD);
            match parity {
                Parity::None => {}
                Parity::Odd | Parity::Mark => {
                    t.control_flags
                        .insert(ControlFlags::PARENB | ControlFlags::PARODD);
                }
                Parity::Even | Parity::Space => {
                    t.control_flags.insert(ControlFlags::PARENB);
                }
            }
        })?;
        self.parity = parity;
        Ok(())
    }

    fn parity(&self) -> Parity {
        self.parity
    }

    fn set_stop_size(&mut self, stop: StopSize) -> SerialResult<()> {
        self.with_termios(|t| match stop {
            StopSize::One => t.control_flags.remove(ControlFlags::CSTOPB),
            StopSize::Two => t.control_flags.insert(ControlFlags::CSTOPB),
        })?;
        self.stop_size = stop;
        Ok(())
    }

    fn stop_size(&self) -> StopSize {
        self.stop_size
    }

    fn set_flow_control(&mut self, flow: FlowControl) -> SerialResult<()> {
        self.with_termios(|t| {
            t.control_flags.remove(ControlFlags::CRTSCTS);
            t.input_flags
                .remove(InputFlags::IXON | InputFlags::IXOFF);
            match flow {
                FlowControl::None => {}
                FlowControl::RtsCts => t.control_flags.insert(ControlFlags::CRTSCTS),
                FlowControl::XonXoff => {
                    t.input_flags.insert(InputFlags::IXON | InputFlags::IXOFF);
                    t.control_chars[SpecialCharacterIndices::VSTART as usize] = 0x11;
                    t.control_chars[SpecialCharacterIndices::VSTOP as usize] = 0x13;
                }
            }
        })?;
        self.flow_control = flow;
        Ok(())
    }

    fn flow_control(&self) -> FlowControl {
        self.flow_control
    }

    fn set_break(&mut self, active: bool) -> SerialResult<()> {
        if active {
            termios::tcsendbreak(self.borrow(), 0)?;
        }
        self.break_active = active;
        Ok(())
    }

    fn is_break_active(&self) -> bool {
        self.break_active
    }

    fn set_dtr(&mut self, asserted: bool) -> SerialResult<()> {
        set_modem_bit(self.fd.as_raw_fd(), libc_tiocm_dtr(), asserted)
    }

    fn dtr(&self) -> bool {
        get_modem_bits(self.fd.as_raw_fd()).map(|b| b & libc_tiocm_dtr() != 0).unwrap_or(false)
    }

    fn set_rts(&mut self, asserted: bool) -> SerialResult<()> {
        set_modem_bit(self.fd.as_raw_fd(), libc_tiocm_rts(), asserted)
    }

    fn rts(&self) -> bool {
        get_modem_bits(self.fd.as_raw_fd()).map(|b| b & libc_tiocm_rts() != 0).unwrap_or(false)
    }

    fn flush(&mut self, selector: FlushSelector) -> SerialResult<()> {
        let arg = match selector {
            FlushSelector::Input => FlushArg::TCIFLUSH,
            FlushSelector::Output => FlushArg::TCOFLUSH,
            FlushSelector::Both => FlushArg::TCIOFLUSH,
        };
        termios::tcflush(self.borrow(), arg)?;
        Ok(())
    }

    /// Composite modem-state byte per `GetModemState` in the original
    /// implementation: bits 7/6/5/4 are DCD/RI/DSR/CTS level, bits 3/2/1/0
    /// are their change flags versus the previous sample.
    fn modem_state(&mut self) -> SerialResult<u8> {
        let bits = get_modem_bits(self.fd.as_raw_fd())?;
        let mut state: u8 = 0;
        if bits & libc_tiocm_car() != 0 {
            state |= 0x80;
        }
        if bits & libc_tiocm_ring() != 0 {
            state |= 0x40;
        }
        if bits & libc_tiocm_dsr() != 0 {
            state |= 0x20;
        }
        if bits & libc_tiocm_cts() != 0 {
            state |= 0x10;
        }
        let delta = state ^ (self.last_modem_bits & 0xF0);
        state |= (delta >> 4) & 0x0F;
        self.last_modem_bits = state & 0xF0;
        Ok(state)
    }

    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize> {
        match nix::unistd::read(&self.fd, buf) {
            Ok(n) => Ok(n),
            Err(nix::Error::EAGAIN) => Ok(0),
            Err(source) => Err(SerialError::from(source)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> SerialResult<usize> {
        match nix::unistd::write(&self.fd, buf) {
            Ok(n) => Ok(n),
            Err(nix::Error::EAGAIN) => Ok(0),
            Err(source) => Err(SerialError::from(source)),
        }
    }

    fn raw_fd(&self) -> Option<std::os::fd::RawFd> {
        Some(self.fd.as_raw_fd())
    }
}

// TIOCM_* bit values are stable across Linux/BSD; `nix::sys::ioctl` does not
// expose them as a portable enum, so they are named here directly rather
// than pulled in via a feature-gated libc dependency.
fn libc_tiocm_dtr() -> i32 {
    0x002
}
fn libc_tiocm_rts() -> i32 {
    0x004
}
fn libc_tiocm_car() -> i32 {
    0x040
}
fn libc_tiocm_ring() -> i32 {
    0x080
}
fn libc_tiocm_dsr() -> i32 {
    0x100
}
fn libc_tiocm_cts() -> i32 {
    0x020
}

nix::ioctl_read_bad!(tiocmget, 0x5415, i32);
nix::ioctl_write_ptr_bad!(tiocmset, 0x5418, i32);

fn get_modem_bits(fd: RawFd) -> SerialResult<i32> {
    let mut bits: i32 = 0;
    unsafe { tiocmget(fd, &mut bits) }.map_err(SerialError::from)?;
    Ok(bits)
}

fn set_modem_bit(fd: RawFd, bit: i32, asserted: bool) -> SerialResult<()> {
    let mut bits = get_modem_bits(fd)?;
    if asserted {
        bits |= bit;
    } else {
        bits &= !bit;
    }
    unsafe { tiocmset(fd, &bits) }.map_err(SerialError::from)?;
    Ok(())
}

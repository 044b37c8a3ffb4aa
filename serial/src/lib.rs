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

//! # Serial driver adapter
//!
//! The [`SerialPort`] trait is the external contract spec.md 4.2/6 describes:
//! open/close with HDB locking, raw-mode termios setup, and the getter/setter
//! surface RFC 2217 COM-PORT subnegotiations drive. [`unix::UnixSerialPort`]
//! is the real `termios`-backed implementation (Unix only); [`mock::MockSerialPort`]
//! is an in-memory double used by `sercd-core`'s tests and this crate's own.
//!
//! [`lockfile`] implements the HDB-ASCII lockfile format spec.md 6 specifies.

mod error;
pub mod lockfile;
mod mock;
mod port;
#[cfg(unix)]
mod unix;

pub use self::error::{SerialError, SerialResult};
pub use self::mock::MockSerialPort;
pub use self::port::{FlowControl, FlushSelector, Parity, SerialPort, StopSize, SUPPORTED_BAUD_RATES};
#[cfg(unix)]
pub use self::unix::UnixSerialPort;

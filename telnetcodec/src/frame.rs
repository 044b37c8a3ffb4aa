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

use crate::options::TelnetOption;
use bytes::Bytes;

/// The four Telnet negotiation verbs (spec.md 3: `TelnetCommand`'s `kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationKind {
    Will,
    Wont,
    Do,
    Dont,
}

/// A single decoded unit of the Telnet stream (spec.md 3: `TelnetCommand`).
///
/// This is the decoder's only output type; application data and protocol
/// commands share one stream so that byte ordering between them is never
/// lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetFrame {
    /// A single application byte bound for the serial device.
    Data(u8),
    /// `IAC <WILL|WONT|DO|DONT> option`.
    Negotiate {
        kind: NegotiationKind,
        option: TelnetOption,
    },
    /// A complete `IAC SB option ...payload... IAC SE` sequence. `payload`
    /// excludes the leading option byte and the trailing `IAC SE`.
    Subnegotiation { option: TelnetOption, payload: Bytes },
    /// A bare two-byte RFC 854 command (`IAC NOP`, `IAC AYT`, ...) with no
    /// option byte. Not produced for `WILL`/`WONT`/`DO`/`DONT`/`SB`, which
    /// become [`TelnetFrame::Negotiate`] / [`TelnetFrame::Subnegotiation`].
    Command(u8),
}

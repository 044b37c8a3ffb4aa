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

use crate::consts::option;

/// A Telnet option code. Only the options this gateway actually negotiates
/// get a named variant; everything else round-trips through `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelnetOption {
    TransmitBinary,
    Echo,
    SuppressGoAhead,
    ComPort,
    Other(u8),
}

impl TelnetOption {
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            option::TRANSMIT_BINARY => Self::TransmitBinary,
            option::ECHO => Self::Echo,
            option::SUPPRESS_GO_AHEAD => Self::SuppressGoAhead,
            option::COM_PORT_OPTION => Self::ComPort,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::TransmitBinary => option::TRANSMIT_BINARY,
            Self::Echo => option::ECHO,
            Self::SuppressGoAhead => option::SUPPRESS_GO_AHEAD,
            Self::ComPort => option::COM_PORT_OPTION,
            Self::Other(b) => b,
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransmitBinary => write!(f, "TRANSMIT-BINARY"),
            Self::Echo => write!(f, "ECHO"),
            Self::SuppressGoAhead => write!(f, "SUPPRESS-GO-AHEAD"),
            Self::ComPort => write!(f, "COM-PORT-OPTION"),
            Self::Other(b) => write!(f, "OPTION({b})"),
        }
    }
}

/// Per-option negotiation bookkeeping (spec.md 3: `TelnetOptionTable`).
///
/// `is_*` records the negotiated peer posture; `sent_*` guards against
/// redundant negotiation emission and is cleared once the peer's matching
/// reply arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags {
    pub sent_will: bool,
    pub sent_do: bool,
    pub sent_wont: bool,
    pub sent_dont: bool,
    pub is_will: bool,
    pub is_do: bool,
}

/// One [`OptionFlags`] record per possible option code (0..=255).
pub struct TelnetOptionTable {
    entries: [OptionFlags; 256],
}

impl std::fmt::Debug for TelnetOptionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetOptionTable").finish_non_exhaustive()
    }
}

impl Default for TelnetOptionTable {
    fn default() -> Self {
        Self {
            entries: [OptionFlags::default(); 256],
        }
    }
}

impl TelnetOptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self, option: TelnetOption) -> OptionFlags {
        self.entries[option.as_u8() as usize]
    }

    pub fn flags_mut(&mut self, option: TelnetOption) -> &mut OptionFlags {
        &mut self.entries[option.as_u8() as usize]
    }

    /// Is `option` currently enabled on our side (we are WILLing it)?
    pub fn is_will(&self, option: TelnetOption) -> bool {
        self.flags(option).is_will
    }

    /// Is `option` currently enabled on the peer's side (peer is WILLing it,
    /// i.e. we have agreed to DO it)?
    pub fn is_do(&self, option: TelnetOption) -> bool {
        self.flags(option).is_do
    }
}

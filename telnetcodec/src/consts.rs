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

//! Raw Telnet (RFC 854) and RFC 2217 byte constants.

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const GA: u8 = 249;
pub const EL: u8 = 248;
pub const EC: u8 = 247;
pub const AYT: u8 = 246;
pub const AO: u8 = 245;
pub const IP: u8 = 244;
pub const BRK: u8 = 243;
pub const DM: u8 = 242;
pub const NOP: u8 = 241;
pub const SE: u8 = 240;

pub const CR: u8 = 0x0D;
pub const LF: u8 = 0x0A;
pub const NUL: u8 = 0x00;

/// Telnet option codes this gateway negotiates.
pub mod option {
    pub const TRANSMIT_BINARY: u8 = 0;
    pub const ECHO: u8 = 1;
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    pub const COM_PORT_OPTION: u8 = 44;
}

/// RFC 2217 COM-PORT-OPTION subnegotiation subcommand codes, client -> server.
///
/// Server replies use the same code plus [`SERVER_REPLY_OFFSET`].
pub mod cpc {
    pub const SIGNATURE: u8 = 0;
    pub const SET_BAUDRATE: u8 = 1;
    pub const SET_DATASIZE: u8 = 2;
    pub const SET_PARITY: u8 = 3;
    pub const SET_STOPSIZE: u8 = 4;
    pub const SET_CONTROL: u8 = 5;
    pub const NOTIFY_LINESTATE: u8 = 6;
    pub const NOTIFY_MODEMSTATE: u8 = 7;
    pub const FLOWCONTROL_SUSPEND: u8 = 8;
    pub const FLOWCONTROL_RESUME: u8 = 9;
    pub const SET_LINESTATE_MASK: u8 = 10;
    pub const SET_MODEMSTATE_MASK: u8 = 11;
    pub const PURGE_DATA: u8 = 12;

    pub const SERVER_REPLY_OFFSET: u8 = 100;
}

/// Maximum signature payload length (spec.md 4.5: "limited to 255 bytes").
pub const SIGNATURE_MAX_LEN: usize = 255;

/// Worst-case bytes emitted by a completed `write_app_byte` call (IAC doubling).
pub const ESC_WRITE_CHAR_MAX: usize = 2;
/// Worst-case bytes needed in `to_dev` for one decoded inbound app byte.
pub const ESC_REDIRECT_CHAR_DEV_MAX: usize = 1;

/// `6 + 2*255`: IAC SB OPT SUBCMD=100 + escaped signature + IAC SE.
pub const SEND_SIGNATURE_MAX: usize = 6 + 2 * SIGNATURE_MAX_LEN;
/// `6 + 2*4`: IAC SB OPT SUBCMD=101 + escaped 4-byte baud rate + IAC SE.
pub const SEND_BAUDRATE_MAX: usize = 6 + 2 * 4;
/// IAC SB OPT SUBCMD escaped-single-byte-param IAC SE.
pub const SEND_CPC_BYTE_COMMAND_MAX: usize = 8;
/// IAC <WILL|WONT|DO|DONT> OPT.
pub const SEND_OPTION_MAX: usize = 3;

/// Worst-case bytes a single inbound network byte can cause to be written to
/// `to_net` as a CPC reply (spec.md 4.4).
pub const ESC_REDIRECT_CHAR_SOCK_MAX: usize = const_max4(
    SEND_SIGNATURE_MAX,
    SEND_BAUDRATE_MAX,
    SEND_CPC_BYTE_COMMAND_MAX,
    SEND_OPTION_MAX,
);

const fn const_max4(a: usize, b: usize, c: usize, d: usize) -> usize {
    let ab = if a > b { a } else { b };
    let cd = if c > d { c } else { d };
    if ab > cd { ab } else { cd }
}

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

//! RFC 2217 COM-PORT-OPTION subnegotiation payloads.
//!
//! [`CpcCommand`] is the parsed form of a [`crate::TelnetFrame::Subnegotiation`]
//! whose option is [`crate::TelnetOption::ComPort`]; [`CpcCommand::parse`] turns
//! the raw payload bytes (subcommand byte + parameters, as captured by the
//! decoder) into one of these variants, and [`CpcReply::encode`] turns a
//! server reply back into payload bytes (subcommand + 100, then parameters)
//! for the caller to frame with `IAC SB 44 ... IAC SE`.

use crate::consts::cpc;
use bytes::{Bytes, BytesMut};

/// A parsed RFC 2217 COM-PORT-OPTION request, client -> server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpcCommand {
    SignatureQuery,
    SignatureReport(Bytes),
    BaudRate(u32),
    DataSize(u8),
    Parity(u8),
    StopSize(u8),
    Control(u8),
    FlowSuspend,
    FlowResume,
    LineStateMask(u8),
    ModemStateMask(u8),
    PurgeData(u8),
    /// A subcommand byte this gateway does not recognize.
    Unknown(u8),
}

impl CpcCommand {
    /// Parse a subnegotiation payload (subcommand byte followed by
    /// parameters, IAC-unescaped) per spec.md 4.4/4.5.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let &subcmd = payload.first()?;
        let params = &payload[1..];
        Some(match subcmd {
            cpc::SIGNATURE if params.is_empty() => Self::SignatureQuery,
            cpc::SIGNATURE => Self::SignatureReport(Bytes::copy_from_slice(params)),
            cpc::SET_BAUDRATE if params.len() == 4 => {
                Self::BaudRate(u32::from_be_bytes(params.try_into().ok()?))
            }
            cpc::SET_DATASIZE if params.len() == 1 => Self::DataSize(params[0]),
            cpc::SET_PARITY if params.len() == 1 => Self::Parity(params[0]),
            cpc::SET_STOPSIZE if params.len() == 1 => Self::StopSize(params[0]),
            cpc::SET_CONTROL if params.len() == 1 => Self::Control(params[0]),
            cpc::FLOWCONTROL_SUSPEND => Self::FlowSuspend,
            cpc::FLOWCONTROL_RESUME => Self::FlowResume,
            cpc::SET_LINESTATE_MASK if params.len() == 1 => Self::LineStateMask(params[0]),
            cpc::SET_MODEMSTATE_MASK if params.len() == 1 => Self::ModemStateMask(params[0]),
            cpc::PURGE_DATA if params.len() == 1 => Self::PurgeData(params[0]),
            other => Self::Unknown(other),
        })
    }
}

/// A server -> client RFC 2217 reply, ready to be payload-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpcReply {
    Signature(Bytes),
    BaudRate(u32),
    DataSize(u8),
    Parity(u8),
    StopSize(u8),
    Control(u8),
    LineStateMask(u8),
    ModemStateMask(u8),
    ModemState(u8),
    PurgeData(u8),
}

impl CpcReply {
    /// Encode subcommand byte (client code + 100) and parameters, unescaped.
    /// The caller is responsible for IAC-doubling and framing.
    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            Self::Signature(sig) => {
                out.extend_from_slice(&[cpc::SIGNATURE + cpc::SERVER_REPLY_OFFSET]);
                out.extend_from_slice(sig);
            }
            Self::BaudRate(rate) => {
                out.extend_from_slice(&[cpc::SET_BAUDRATE + cpc::SERVER_REPLY_OFFSET]);
                out.extend_from_slice(&rate.to_be_bytes());
            }
            Self::DataSize(v) => {
                out.extend_from_slice(&[cpc::SET_DATASIZE + cpc::SERVER_REPLY_OFFSET, *v]);
            }
            Self::Parity(v) => {
                out.extend_from_slice(&[cpc::SET_PARITY + cpc::SERVER_REPLY_OFFSET, *v]);
            }
            Self::StopSize(v) => {
                out.extend_from_slice(&[cpc::SET_STOPSIZE + cpc::SERVER_REPLY_OFFSET, *v]);
            }
            Self::Control(v) => {
                out.extend_from_slice(&[cpc::SET_CONTROL + cpc::SERVER_REPLY_OFFSET, *v]);
            }
            Self::LineStateMask(v) => {
                out.extend_from_slice(&[cpc::SET_LINESTATE_MASK + cpc::SERVER_REPLY_OFFSET, *v]);
            }
            Self::ModemStateMask(v) => {
                out.extend_from_slice(&[cpc::SET_MODEMSTATE_MASK + cpc::SERVER_REPLY_OFFSET, *v]);
            }
            Self::ModemState(v) => {
                out.extend_from_slice(&[cpc::NOTIFY_MODEMSTATE, *v]);
            }
            Self::PurgeData(v) => {
                out.extend_from_slice(&[cpc::PURGE_DATA + cpc::SERVER_REPLY_OFFSET, *v]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signature_query() {
        assert_eq!(CpcCommand::parse(&[cpc::SIGNATURE]), Some(CpcCommand::SignatureQuery));
    }

    #[test]
    fn parses_baud_rate() {
        assert_eq!(
            CpcCommand::parse(&[cpc::SET_BAUDRATE, 0x00, 0x00, 0x25, 0x80]),
            Some(CpcCommand::BaudRate(9600))
        );
    }

    #[test]
    fn rejects_malformed_baud_rate() {
        assert_eq!(CpcCommand::parse(&[cpc::SET_BAUDRATE, 0x00]), None);
    }

    #[test]
    fn encodes_baud_reply() {
        let mut out = BytesMut::new();
        CpcReply::BaudRate(9600).encode(&mut out);
        assert_eq!(&out[..], &[101, 0x00, 0x00, 0x25, 0x80]);
    }

    #[test]
    fn encodes_modem_state_notify_without_reply_offset() {
        let mut out = BytesMut::new();
        CpcReply::ModemState(0x91).encode(&mut out);
        assert_eq!(&out[..], &[cpc::NOTIFY_MODEMSTATE, 0x91]);
    }
}

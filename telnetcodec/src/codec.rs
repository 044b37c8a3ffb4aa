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

use crate::consts::{self, cpc, option};
use crate::frame::{NegotiationKind, TelnetFrame};
use crate::options::{TelnetOption, TelnetOptionTable};
use crate::result::{CodecError, CodecResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Subcommands whose parameter length is fixed and un-escaped (spec.md 4.4):
/// the decoder trusts the client to send exactly this many raw bytes before
/// the closing `IAC SE`, the same way the original implementation does.
fn fixed_param_len(subcmd: u8) -> Option<usize> {
    match subcmd {
        cpc::SET_BAUDRATE => Some(4),
        cpc::FLOWCONTROL_SUSPEND | cpc::FLOWCONTROL_RESUME => Some(0),
        cpc::SET_DATASIZE
        | cpc::SET_PARITY
        | cpc::SET_STOPSIZE
        | cpc::SET_CONTROL
        | cpc::SET_LINESTATE_MASK
        | cpc::SET_MODEMSTATE_MASK
        | cpc::PURGE_DATA => Some(1),
        _ => None,
    }
}

#[derive(Debug)]
enum SubState {
    AwaitOption,
    AwaitSubcmd { option: TelnetOption },
    /// RFC 2217 SIGNATURE: variable length, IAC-escaped, terminated by a bare `IAC SE`.
    Signature { buf: Vec<u8>, iac_pending: bool },
    /// Any other subnegotiation whose format this gateway doesn't know: buffered
    /// the same escaped way as Signature, then discarded after logging.
    Unknown { option: TelnetOption, buf: Vec<u8>, iac_pending: bool },
    /// Fixed-length, unescaped CPC parameter bytes.
    FixedRaw {
        option: TelnetOption,
        subcmd: u8,
        remaining: usize,
        buf: Vec<u8>,
    },
    /// Fixed-length payload fully read; next raw byte must be `IAC`.
    AwaitTerminatorIac { option: TelnetOption, subcmd: u8, buf: Vec<u8> },
    /// Saw the terminator `IAC`; next raw byte must be `SE`.
    AwaitTerminatorSe { option: TelnetOption, subcmd: u8, buf: Vec<u8> },
}

#[derive(Debug)]
enum DecoderState {
    Normal,
    IacSeen,
    Negotiate(NegotiationKind),
    Sub(SubState),
}

/// Telnet/IAC + RFC 2217 COM-PORT-OPTION codec (spec.md 4.3, 4.4).
///
/// Owns the per-session [`TelnetOptionTable`] alongside the byte-at-a-time
/// decoder state and the single-byte encoder/decoder CR tracking (`last_in`,
/// `last_out`) the CR-NUL law in spec.md 4.3/4.4 depends on.
#[derive(Debug)]
pub struct TelnetCodec {
    decoder_state: DecoderState,
    options: TelnetOptionTable,
    /// Last byte the decoder delivered as application data (for CR-NUL collapse).
    last_out: u8,
    /// Last byte passed to `write_app_byte` (for CR-NUL insertion).
    last_in: u8,
}

impl Default for TelnetCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetCodec {
    pub fn new() -> Self {
        Self {
            decoder_state: DecoderState::Normal,
            options: TelnetOptionTable::new(),
            last_out: 0,
            last_in: 0,
        }
    }

    pub fn options(&self) -> &TelnetOptionTable {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut TelnetOptionTable {
        &mut self.options
    }

    /// spec.md 4.3 `write_app_byte`: encode one device-originated byte for
    /// the client, IAC-doubling and CR-NUL-inserting as required.
    pub fn write_app_byte(&mut self, byte: u8, dst: &mut BytesMut) {
        if byte == consts::IAC {
            dst.put_u8(consts::IAC);
            dst.put_u8(consts::IAC);
        } else if !self.options.is_will(TelnetOption::TransmitBinary)
            && self.last_in == consts::CR
            && byte != consts::LF
        {
            dst.put_u8(consts::NUL);
            dst.put_u8(byte);
        } else {
            dst.put_u8(byte);
        }
        self.last_in = byte;
    }

    /// spec.md 4.3 `send_option`: emit `IAC <cmd> option` and record the
    /// corresponding `sent_*` flag.
    pub fn send_option(&mut self, kind: NegotiationKind, opt: TelnetOption, dst: &mut BytesMut) {
        let cmd = match kind {
            NegotiationKind::Will => consts::WILL,
            NegotiationKind::Wont => consts::WONT,
            NegotiationKind::Do => consts::DO,
            NegotiationKind::Dont => consts::DONT,
        };
        dst.put_u8(consts::IAC);
        dst.put_u8(cmd);
        dst.put_u8(opt.as_u8());
        let flags = self.options.flags_mut(opt);
        match kind {
            NegotiationKind::Will => flags.sent_will = true,
            NegotiationKind::Wont => flags.sent_wont = true,
            NegotiationKind::Do => flags.sent_do = true,
            NegotiationKind::Dont => flags.sent_dont = true,
        }
    }

    /// Frame a complete COM-PORT subnegotiation reply: `IAC SB 44 <payload> IAC SE`,
    /// IAC-doubling the payload bytes (spec.md 4.3).
    pub fn send_cpc_reply(&mut self, payload: &[u8], dst: &mut BytesMut) {
        dst.put_u8(consts::IAC);
        dst.put_u8(consts::SB);
        dst.put_u8(option::COM_PORT_OPTION);
        for &b in payload {
            if b == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(b);
        }
        dst.put_u8(consts::IAC);
        dst.put_u8(consts::SE);
    }

    /// Emit the pre-session negotiations spec.md 4.3 mandates right after accept.
    pub fn send_initial_negotiations(&mut self, dst: &mut BytesMut) {
        use NegotiationKind::{Do, Will};
        self.send_option(Will, TelnetOption::TransmitBinary, dst);
        self.send_option(Do, TelnetOption::TransmitBinary, dst);
        self.send_option(Will, TelnetOption::Echo, dst);
        self.send_option(Will, TelnetOption::SuppressGoAhead, dst);
        self.send_option(Do, TelnetOption::SuppressGoAhead, dst);
        self.send_option(Do, TelnetOption::ComPort, dst);
    }

    fn step(&mut self, byte: u8) -> CodecResult<Option<TelnetFrame>> {
        match &mut self.decoder_state {
            DecoderState::Normal => {
                if byte == consts::IAC {
                    self.decoder_state = DecoderState::IacSeen;
                    Ok(None)
                } else if !self.options.is_do(TelnetOption::TransmitBinary)
                    && self.last_out == consts::CR
                    && byte == consts::NUL
                {
                    // CR-NUL collapses to the CR already emitted.
                    self.last_out = byte;
                    Ok(None)
                } else {
                    self.last_out = byte;
                    Ok(Some(TelnetFrame::Data(byte)))
                }
            }
            DecoderState::IacSeen => match byte {
                consts::IAC => {
                    self.decoder_state = DecoderState::Normal;
                    self.last_out = consts::IAC;
                    Ok(Some(TelnetFrame::Data(consts::IAC)))
                }
                consts::WILL => {
                    self.decoder_state = DecoderState::Negotiate(NegotiationKind::Will);
                    Ok(None)
                }
                consts::WONT => {
                    self.decoder_state = DecoderState::Negotiate(NegotiationKind::Wont);
                    Ok(None)
                }
                consts::DO => {
                    self.decoder_state = DecoderState::Negotiate(NegotiationKind::Do);
                    Ok(None)
                }
                consts::DONT => {
                    self.decoder_state = DecoderState::Negotiate(NegotiationKind::Dont);
                    Ok(None)
                }
                consts::SB => {
                    self.decoder_state = DecoderState::Sub(SubState::AwaitOption);
                    Ok(None)
                }
                cmd => {
                    // RFC 854 bare two-byte commands (NOP, DM, BRK, IP, AO, AYT, EC, EL, GA).
                    self.decoder_state = DecoderState::Normal;
                    tracing::trace!(command = cmd, "telnet: bare IAC command");
                    Ok(Some(TelnetFrame::Command(cmd)))
                }
            },
            DecoderState::Negotiate(kind) => {
                let kind = *kind;
                let opt = TelnetOption::from_u8(byte);
                self.decoder_state = DecoderState::Normal;
                Ok(Some(TelnetFrame::Negotiate { kind, option: opt }))
            }
            DecoderState::Sub(sub) => self.step_sub(sub, byte),
        }
    }

    fn step_sub(&mut self, sub: &mut SubState, byte: u8) -> CodecResult<Option<TelnetFrame>> {
        match sub {
            SubState::AwaitOption => {
                let opt = TelnetOption::from_u8(byte);
                self.decoder_state = if opt == TelnetOption::ComPort {
                    DecoderState::Sub(SubState::AwaitSubcmd { option: opt })
                } else {
                    tracing::debug!(%opt, "telnet: subnegotiation for option with no known payload format");
                    DecoderState::Sub(SubState::Unknown {
                        option: opt,
                        buf: Vec::new(),
                        iac_pending: false,
                    })
                };
                Ok(None)
            }
            SubState::AwaitSubcmd { option } => {
                let option = *option;
                if byte == cpc::SIGNATURE {
                    self.decoder_state = DecoderState::Sub(SubState::Signature {
                        buf: Vec::new(),
                        iac_pending: false,
                    });
                } else if let Some(len) = fixed_param_len(byte) {
                    if len == 0 {
                        self.decoder_state =
                            DecoderState::Sub(SubState::AwaitTerminatorIac { option, subcmd: byte, buf: Vec::new() });
                    } else {
                        self.decoder_state = DecoderState::Sub(SubState::FixedRaw {
                            option,
                            subcmd: byte,
                            remaining: len,
                            buf: Vec::new(),
                        });
                    }
                } else {
                    tracing::debug!(subcmd = byte, "telnet: unknown COM-PORT subcommand");
                    self.decoder_state = DecoderState::Sub(SubState::Unknown {
                        option,
                        buf: vec![byte],
                        iac_pending: false,
                    });
                }
                Ok(None)
            }
            SubState::Signature { buf, iac_pending } => {
                if *iac_pending {
                    *iac_pending = false;
                    if byte == consts::SE {
                        let payload = std::mem::take(buf);
                        self.decoder_state = DecoderState::Normal;
                        return Ok(Some(TelnetFrame::Subnegotiation {
                            option: TelnetOption::ComPort,
                            payload: Bytes::from(payload),
                        }));
                    } else if byte == consts::IAC {
                        push_capped(buf, consts::IAC);
                    } else {
                        // Malformed escape; treat defensively as end of frame.
                        tracing::debug!("telnet: malformed IAC escape in SIGNATURE payload");
                        self.decoder_state = DecoderState::Normal;
                        return Err(CodecError::MalformedSubnegotiation {
                            option: option::COM_PORT_OPTION,
                        });
                    }
                } else if byte == consts::IAC {
                    *iac_pending = true;
                } else {
                    push_capped(buf, byte);
                }
                Ok(None)
            }
            SubState::Unknown { option, buf, iac_pending } => {
                let option = *option;
                if *iac_pending {
                    *iac_pending = false;
                    if byte == consts::SE {
                        self.decoder_state = DecoderState::Normal;
                        tracing::debug!(%option, "telnet: discarding unknown subnegotiation payload");
                    } else if byte == consts::IAC {
                        push_capped(buf, consts::IAC);
                    } else {
                        self.decoder_state = DecoderState::Normal;
                    }
                } else if byte == consts::IAC {
                    *iac_pending = true;
                } else {
                    push_capped(buf, byte);
                }
                Ok(None)
            }
            SubState::FixedRaw { option, subcmd, remaining, buf } => {
                buf.push(byte);
                *remaining -= 1;
                if *remaining == 0 {
                    self.decoder_state = DecoderState::Sub(SubState::AwaitTerminatorIac {
                        option: *option,
                        subcmd: *subcmd,
                        buf: std::mem::take(buf),
                    });
                }
                Ok(None)
            }
            SubState::AwaitTerminatorIac { option, subcmd, buf } => {
                if byte == consts::IAC {
                    self.decoder_state = DecoderState::Sub(SubState::AwaitTerminatorSe {
                        option: *option,
                        subcmd: *subcmd,
                        buf: std::mem::take(buf),
                    });
                    Ok(None)
                } else {
                    let option = option::COM_PORT_OPTION;
                    self.decoder_state = DecoderState::Normal;
                    Err(CodecError::MalformedSubnegotiation { option })
                }
            }
            SubState::AwaitTerminatorSe { option, subcmd, buf } => {
                self.decoder_state = DecoderState::Normal;
                if byte == consts::SE {
                    let mut payload = Vec::with_capacity(buf.len() + 1);
                    payload.push(*subcmd);
                    payload.extend_from_slice(buf);
                    Ok(Some(TelnetFrame::Subnegotiation {
                        option: *option,
                        payload: Bytes::from(payload),
                    }))
                } else {
                    Err(CodecError::MalformedSubnegotiation {
                        option: option::COM_PORT_OPTION,
                    })
                }
            }
        }
    }
}

fn push_capped(buf: &mut Vec<u8>, byte: u8) {
    if buf.len() < consts::SIGNATURE_MAX_LEN {
        buf.push(byte);
    }
    // Bytes past the cap are silently dropped; the state machine still progresses.
}

impl Decoder for TelnetCodec {
    type Item = TelnetFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<TelnetFrame>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(frame) = self.step(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

impl Encoder<u8> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, byte: u8, dst: &mut BytesMut) -> CodecResult<()> {
        dst.reserve(consts::ESC_WRITE_CHAR_MAX);
        self.write_app_byte(byte, dst);
        Ok(())
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: TelnetFrame, dst: &mut BytesMut) -> CodecResult<()> {
        match frame {
            TelnetFrame::Data(b) => self.write_app_byte(b, dst),
            TelnetFrame::Negotiate { kind, option } => self.send_option(kind, option, dst),
            TelnetFrame::Subnegotiation { option, payload } => {
                dst.reserve(payload.len() * 2 + 6);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(option.as_u8());
                for b in payload.iter().copied() {
                    if b == consts::IAC {
                        dst.put_u8(consts::IAC);
                    }
                    dst.put_u8(b);
                }
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
            }
            TelnetFrame::Command(cmd) => {
                dst.put_u8(consts::IAC);
                dst.put_u8(cmd);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpc::CpcCommand;

    fn decode_all(codec: &mut TelnetCodec, mut input: BytesMut) -> Vec<TelnetFrame> {
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(&mut input).unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn decodes_plain_data() {
        let mut codec = TelnetCodec::new();
        let frames = decode_all(&mut codec, BytesMut::from(&b"Hi"[..]));
        assert_eq!(frames, vec![TelnetFrame::Data(b'H'), TelnetFrame::Data(b'i')]);
    }

    #[test]
    fn iac_in_data_unescapes_to_one_byte() {
        let mut codec = TelnetCodec::new();
        let frames = decode_all(&mut codec, BytesMut::from(&b"A\xFF\xFFB"[..]));
        assert_eq!(
            frames,
            vec![
                TelnetFrame::Data(b'A'),
                TelnetFrame::Data(0xFF),
                TelnetFrame::Data(b'B'),
            ]
        );
    }

    #[test]
    fn cr_nul_collapses_in_non_binary_mode() {
        let mut codec = TelnetCodec::new();
        let frames = decode_all(&mut codec, BytesMut::from(&[consts::CR, consts::NUL][..]));
        assert_eq!(frames, vec![TelnetFrame::Data(consts::CR)]);
    }

    #[test]
    fn cr_lf_passes_through_untouched() {
        let mut codec = TelnetCodec::new();
        let frames = decode_all(&mut codec, BytesMut::from(&[consts::CR, consts::LF][..]));
        assert_eq!(
            frames,
            vec![TelnetFrame::Data(consts::CR), TelnetFrame::Data(consts::LF)]
        );
    }

    #[test]
    fn signature_query_round_trips() {
        let mut codec = TelnetCodec::new();
        let input = BytesMut::from(
            &[
                consts::IAC,
                consts::SB,
                option::COM_PORT_OPTION,
                cpc::SIGNATURE,
                consts::IAC,
                consts::SE,
            ][..],
        );
        let frames = decode_all(&mut codec, input);
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            TelnetFrame::Subnegotiation { option, payload } => {
                assert_eq!(*option, TelnetOption::ComPort);
                assert_eq!(CpcCommand::parse(payload), Some(CpcCommand::SignatureQuery));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn baud_rate_subnegotiation_decodes() {
        let mut codec = TelnetCodec::new();
        let input = BytesMut::from(
            &[
                consts::IAC,
                consts::SB,
                option::COM_PORT_OPTION,
                cpc::SET_BAUDRATE,
                0x00,
                0x00,
                0x25,
                0x80,
                consts::IAC,
                consts::SE,
            ][..],
        );
        let frames = decode_all(&mut codec, input);
        match &frames[0] {
            TelnetFrame::Subnegotiation { payload, .. } => {
                assert_eq!(CpcCommand::parse(payload), Some(CpcCommand::BaudRate(9600)));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn will_negotiation_decodes() {
        let mut codec = TelnetCodec::new();
        let frames = decode_all(
            &mut codec,
            BytesMut::from(&[consts::IAC, consts::WILL, option::COM_PORT_OPTION][..]),
        );
        assert_eq!(
            frames,
            vec![TelnetFrame::Negotiate {
                kind: NegotiationKind::Will,
                option: TelnetOption::ComPort,
            }]
        );
    }

    #[test]
    fn write_app_byte_doubles_iac() {
        let mut codec = TelnetCodec::new();
        let mut out = BytesMut::new();
        codec.write_app_byte(0xFF, &mut out);
        assert_eq!(&out[..], &[0xFF, 0xFF]);
    }

    #[test]
    fn write_app_byte_inserts_nul_after_cr_in_non_binary_mode() {
        let mut codec = TelnetCodec::new();
        let mut out = BytesMut::new();
        codec.write_app_byte(consts::CR, &mut out);
        codec.write_app_byte(b'X', &mut out);
        assert_eq!(&out[..], &[consts::CR, consts::NUL, b'X']);
    }

    #[test]
    fn write_app_byte_does_not_insert_nul_before_lf() {
        let mut codec = TelnetCodec::new();
        let mut out = BytesMut::new();
        codec.write_app_byte(consts::CR, &mut out);
        codec.write_app_byte(consts::LF, &mut out);
        assert_eq!(&out[..], &[consts::CR, consts::LF]);
    }
}

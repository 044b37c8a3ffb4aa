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

//! Option & CPC handler (spec.md 4.5): applies WILL/DO/WONT/DONT policy and
//! executes RFC 2217 COM-PORT-OPTION subcommands against the serial device.

use crate::buffer::RingBuffer;
use crate::cpc::CpcSessionState;
use crate::error::SessionResult;
use bytes::BytesMut;
use sercd_serial::{FlowControl, FlushSelector, Parity, SerialPort, StopSize};
use sercd_telnetcodec::{CpcCommand, CpcReply, NegotiationKind, TelnetCodec, TelnetFrame, TelnetOption};

/// The set of options this gateway negotiates at all; anything else gets a
/// flat refusal (spec.md 4.5).
fn is_negotiable(option: TelnetOption) -> bool {
    matches!(
        option,
        TelnetOption::ComPort
            | TelnetOption::TransmitBinary
            | TelnetOption::Echo
            | TelnetOption::SuppressGoAhead
    )
}

/// Maps a SET_CONTROL query/selector code to the reply code describing the
/// current state in that code's category (flow/break/dtr/rts/inbound).
fn control_reply_code(device: &dyn SerialPort, requested: u8) -> u8 {
    match requested {
        0..=3 => match device.flow_control() {
            FlowControl::None => 1,
            FlowControl::XonXoff => 2,
            FlowControl::RtsCts => 3,
        },
        4..=6 => {
            if device.is_break_active() {
                5
            } else {
                6
            }
        }
        7..=9 => {
            if device.dtr() {
                8
            } else {
                9
            }
        }
        10..=12 => {
            if device.rts() {
                11
            } else {
                12
            }
        }
        _ => 14,
    }
}

/// Stateless policy executor: the signature string and Cisco-compat flag
/// are the only per-run configuration it needs, everything else lives in
/// the session it's handed.
pub struct GatewayHandler {
    signature: bytes::Bytes,
    cisco_compat: bool,
}

impl GatewayHandler {
    pub fn new(device_path: &str, cisco_compat: bool) -> Self {
        let mut signature = format!("sercd {} {device_path}", env!("CARGO_PKG_VERSION")).into_bytes();
        // Keep the wire invariant (spec.md 4.5: signature capped at
        // SIGNATURE_MAX_LEN) regardless of how long `device_path` is.
        signature.truncate(sercd_telnetcodec::consts::SIGNATURE_MAX_LEN);
        Self {
            signature: bytes::Bytes::from(signature),
            cisco_compat,
        }
    }

    /// Dispatch one decoded frame, writing any reply bytes (already fully
    /// IAC-framed) into `net_out`.
    pub fn handle_frame(
        &self,
        frame: TelnetFrame,
        codec: &mut TelnetCodec,
        cpc: &mut CpcSessionState,
        device: Option<&mut dyn SerialPort>,
        to_dev: &mut RingBuffer,
        net_out: &mut BytesMut,
    ) -> SessionResult<()> {
        match frame {
            TelnetFrame::Data(b) => {
                if to_dev.has_room(1) {
                    to_dev.push(b);
                }
            }
            TelnetFrame::Command(cmd) => {
                tracing::debug!(cmd, "ignoring bare telnet command");
            }
            TelnetFrame::Negotiate { kind, option } => {
                self.handle_negotiation(kind, option, codec, cpc, net_out)
            }
            TelnetFrame::Subnegotiation { option, payload } => {
                if option == TelnetOption::ComPort {
                    let flags = codec.options().flags(option);
                    if flags.is_will || flags.is_do {
                        self.handle_cpc(&payload, cpc, device, codec, net_out)?;
                    }
                } else {
                    tracing::debug!(%option, "ignoring subnegotiation for non-negotiated option");
                }
            }
        }
        Ok(())
    }

    fn handle_negotiation(
        &self,
        kind: NegotiationKind,
        option: TelnetOption,
        codec: &mut TelnetCodec,
        cpc: &mut CpcSessionState,
        net_out: &mut BytesMut,
    ) {
        match kind {
            NegotiationKind::Will => {
                if is_negotiable(option) {
                    codec.options_mut().flags_mut(option).is_do = true;
                    if option == TelnetOption::ComPort {
                        cpc.cpc_enabled = true;
                    }
                    if !codec.options().flags(option).sent_do {
                        codec.send_option(NegotiationKind::Do, option, net_out);
                    }
                } else {
                    codec.send_option(NegotiationKind::Dont, option, net_out);
                    codec.options_mut().flags_mut(option).is_do = false;
                }
                let f = codec.options_mut().flags_mut(option);
                f.sent_do = false;
                f.sent_dont = false;
            }
            NegotiationKind::Do => {
                if is_negotiable(option) {
                    codec.options_mut().flags_mut(option).is_will = true;
                    if !codec.options().flags(option).sent_will {
                        codec.send_option(NegotiationKind::Will, option, net_out);
                    }
                } else {
                    codec.send_option(NegotiationKind::Wont, option, net_out);
                    codec.options_mut().flags_mut(option).is_will = false;
                }
                let f = codec.options_mut().flags_mut(option);
                f.sent_will = false;
                f.sent_wont = false;
            }
            NegotiationKind::Dont => {
                if codec.options().flags(option).is_will {
                    codec.send_option(NegotiationKind::Wont, option, net_out);
                }
                let f = codec.options_mut().flags_mut(option);
                f.is_will = false;
                f.sent_will = false;
                f.sent_wont = false;
            }
            NegotiationKind::Wont => {
                if codec.options().flags(option).is_do {
                    codec.send_option(NegotiationKind::Dont, option, net_out);
                }
                let f = codec.options_mut().flags_mut(option);
                f.is_do = false;
                f.sent_do = false;
                f.sent_dont = false;
            }
        }
    }

    fn handle_cpc(
        &self,
        payload: &[u8],
        cpc: &mut CpcSessionState,
        mut device: Option<&mut dyn SerialPort>,
        codec: &mut TelnetCodec,
        net_out: &mut BytesMut,
    ) -> SessionResult<()> {
        let Some(command) = CpcCommand::parse(payload) else {
            tracing::debug!("malformed COM-PORT subnegotiation, ignoring");
            return Ok(());
        };

        let reply = match command {
            CpcCommand::SignatureQuery => Some(CpcReply::Signature(self.signature.clone())),
            CpcCommand::SignatureReport(sig) => {
                tracing::info!(signature = %String::from_utf8_lossy(&sig), "client signature received");
                None
            }
            CpcCommand::BaudRate(rate) => device.as_deref_mut().map(|dev| {
                if rate != 0 {
                    if let Err(err) = dev.set_baud_rate(rate) {
                        tracing::warn!(%err, rate, "failed to set baud rate");
                    }
                }
                CpcReply::BaudRate(dev.baud_rate())
            }),
            CpcCommand::DataSize(bits) => device.as_deref_mut().map(|dev| {
                if bits != 0 {
                    if let Err(err) = dev.set_data_size(bits) {
                        tracing::warn!(%err, bits, "failed to set data size");
                    }
                }
                CpcReply::DataSize(dev.data_size())
            }),
            CpcCommand::Parity(code) => device.as_deref_mut().map(|dev| {
                if code != 0 {
                    if !matches!(code, 1..=5) {
                        tracing::warn!(code, "unsupported parity code, using none");
                    }
                    if let Err(err) = dev.set_parity(Parity::from_code(code)) {
                        tracing::warn!(%err, code, "failed to set parity");
                    }
                }
                CpcReply::Parity(dev.parity().code())
            }),
            CpcCommand::StopSize(code) => device.as_deref_mut().map(|dev| {
                if code != 0 {
                    let (stop, downgraded) = StopSize::from_code(code);
                    if downgraded {
                        tracing::warn!("1.5 stop bits requested, downgrading to 1");
                    }
                    if let Err(err) = dev.set_stop_size(stop) {
                        tracing::warn!(%err, code, "failed to set stop size");
                    }
                }
                CpcReply::StopSize(dev.stop_size().code())
            }),
            CpcCommand::Control(code) => device.as_deref_mut().map(|dev| {
                let result = match code {
                    0 | 4 | 7 | 10 | 13 => Ok(()),
                    1 => dev.set_flow_control(FlowControl::None),
                    2 => dev.set_flow_control(FlowControl::XonXoff),
                    3 => dev.set_flow_control(FlowControl::RtsCts),
                    5 => {
                        cpc.break_signaled = true;
                        dev.set_break(true)
                    }
                    6 => {
                        cpc.break_signaled = false;
                        dev.set_break(false)
                    }
                    8 => dev.set_dtr(true),
                    9 => dev.set_dtr(false),
                    11 => dev.set_rts(true),
                    12 => dev.set_rts(false),
                    14..=16 => {
                        tracing::warn!(code, "inbound flow control variant not supported, ignoring");
                        Ok(())
                    }
                    other => {
                        tracing::debug!(other, "unknown SET_CONTROL selector");
                        Ok(())
                    }
                };
                if let Err(err) = result {
                    tracing::warn!(%err, code, "SET_CONTROL request failed");
                }
                let reply_code = if self.cisco_compat && (13..=16).contains(&code) {
                    0
                } else {
                    control_reply_code(&*dev, code)
                };
                CpcReply::Control(reply_code)
            }),
            CpcCommand::FlowSuspend => {
                cpc.input_flow = false;
                None
            }
            CpcCommand::FlowResume => {
                cpc.input_flow = true;
                None
            }
            CpcCommand::LineStateMask(mask) => {
                cpc.line_state_mask = mask & 0x10;
                Some(CpcReply::LineStateMask(cpc.line_state_mask))
            }
            CpcCommand::ModemStateMask(mask) => {
                cpc.modem_state_mask = mask;
                Some(CpcReply::ModemStateMask(mask))
            }
            CpcCommand::PurgeData(selector) => {
                if let Some(dev) = device.as_deref_mut() {
                    match FlushSelector::from_code(selector) {
                        Some(sel) => {
                            if let Err(err) = dev.flush(sel) {
                                tracing::warn!(%err, selector, "purge failed");
                            }
                        }
                        None => tracing::debug!(selector, "unknown PURGE_DATA selector"),
                    }
                }
                Some(CpcReply::PurgeData(selector))
            }
            CpcCommand::Unknown(code) => {
                tracing::debug!(code, "unknown COM-PORT subcommand, ignoring");
                None
            }
        };

        if let Some(reply) = reply {
            let mut scratch = BytesMut::new();
            reply.encode(&mut scratch);
            codec.send_cpc_reply(&scratch, net_out);
        }
        Ok(())
    }
}

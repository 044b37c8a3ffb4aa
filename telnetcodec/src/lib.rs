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

//! # Telnet / RFC 2217 COM-PORT-OPTION codec
//!
//! A stateful, byte-oriented [`tokio_util::codec::Decoder`]/[`Encoder`] pair
//! implementing RFC 854 (Telnet) framing and the RFC 2217 "Telnet Com Port
//! Control Option" subnegotiation vocabulary.
//!
//! [`TelnetCodec`] is the only entry point applications need: it decodes an
//! inbound byte stream into [`TelnetFrame`]s (application data, negotiation
//! verbs, and COM-PORT subnegotiations) and encodes outbound application
//! bytes and frames back into the wire format, including the CR-NUL and
//! IAC-doubling rules RFC 854 requires when TRANSMIT-BINARY is not in
//! effect. [`cpc::CpcCommand`]/[`cpc::CpcReply`] further parse and encode the
//! COM-PORT subnegotiation payload itself.
//!
//! This crate does not open sockets or serial ports; it only turns bytes
//! into frames and back.

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]

mod codec;
pub mod consts;
pub mod cpc;
mod frame;
mod options;
mod result;

pub use self::codec::TelnetCodec;
pub use self::cpc::{CpcCommand, CpcReply};
pub use self::frame::{NegotiationKind, TelnetFrame};
pub use self::options::{OptionFlags, TelnetOption, TelnetOptionTable};
pub use self::result::{CodecError, CodecResult};

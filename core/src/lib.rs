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

//! # sercd core: the RFC 2217 gateway's protocol and session logic
//!
//! This crate is everything between the wire and the serial device that
//! isn't the codec itself: session lifecycle, the option/CPC negotiation
//! policy, the fixed-order event loop, and the standalone/inetd dispatch
//! that owns it (spec.md 4, 6, 7).
//!
//! ```text
//! server::run_standalone / server::run_inetd
//!     ↓
//! eventloop::drive
//!     ↓
//! handler::GatewayHandler  +  session::Session
//! ```
//!
//! `sercd-telnetcodec` supplies the byte-level framing, `sercd-serial`
//! supplies the device. This crate owns neither; it only wires them
//! together under the readiness and ordering rules spec.md 4.6 specifies.

mod buffer;
mod config;
mod cpc;
mod error;
mod eventloop;
mod handler;
mod server;
mod session;
mod types;

pub use buffer::RingBuffer;
pub use config::{ListenMode, SercdConfig, DEFAULT_PORT};
pub use cpc::CpcSessionState;
pub use error::{SessionError, SessionFd, SessionResult};
pub use eventloop::drive;
pub use handler::GatewayHandler;
pub use server::{run_inetd, run_standalone};
pub use session::Session;
pub use types::SessionState;

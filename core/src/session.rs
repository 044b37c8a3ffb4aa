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

//! Per-client session record (spec.md 3: `SessionFds`): one of these exists
//! for the gateway's lifetime and is reset between clients.

use crate::buffer::RingBuffer;
use crate::cpc::CpcSessionState;
use crate::types::SessionState;
use sercd_serial::SerialPort;
use sercd_telnetcodec::TelnetCodec;

/// Everything the event loop needs for the currently (or not yet) connected
/// client. Reused across clients in standalone mode; freshly constructed
/// once in inetd mode.
pub struct Session {
    pub state: SessionState,
    pub codec: TelnetCodec,
    pub cpc: CpcSessionState,
    pub to_dev: RingBuffer,
    pub to_net: RingBuffer,
    pub device: Option<Box<dyn SerialPort>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            codec: TelnetCodec::new(),
            cpc: CpcSessionState::new(),
            to_dev: RingBuffer::default(),
            to_net: RingBuffer::default(),
            device: None,
        }
    }

    /// Re-initialize telnet state and buffers for a newly accepted client
    /// (spec.md 4.6, accept step).
    pub fn reset_for_new_client(&mut self) {
        self.codec = TelnetCodec::new();
        self.cpc.reset();
        self.to_dev.clear();
        self.to_net.clear();
        self.state = SessionState::ConnectedNoDevice;
    }

    /// Tear down after a fatal error or shutdown (spec.md 4.7, `Drop`).
    pub fn drop_client(&mut self) {
        self.device = None;
        self.to_dev.clear();
        self.to_net.clear();
        self.cpc.reset();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_idle_with_no_device() {
        let session = Session::new();
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.device.is_none());
    }

    #[test]
    fn reset_for_new_client_clears_buffers_and_cpc() {
        let mut session = Session::new();
        session.to_dev.push(b'x');
        session.cpc.cpc_enabled = true;
        session.reset_for_new_client();
        assert_eq!(session.state, SessionState::ConnectedNoDevice);
        assert!(session.to_dev.is_empty());
        assert!(!session.cpc.cpc_enabled);
    }

    #[test]
    fn drop_client_releases_the_device() {
        let mut session = Session::new();
        session.device = Some(Box::new(sercd_serial::MockSerialPort::new()));
        session.drop_client();
        assert!(session.device.is_none());
    }
}

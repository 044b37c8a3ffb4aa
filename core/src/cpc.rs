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

//! RFC 2217 COM-PORT session state (spec.md 3: `CpcSessionState`).

/// Per-session RFC 2217 bookkeeping, reset on every new client session.
#[derive(Debug, Clone)]
pub struct CpcSessionState {
    /// Flips true on the first successful WILL/DO negotiation of COM-PORT.
    pub cpc_enabled: bool,
    pub modem_state_mask: u8,
    /// Only bit 4 (break) is meaningful (spec.md open question 2).
    pub line_state_mask: u8,
    pub modem_state: u8,
    pub break_signaled: bool,
    /// True means device -> client flow is allowed.
    pub input_flow: bool,
}

impl Default for CpcSessionState {
    fn default() -> Self {
        Self {
            cpc_enabled: false,
            modem_state_mask: 0xFF,
            line_state_mask: 0x00,
            modem_state: 0,
            break_signaled: false,
            input_flow: true,
        }
    }
}

impl CpcSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let state = CpcSessionState::new();
        assert!(!state.cpc_enabled);
        assert_eq!(state.modem_state_mask, 0xFF);
        assert_eq!(state.line_state_mask, 0x00);
        assert!(state.input_flow);
        assert!(!state.break_signaled);
    }

    #[test]
    fn reset_restores_defaults_after_mutation() {
        let mut state = CpcSessionState::new();
        state.cpc_enabled = true;
        state.input_flow = false;
        state.modem_state = 0x90;
        state.reset();
        assert!(!state.cpc_enabled);
        assert!(state.input_flow);
        assert_eq!(state.modem_state, 0);
    }
}

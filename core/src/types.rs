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

//! Session lifecycle states (spec.md 4.7).

use std::fmt;

/// The gateway serves at most one client at a time; this is that client's
/// lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Only the listener exists (standalone mode); inetd mode skips this
    /// state and starts directly in `ConnectedNoDevice`.
    Idle,
    /// Client sockets are set but the serial device has not been opened
    /// yet.
    ConnectedNoDevice,
    /// Steady state: client sockets and device are both live.
    Opened,
    /// Tearing down after a fatal error or shutdown signal.
    Drop,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ConnectedNoDevice => "connected-no-device",
            Self::Opened => "opened",
            Self::Drop => "drop",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_match_the_variant() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::ConnectedNoDevice.to_string(), "connected-no-device");
        assert_eq!(SessionState::Opened.to_string(), "opened");
        assert_eq!(SessionState::Drop.to_string(), "drop");
    }
}

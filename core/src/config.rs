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

//! Gateway configuration (spec.md 6).
//!
//! `-l` turns on standalone listener mode; its absence means inetd mode,
//! where the client sockets are stdin/stdout handed to us by the
//! supervisor. `cli` parses argv into this type; `sercd-core` only ever
//! sees a [`SercdConfig`].

use std::path::PathBuf;
use std::time::Duration;

/// Default modem-state poll interval (spec.md 4.6).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default standalone listener port (spec.md 6).
pub const DEFAULT_PORT: u16 = 7000;

/// How the gateway obtains its client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenMode {
    /// Client sockets are stdin/stdout, handed to us already connected.
    Inetd,
    /// We own a TCP listener and accept at most one active session at a
    /// time.
    Standalone { bind_addr: String, port: u16 },
}

/// Full configuration for one gateway run, assembled by `cli` from argv and
/// handed to `sercd-core` as an opaque value.
#[derive(Debug, Clone)]
pub struct SercdConfig {
    pub mode: ListenMode,
    pub device_path: PathBuf,
    pub lockfile_path: PathBuf,
    /// Syslog severity 0..7 (spec.md 6).
    pub loglevel: u8,
    /// `None` disables modem-state polling entirely (`poll-ms` of 0).
    pub poll_interval: Option<Duration>,
    /// `-i`: reply 0 to inbound SET_CONTROL queries (spec.md 4.5/9).
    pub cisco_compat: bool,
    /// `-e`: send logs to stderr instead of syslog.
    pub log_to_stderr: bool,
}

impl SercdConfig {
    /// Construct a config for inetd mode with defaults for everything but
    /// the positional arguments.
    pub fn new(device_path: impl Into<PathBuf>, lockfile_path: impl Into<PathBuf>, loglevel: u8) -> Self {
        Self {
            mode: ListenMode::Inetd,
            device_path: device_path.into(),
            lockfile_path: lockfile_path.into(),
            loglevel,
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
            cisco_compat: false,
            log_to_stderr: false,
        }
    }

    /// Switch to standalone listener mode on `bind_addr:port`.
    pub fn with_standalone(mut self, bind_addr: impl Into<String>, port: u16) -> Self {
        self.mode = ListenMode::Standalone {
            bind_addr: bind_addr.into(),
            port,
        };
        self
    }

    /// Set the modem-state poll interval in milliseconds; `0` disables
    /// polling.
    pub fn with_poll_interval_ms(mut self, poll_ms: u64) -> Self {
        self.poll_interval = if poll_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(poll_ms))
        };
        self
    }

    pub fn with_cisco_compat(mut self, enabled: bool) -> Self {
        self.cisco_compat = enabled;
        self
    }

    pub fn with_log_to_stderr(mut self, enabled: bool) -> Self {
        self.log_to_stderr = enabled;
        self
    }

    pub fn is_standalone(&self) -> bool {
        matches!(self.mode, ListenMode::Standalone { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_inetd_with_100ms_polling() {
        let cfg = SercdConfig::new("/dev/ttyS0", "/var/lock/LCK..ttyS0", 5);
        assert_eq!(cfg.mode, ListenMode::Inetd);
        assert_eq!(cfg.poll_interval, Some(DEFAULT_POLL_INTERVAL));
        assert!(!cfg.is_standalone());
    }

    #[test]
    fn zero_poll_ms_disables_polling() {
        let cfg = SercdConfig::new("/dev/ttyS0", "/var/lock/LCK..ttyS0", 5).with_poll_interval_ms(0);
        assert_eq!(cfg.poll_interval, None);
    }

    #[test]
    fn standalone_mode_carries_bind_and_port() {
        let cfg = SercdConfig::new("/dev/ttyS0", "/var/lock/LCK..ttyS0", 5)
            .with_standalone("", DEFAULT_PORT);
        assert!(cfg.is_standalone());
    }
}

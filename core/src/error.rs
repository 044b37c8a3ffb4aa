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

//! Error handling policy (spec.md 7): transient EWOULDBLOCK-equivalents
//! are not errors and never reach this type; everything here is either a
//! fatal per-session condition (drop the session) or a setup failure
//! (refuse the session).

use thiserror::Error;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Which file descriptor a fatal I/O error was observed on, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFd {
    Client,
    Device,
    Listener,
}

impl std::fmt::Display for SessionFd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Client => "client",
            Self::Device => "device",
            Self::Listener => "listener",
        };
        f.write_str(name)
    }
}

/// Errors a session can encounter (spec.md 7).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Telnet/CPC framing error from the codec layer; logged at DEBUG and
    /// does not by itself drop the session.
    #[error("protocol error: {0}")]
    Protocol(#[from] sercd_telnetcodec::CodecError),

    /// Serial port open/lock/termios failure.
    #[error("serial error: {0}")]
    Serial(#[from] sercd_serial::SerialError),

    /// Read/write on a session fd returned an error other than
    /// EWOULDBLOCK, or 0 bytes (EOF). Fatal: transitions the session to
    /// `Drop` (spec.md 4.7).
    #[error("fatal I/O on {fd}: {source}")]
    FatalIo {
        fd: SessionFd,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// Whether this error should transition the session straight to
    /// `Drop` rather than just being logged and ignored.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::FatalIo { .. } | SessionError::Serial(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_io_is_fatal() {
        let err = SessionError::FatalIo {
            fd: SessionFd::Client,
            source: std::io::Error::from(std::io::ErrorKind::ConnectionReset),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn protocol_errors_are_not_fatal() {
        let err = SessionError::Protocol(sercd_telnetcodec::CodecError::MalformedSubnegotiation { option: 44 });
        assert!(!err.is_fatal());
    }
}

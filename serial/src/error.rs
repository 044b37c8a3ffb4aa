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

/// Errors from opening, locking, or driving a serial port.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lock file {path} is held by live process {pid}")]
    Locked { path: String, pid: i32 },

    #[error("lock file {path} is malformed")]
    MalformedLockFile { path: String },

    #[error("termios error: {0}")]
    Termios(#[from] nix::Error),
}

pub type SerialResult<T> = Result<T, SerialError>;

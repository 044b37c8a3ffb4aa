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

//! HDB (Honey-Danber UUCP) ASCII PID lockfile (spec.md 6).
//!
//! The format is an 11-byte decimal PID, space-padded, newline-terminated
//! (`"%10d\n"`). On a collision this module re-reads the existing lock,
//! probes the holder with `kill(pid, 0)`, and removes the file if the
//! holder is no longer alive, ported from `examples/original_source/unix.c`.

use crate::error::{SerialError, SerialResult};
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

fn format_lock_body(pid: i32) -> String {
    format!("{pid:>10}\n")
}

fn parse_lock_body(body: &str) -> Option<i32> {
    body.trim().parse::<i32>().ok()
}

fn holder_is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Acquire the lock at `path` for the current process, recovering from a
/// stale lock left by a dead process.
pub fn acquire_lock(path: &Path) -> SerialResult<()> {
    let my_pid = std::process::id() as i32;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o644)
            .open(path)
        {
            Ok(mut file) => {
                file.write_all(format_lock_body(my_pid).as_bytes())
                    .map_err(|source| SerialError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let body = fs::read_to_string(path).map_err(|source| SerialError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let held_by = parse_lock_body(&body).ok_or_else(|| SerialError::MalformedLockFile {
                    path: path.display().to_string(),
                })?;
                if holder_is_alive(held_by) {
                    return Err(SerialError::Locked {
                        path: path.display().to_string(),
                        pid: held_by,
                    });
                }
                tracing::warn!(pid = held_by, path = %path.display(), "removing stale lock file");
                let _ = fs::remove_file(path);
                // Loop and retry the create_new race.
            }
            Err(source) => {
                return Err(SerialError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        }
    }
}

/// Release a lock previously acquired by this process.
pub fn release_lock(path: &Path) -> SerialResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SerialError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches_hdb_layout() {
        assert_eq!(format_lock_body(42), "        42\n");
        assert_eq!(format_lock_body(42).len(), 11);
    }

    #[test]
    fn acquire_then_release_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LCK..ttyS0");
        acquire_lock(&path).unwrap();
        assert_eq!(
            parse_lock_body(&fs::read_to_string(&path).unwrap()),
            Some(std::process::id() as i32)
        );
        release_lock(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn acquire_fails_against_a_live_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LCK..ttyS0");
        fs::write(&path, format_lock_body(std::process::id() as i32)).unwrap();
        let err = acquire_lock(&path).unwrap_err();
        assert!(matches!(err, SerialError::Locked { .. }));
    }

    #[test]
    fn acquire_recovers_a_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LCK..ttyS0");
        // PID 1 is always alive (init); use an implausible high PID that is
        // very unlikely to be running, to simulate a stale holder.
        fs::write(&path, format_lock_body(i32::MAX - 1)).unwrap();
        acquire_lock(&path).unwrap();
        release_lock(&path).unwrap();
    }
}

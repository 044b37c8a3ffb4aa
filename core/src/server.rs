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

//! Top-level dispatch between standalone listener mode and inetd mode
//! (spec.md 4.7, 6).
//!
//! Both modes end up driving the same [`crate::eventloop::drive`] over the
//! same [`Session`]; this module only owns the part that's specific to how
//! the client socket was obtained.

use crate::config::{ListenMode, SercdConfig};
use crate::error::SessionResult;
use crate::eventloop::drive;
use crate::handler::GatewayHandler;
use crate::session::Session;
use crate::types::SessionState;
use sercd_serial::{SerialPort, UnixSerialPort};
use std::os::fd::FromRawFd;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

fn device_opener(config: &SercdConfig) -> impl FnMut() -> SessionResult<Box<dyn SerialPort>> + '_ {
    move || {
        let port = UnixSerialPort::open(&config.device_path, &config.lockfile_path)?;
        Ok(Box::new(port) as Box<dyn SerialPort>)
    }
}

/// Runs the gateway in inetd mode: fd 0 is the already-connected client
/// socket, handed to us by the supervisor. `tokio::io::stdin`/`stdout` only
/// give unidirectional pipes, so fd 0 is instead wrapped as the socket it
/// actually is. Exits (returns) once the single session ends, whether
/// cleanly or on error (spec.md 4.7).
pub async fn run_inetd(config: &SercdConfig, shutdown: CancellationToken) -> SessionResult<()> {
    let std_stream = unsafe { std::net::TcpStream::from_raw_fd(0) };
    std_stream
        .set_nonblocking(true)
        .map_err(|source| crate::error::SessionError::FatalIo {
            fd: crate::error::SessionFd::Client,
            source,
        })?;
    let mut client = TcpStream::from_std(std_stream).map_err(|source| crate::error::SessionError::FatalIo {
        fd: crate::error::SessionFd::Client,
        source,
    })?;
    let handler = GatewayHandler::new(&config.device_path.to_string_lossy(), config.cisco_compat);
    let mut session = Session::new();
    session.reset_for_new_client();

    let mut net_out = bytes::BytesMut::new();
    session.codec.send_initial_negotiations(&mut net_out);
    for b in net_out.iter().copied() {
        session.to_net.push(b);
    }

    let mut opener = device_opener(config);
    drive(
        &mut client,
        &mut session,
        &handler,
        &mut opener,
        None,
        config.poll_interval,
        &shutdown,
    )
    .await
}

/// Runs the gateway in standalone mode: owns a [`TcpListener`] and serves
/// clients one at a time, returning to `Idle` and accepting the next one
/// after each session drops (spec.md 4.7). Returns once `shutdown` fires.
pub async fn run_standalone(config: &SercdConfig, shutdown: CancellationToken) -> SessionResult<()> {
    let ListenMode::Standalone { bind_addr, port } = &config.mode else {
        panic!("run_standalone called with a non-standalone config");
    };
    let listener = TcpListener::bind((bind_addr.as_str(), *port))
        .await
        .map_err(|source| crate::error::SessionError::FatalIo {
            fd: crate::error::SessionFd::Listener,
            source,
        })?;
    tracing::info!(addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(), "listening");

    let handler = GatewayHandler::new(&config.device_path.to_string_lossy(), config.cisco_compat);
    let mut session = Session::new();

    loop {
        session.state = SessionState::Idle;
        let (mut stream, peer) = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::debug!("shutdown requested while idle");
                return Ok(());
            }
            result = listener.accept() => match result {
                Ok(accepted) => accepted,
                Err(source) => {
                    tracing::warn!(%source, "accept failed");
                    continue;
                }
            },
        };
        tracing::info!(%peer, "accepted connection");

        session.reset_for_new_client();
        let mut net_out = bytes::BytesMut::new();
        session.codec.send_initial_negotiations(&mut net_out);
        for b in net_out.iter().copied() {
            session.to_net.push(b);
        }

        let mut opener = device_opener(config);
        if let Err(err) = drive(
            &mut stream,
            &mut session,
            &handler,
            &mut opener,
            Some(&listener),
            config.poll_interval,
            &shutdown,
        )
        .await
        {
            tracing::warn!(%err, "session ended with an error, returning to idle");
        }
        session.drop_client();

        if shutdown.is_cancelled() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_config_carries_the_bind_tuple() {
        let cfg = SercdConfig::new("/dev/ttyS0", "/tmp/LCK..ttyS0", 5).with_standalone("127.0.0.1", 7000);
        match cfg.mode {
            ListenMode::Standalone { bind_addr, port } => {
                assert_eq!(bind_addr, "127.0.0.1");
                assert_eq!(port, 7000);
            }
            ListenMode::Inetd => panic!("expected standalone mode"),
        }
    }
}

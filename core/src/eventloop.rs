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

//! The cooperative, single-session event loop (spec.md 4.6).
//!
//! One call to [`drive`] owns a [`Session`] for the lifetime of a single
//! client: it lazily opens the serial device, then drains device-in,
//! device-out and net-out unconditionally on every wakeup (they're backed
//! by local buffer state, never block), and arbitrates net-in against the
//! listener's accept queue and the modem-state poll tick with a single
//! `tokio::select!`. `biased` keeps that arbitration in the fixed order
//! spec.md 4.6 lays out: device-in, device-out, net-out, net-in, accept.
//!
//! The real serial fd has no portable async readiness primitive the way a
//! `TcpStream` does, so device I/O is attempted once per loop wakeup rather
//! than awaited on its own readiness; wakeups come from client activity or
//! the poll tick, which bounds device latency to the poll interval.

use crate::error::{SessionError, SessionFd, SessionResult};
use crate::handler::GatewayHandler;
use crate::session::Session;
use crate::types::SessionState;
use bytes::BytesMut;
use sercd_serial::SerialPort;
use sercd_telnetcodec::consts::{ESC_REDIRECT_CHAR_DEV_MAX, ESC_REDIRECT_CHAR_SOCK_MAX, ESC_WRITE_CHAR_MAX};
use sercd_telnetcodec::{CpcReply, TelnetFrame};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;

/// Bytes read from the client per wakeup; well above any realistic MTU,
/// just a staging area for the decoder.
const STAGING_SIZE: usize = 4096;

/// A freshly-accepted connection, offered to [`drive`] but not adopted
/// because a session is already active (spec.md 4.6, accept step).
async fn maybe_accept(listener: Option<&TcpListener>) -> std::io::Result<std::net::SocketAddr> {
    match listener {
        Some(listener) => listener.accept().await.map(|(stream, addr)| {
            drop(stream);
            addr
        }),
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drains `session.device`'s inbound bytes into `to_net`, IAC-escaping as
/// it goes (spec.md 4.6 step 1).
fn device_in(session: &mut Session) -> SessionResult<()> {
    let Some(device) = session.device.as_deref_mut() else {
        return Ok(());
    };
    if !session.cpc.input_flow {
        return Ok(());
    }
    let mut scratch = [0u8; 512];
    loop {
        if !session.to_net.has_room(ESC_WRITE_CHAR_MAX) {
            break;
        }
        let n = device.read(&mut scratch).map_err(SessionError::from)?;
        if n == 0 {
            break;
        }
        for &byte in &scratch[..n] {
            if !session.to_net.has_room(ESC_WRITE_CHAR_MAX) {
                tracing::warn!("to_net ring buffer saturated, dropping device output");
                break;
            }
            let mut escaped = BytesMut::new();
            session.codec.write_app_byte(byte, &mut escaped);
            for b in escaped.iter().copied() {
                session.to_net.push(b);
            }
        }
    }
    Ok(())
}

/// Writes as much of `to_dev` as the device will accept (spec.md 4.6 step 2).
fn device_out(session: &mut Session) -> SessionResult<()> {
    let Some(device) = session.device.as_deref_mut() else {
        return Ok(());
    };
    loop {
        let chunk = session.to_dev.peek_contiguous();
        if chunk.is_empty() {
            break;
        }
        let n = device.write(chunk).map_err(SessionError::from)?;
        if n == 0 {
            break;
        }
        session.to_dev.advance_read(n);
    }
    Ok(())
}

/// Writes as much of `to_net` as the client socket will currently accept
/// (spec.md 4.6 step 3). A short write just means backpressure; the
/// remainder waits for the next wakeup.
async fn net_out<C: AsyncWrite + Unpin>(client: &mut C, session: &mut Session) -> SessionResult<()> {
    let chunk = session.to_net.peek_contiguous();
    if chunk.is_empty() {
        return Ok(());
    }
    match client.write(chunk).await {
        Ok(0) => Err(SessionError::FatalIo {
            fd: SessionFd::Client,
            source: std::io::Error::from(std::io::ErrorKind::WriteZero),
        }),
        Ok(n) => {
            session.to_net.advance_read(n);
            Ok(())
        }
        Err(source) => Err(SessionError::FatalIo {
            fd: SessionFd::Client,
            source,
        }),
    }
}

/// Decodes newly-read client bytes into frames and dispatches each one
/// through `handler` (spec.md 4.6 step 4).
fn net_in(session: &mut Session, handler: &GatewayHandler, raw: &[u8]) -> SessionResult<()> {
    let mut src = BytesMut::from(raw);
    let mut net_out_scratch = BytesMut::new();
    loop {
        let frame = session.codec.decode(&mut src)?;
        let Some(frame) = frame else { break };
        handle_one_frame(session, handler, frame, &mut net_out_scratch)?;
    }
    for b in net_out_scratch.iter().copied() {
        if !session.to_net.has_room(1) {
            tracing::warn!("to_net saturated, dropping reply byte");
            break;
        }
        session.to_net.push(b);
    }
    Ok(())
}

fn handle_one_frame(
    session: &mut Session,
    handler: &GatewayHandler,
    frame: TelnetFrame,
    net_out_scratch: &mut BytesMut,
) -> SessionResult<()> {
    let Session {
        codec,
        cpc,
        to_dev,
        device,
        ..
    } = session;
    handler.handle_frame(frame, codec, cpc, device.as_deref_mut(), to_dev, net_out_scratch)
}

/// Polls the device's modem-state bits and, if they changed under the
/// client's subscribed mask, sends an unsolicited `NOTIFY_MODEMSTATE`
/// (spec.md 4.5/6, glossary "modem state").
fn poll_modem_state(session: &mut Session) -> SessionResult<()> {
    if !session.cpc.cpc_enabled || !session.cpc.input_flow {
        return Ok(());
    }
    let Some(device) = session.device.as_deref_mut() else {
        return Ok(());
    };
    let state = device.modem_state().map_err(SessionError::from)?;
    session.cpc.modem_state = state;
    if session.cpc.modem_state_mask == 0 {
        return Ok(());
    }
    if state & session.cpc.modem_state_mask == 0 {
        return Ok(());
    }
    let reply = CpcReply::ModemState(state);
    let mut payload = BytesMut::new();
    reply.encode(&mut payload);
    let mut framed = BytesMut::new();
    session.codec.send_cpc_reply(&payload, &mut framed);
    for b in framed.iter().copied() {
        if !session.to_net.has_room(1) {
            break;
        }
        session.to_net.push(b);
    }
    Ok(())
}

/// How many client bytes may be read this wakeup without risking an
/// overflowing push into `to_dev` or `to_net` (spec.md 4.6 step 4:
/// `min(staging_size, to_net_room / EscRedirectChar_sock_max, to_dev_room /
/// EscRedirectChar_dev_max)`). Zero means net-in must not run at all this
/// wakeup.
fn max_client_read_len(session: &Session) -> usize {
    if session.device.is_none() {
        return 0;
    }
    let sock_budget = session.to_net.room() / ESC_REDIRECT_CHAR_SOCK_MAX;
    let dev_budget = session.to_dev.room() / ESC_REDIRECT_CHAR_DEV_MAX;
    STAGING_SIZE.min(sock_budget).min(dev_budget)
}

/// Opens the serial device on the session's first iteration that finds a
/// connected client without one (spec.md 4.7, `Connected(no device)`).
fn open_device_if_needed(
    session: &mut Session,
    open_device: &mut dyn FnMut() -> SessionResult<Box<dyn SerialPort>>,
) -> SessionResult<()> {
    if session.state != SessionState::ConnectedNoDevice {
        return Ok(());
    }
    match open_device() {
        Ok(device) => {
            session.device = Some(device);
            session.state = SessionState::Opened;
            tracing::info!("serial device opened");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Drives `session` through one client's lifetime: from the moment it's
/// reset for a new client (spec.md 4.6 accept step already applied by the
/// caller) until it lands in `Drop`.
///
/// `listener` is `Some` in standalone mode, so extra connection attempts
/// while this session is active are logged and refused rather than queued
/// (spec.md 4.7, at-most-one-active-session invariant); it is `None` in
/// inetd mode, where there is no listener to poll.
pub async fn drive<C>(
    client: &mut C,
    session: &mut Session,
    handler: &GatewayHandler,
    open_device: &mut dyn FnMut() -> SessionResult<Box<dyn SerialPort>>,
    listener: Option<&TcpListener>,
    poll_interval: Option<Duration>,
    shutdown: &CancellationToken,
) -> SessionResult<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut staging = vec![0u8; STAGING_SIZE];
    let mut interval = poll_interval.map(|period| {
        let mut it = tokio::time::interval(period);
        it.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        it
    });

    loop {
        if session.state == SessionState::Drop {
            return Ok(());
        }

        if let Err(err) = open_device_if_needed(session, open_device) {
            tracing::error!(%err, "failed to open serial device");
            if listener.is_none() {
                // Inetd mode: no daemon survives to retry, so tell the
                // client why before the process exits (spec.md 7).
                let _ = client.write_all(b"Device in use. Come back later.\r\n").await;
            }
            session.state = SessionState::Drop;
            return Err(err);
        }

        // Fixed drain order: device-in, device-out, net-out. None of these
        // can block (the device is non-blocking, net_out awaits only under
        // socket backpressure), so they run unconditionally every wakeup.
        if let Err(err) = device_in(session) {
            if err.is_fatal() {
                tracing::warn!(%err, "device read failed, dropping session");
                session.state = SessionState::Drop;
                continue;
            }
        }
        if let Err(err) = device_out(session) {
            if err.is_fatal() {
                tracing::warn!(%err, "device write failed, dropping session");
                session.state = SessionState::Drop;
                continue;
            }
        }
        if let Err(err) = net_out(client, session).await {
            tracing::info!(%err, "client write failed, dropping session");
            session.state = SessionState::Drop;
            continue;
        }

        let read_len = max_client_read_len(session);

        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                tracing::debug!("shutdown requested");
                session.state = SessionState::Drop;
            }

            result = client.read(&mut staging[..read_len]), if read_len > 0 => {
                match result {
                    Ok(0) => {
                        tracing::info!("client closed connection");
                        session.state = SessionState::Drop;
                    }
                    Ok(n) => {
                        if let Err(err) = net_in(session, handler, &staging[..n]) {
                            tracing::debug!(%err, "protocol error, ignoring frame");
                        }
                    }
                    Err(source) => {
                        tracing::info!(%source, "client read failed, dropping session");
                        session.state = SessionState::Drop;
                    }
                }
            }

            addr = maybe_accept(listener) => {
                match addr {
                    Ok(addr) => tracing::warn!(%addr, "refusing extra connection, session already active"),
                    Err(source) => tracing::debug!(%source, "accept error while refusing extras"),
                }
            }

            () = tick(&mut interval) => {
                if let Err(err) = poll_modem_state(session) {
                    tracing::warn!(%err, "modem-state poll failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_POLL_INTERVAL;
    use sercd_serial::MockSerialPort;
    use std::sync::{Arc, Mutex};

    fn open_mock(device: Arc<Mutex<Option<MockSerialPort>>>) -> impl FnMut() -> SessionResult<Box<dyn SerialPort>> {
        move || {
            let taken = device.lock().unwrap().take().expect("device already opened");
            Ok(Box::new(taken) as Box<dyn SerialPort>)
        }
    }

    #[tokio::test]
    async fn echoes_plain_data_bytes_from_client_to_device() {
        let (mut client, mut far_end) = tokio::io::duplex(4096);
        let mut mock = MockSerialPort::new();
        mock.push_inbound(b"");
        let outbound = mock.mirror_outbound();
        let device = Arc::new(Mutex::new(Some(mock)));
        let mut session = Session::new();
        session.reset_for_new_client();
        let handler = GatewayHandler::new("/dev/ttyS0", false);
        let shutdown = CancellationToken::new();

        far_end.write_all(b"hello").await.unwrap();
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown_clone.cancel();
        });

        let mut opener = open_mock(device);
        let _ = drive(&mut client, &mut session, &handler, &mut opener, None, Some(DEFAULT_POLL_INTERVAL), &shutdown).await;

        assert_eq!(session.state, SessionState::Drop);
        assert_eq!(outbound.lock().unwrap().as_slice(), b"hello");
    }
}

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

//! `sercd`: the RFC 2217 telnet-to-serial gateway daemon (spec.md 6).

mod syslog_layer;

use clap::Parser;
use sercd_core::SercdConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;

/// `sercd [-i] [-e] [-p port] [-l bind-addr] <loglevel> <device> <lockfile> [poll-ms]`
#[derive(Debug, Parser)]
#[command(author, version, about = "RFC 2217 telnet-to-serial gateway")]
struct Cli {
    /// Cisco IOS compatibility: reply 0 to SET_CONTROL flow-control queries.
    #[arg(short = 'i', long = "cisco-compat")]
    cisco_compat: bool,

    /// Log to stderr instead of syslog.
    #[arg(short = 'e', long = "stderr")]
    log_to_stderr: bool,

    /// Standalone listener port (only meaningful with `-l`).
    #[arg(short = 'p', long = "port", default_value_t = sercd_core::DEFAULT_PORT)]
    port: u16,

    /// Bind address; presence of this flag switches to standalone mode.
    /// An empty string binds to all interfaces.
    #[arg(short = 'l', long = "listen", value_name = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// Syslog severity 0 (emergency) through 7 (debug).
    #[arg(value_name = "LOGLEVEL")]
    loglevel: u8,

    /// Serial device to open, e.g. `/dev/ttyS0`.
    #[arg(value_name = "DEVICE")]
    device: PathBuf,

    /// HDB lockfile path, e.g. `/var/lock/LCK..ttyS0`.
    #[arg(value_name = "LOCKFILE")]
    lockfile: PathBuf,

    /// Modem-state poll interval in milliseconds; 0 disables polling.
    #[arg(value_name = "POLL_MS", default_value_t = 100)]
    poll_ms: u64,
}

/// Syslog severities map onto `tracing` levels; syslog has no TRACE
/// equivalent so 7 (debug) is the floor.
fn level_filter_for_severity(severity: u8) -> LevelFilter {
    match severity {
        0..=3 => LevelFilter::ERROR,
        4 => LevelFilter::WARN,
        5..=6 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

fn init_logging(cli: &Cli) {
    let filter = level_filter_for_severity(cli.loglevel);
    if cli.log_to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(filter)
            .init();
    } else {
        match syslog_layer::SyslogLayer::new("sercd") {
            Ok(layer) => {
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            Err(err) => {
                eprintln!("sercd: failed to open syslog, falling back to stderr: {err}");
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_max_level(filter)
                    .init();
            }
        }
    }
}

/// Spawns listeners for every signal spec.md 9 lists and cancels `token`
/// when any of them fires. Teardown runs on the async task that observes
/// the cancellation, never inside a signal handler (spec.md 4.6/9).
fn spawn_signal_watchers(token: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    for kind in [
        SignalKind::hangup(),
        SignalKind::quit(),
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::from_raw(libc_signum::SIGABRT),
        SignalKind::from_raw(libc_signum::SIGPIPE),
    ] {
        let token = token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    let _ = stream.recv().await;
                    tracing::info!("shutdown signal received");
                    token.cancel();
                });
            }
            Err(err) => tracing::warn!(%err, "failed to register signal handler"),
        }
    }
}

/// Raw signal numbers `tokio::signal::unix::SignalKind` doesn't have a
/// named constructor for.
mod libc_signum {
    pub const SIGABRT: i32 = 6;
    pub const SIGPIPE: i32 = 13;
}

fn build_config(cli: &Cli) -> SercdConfig {
    let mut config = SercdConfig::new(cli.device.clone(), cli.lockfile.clone(), cli.loglevel)
        .with_cisco_compat(cli.cisco_compat)
        .with_log_to_stderr(cli.log_to_stderr)
        .with_poll_interval_ms(cli.poll_ms);
    if let Some(bind_addr) = &cli.bind_addr {
        config = config.with_standalone(bind_addr.clone(), cli.port);
    }
    config
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help/--version are success, not "bad CLI" (spec.md 7).
            // clap::Error::exit() would otherwise use its own exit code (2)
            // for a genuine usage error; spec.md mandates 1.
            use clap::error::ErrorKind;
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };
    init_logging(&cli);

    let config = build_config(&cli);
    let shutdown = CancellationToken::new();
    spawn_signal_watchers(shutdown.clone());

    let result = if config.is_standalone() {
        sercd_core::run_standalone(&config, shutdown).await
    } else {
        sercd_core::run_inetd(&config, shutdown).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "sercd exiting on error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_minimal_positional_form() {
        let cli = Cli::try_parse_from(["sercd", "5", "/dev/ttyS0", "/var/lock/LCK..ttyS0"]).unwrap();
        assert_eq!(cli.loglevel, 5);
        assert_eq!(cli.device, PathBuf::from("/dev/ttyS0"));
        assert_eq!(cli.poll_ms, 100);
        assert!(cli.bind_addr.is_none());
    }

    #[test]
    fn parses_flags_and_standalone_options() {
        let cli = Cli::try_parse_from([
            "sercd", "-i", "-e", "-p", "8000", "-l", "0.0.0.0", "3", "/dev/ttyUSB0", "/tmp/LCK..ttyUSB0", "0",
        ])
        .unwrap();
        assert!(cli.cisco_compat);
        assert!(cli.log_to_stderr);
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.bind_addr.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.poll_ms, 0);
    }

    #[test]
    fn rejects_missing_required_positionals() {
        assert!(Cli::try_parse_from(["sercd", "5", "/dev/ttyS0"]).is_err());
    }

    #[test]
    fn severity_mapping_matches_spec_boundaries() {
        assert_eq!(level_filter_for_severity(0), LevelFilter::ERROR);
        assert_eq!(level_filter_for_severity(4), LevelFilter::WARN);
        assert_eq!(level_filter_for_severity(6), LevelFilter::INFO);
        assert_eq!(level_filter_for_severity(7), LevelFilter::DEBUG);
    }

    #[test]
    fn build_config_enables_standalone_only_when_l_is_given() {
        let cli = Cli::try_parse_from(["sercd", "5", "/dev/ttyS0", "/var/lock/LCK..ttyS0"]).unwrap();
        assert!(!build_config(&cli).is_standalone());

        let cli = Cli::try_parse_from(["sercd", "-l", "", "5", "/dev/ttyS0", "/var/lock/LCK..ttyS0"]).unwrap();
        assert!(build_config(&cli).is_standalone());
    }
}

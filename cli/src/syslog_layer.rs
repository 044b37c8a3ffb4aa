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

//! Bridges `tracing` events to syslog (spec.md 6/7: the default log sink,
//! `-e` switches to plain stderr instead).

use std::sync::Mutex;
use syslog::{Formatter3164, Logger, LoggerBackend};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// One event's message, assembled from its fields (we only care about the
/// `message` field; structured fields are folded into the same line).
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            self.message.push_str(&format!("{value:?}"));
        } else {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            self.message.push_str(&format!("{}={value:?}", field.name()));
        }
    }
}

/// A `tracing_subscriber::Layer` that writes every event to syslog at the
/// severity its `tracing::Level` maps to.
pub struct SyslogLayer {
    logger: Mutex<Logger<LoggerBackend, Formatter3164>>,
}

impl SyslogLayer {
    pub fn new(process: impl Into<String>) -> Result<Self, syslog::Error> {
        let formatter = Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process: process.into(),
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter)?;
        Ok(Self {
            logger: Mutex::new(logger),
        })
    }
}

impl<S: Subscriber> Layer<S> for SyslogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let mut logger = self.logger.lock().unwrap_or_else(|poison| poison.into_inner());
        let result = match *event.metadata().level() {
            Level::ERROR => logger.err(&visitor.message),
            Level::WARN => logger.warning(&visitor.message),
            Level::INFO => logger.info(&visitor.message),
            Level::DEBUG | Level::TRACE => logger.debug(&visitor.message),
        };
        if let Err(err) = result {
            eprintln!("sercd: syslog write failed: {err}");
        }
    }
}

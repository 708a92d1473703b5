//! Console logging for the emulator and its tests.
//!
//! Filters use the env_logger syntax and are read from `A8_LOG`, e.g.
//! `A8_LOG=debug,cpu_state=trace`. Records print as a colored one letter level tag followed by
//! the message.
//!
//! Instruction traces (`cpu_state=trace`) are far too many to print. They are held back in a
//! short ring and only printed, oldest first, right before the next record of a higher level.
use std::sync::Mutex;
use std::sync::Once;

use colored::*;
use env_logger::Logger;
use log::Level;
use log::Log;
use log::Metadata;
use log::Record;

use crate::common::util::RingBuffer;

pub const LOG_ENV_VAR: &str = "A8_LOG";

const HELD_TRACE_LINES: usize = 20;

static INSTALLED: Once = Once::new();

type TraceRing = RingBuffer<String, HELD_TRACE_LINES>;

struct A8Logger {
    filter: Logger,
    held_traces: Mutex<TraceRing>,
}

fn format_record(level: Level, message: &str) -> String {
    match level {
        Level::Error => format!("{} {}", "E".red().bold(), message.red()),
        Level::Warn => format!("{} {}", "W".yellow().bold(), message.yellow()),
        Level::Info => format!("{} {}", "I".blue().bold(), message),
        Level::Debug => format!("{} {}", "D".blue(), message),
        Level::Trace => message.dimmed().to_string(),
    }
}

/// Empties the held traces into the lines to print. A full ring means older lines were lost.
fn release_traces(held: &mut TraceRing) -> Vec<String> {
    let mut lines = Vec::with_capacity(held.len() + 1);
    if held.len() == held.capacity() {
        lines.push("...".dimmed().to_string());
    }
    lines.extend(held.drain(usize::MAX));
    lines
}

impl Log for A8Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = format_record(record.level(), &record.args().to_string());
        let mut held = match self.held_traces.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if record.level() == Level::Trace {
            held.push(line);
            return;
        }
        for trace in release_traces(&mut held) {
            println!("{}", trace);
        }
        println!("{}", line);
    }

    fn flush(&self) {}
}

/// Installs the logger once per process. `A8_LOG` overrides `default_filter`.
fn install(default_filter: &str) {
    INSTALLED.call_once(|| {
        let spec = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| default_filter.to_string());
        let filter = env_logger::builder().parse_filters(&spec).build();
        log::set_max_level(filter.filter());
        // A host application may have installed its own logger first.
        let _ = log::set_boxed_logger(Box::new(A8Logger {
            filter,
            held_traces: Mutex::new(TraceRing::default()),
        }));
    });
}

/// Logging for host binaries: errors only unless `A8_LOG` says otherwise.
pub fn init() {
    install("error");
}

/// Logging for tests. `verbose` adds info records and instruction traces.
pub fn test_init(verbose: bool) {
    install(if verbose {
        "info,cpu_state=trace"
    } else {
        "warn"
    });
}

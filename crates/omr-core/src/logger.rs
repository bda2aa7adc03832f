//! Stderr logger for the grading tools.
//!
//! Lines look like `[  0.125s  INFO omr_grid] message`. Install once with
//! [`init_with_level`]; later calls keep the first configuration.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

static STARTED: OnceLock<Instant> = OnceLock::new();
static SHEET_LOGGER: SheetLogger = SheetLogger;

/// Filtering is left to `log::max_level`, set once at install time.
struct SheetLogger;

fn format_line(elapsed: f64, level: Level, target: &str, args: &Arguments<'_>) -> String {
    let krate = target.split("::").next().unwrap_or(target);
    format!("[{elapsed:7.3}s {level:>5} {krate}] {args}")
}

impl Log for SheetLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = STARTED.get().map_or(0.0, |t| t.elapsed().as_secs_f64());
        let line = format_line(elapsed, record.level(), record.target(), record.args());
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger with `level` as the maximum verbosity.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if STARTED.set(Instant::now()).is_err() {
        // Already installed.
        return Ok(());
    }
    log::set_logger(&SHEET_LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber honoring `RUST_LOG` (default `info`).
///
/// Span close events are emitted so instrumented stages report timings.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let installed = match json {
        true => subscriber.json().flatten_event(true).finish().try_init(),
        false => subscriber
            .with_timer(fmt::time::Uptime::default())
            .compact()
            .finish()
            .try_init(),
    };
    if installed.is_err() {
        log::debug!("tracing subscriber already installed");
    }
}

//! Stderr logging for the scanning pipeline.
//!
//! Records are filtered per target with `RUST_LOG`-style directives
//! (`"warn,omr_anchor=debug"`), so one noisy stage can be opened up without
//! flooding the per-frame output of the others. Lines look like
//! `[   1.234s DEBUG omr_anchor::detector] message`.
//!
//! With the `tracing` feature, [`init_tracing`] installs a
//! `tracing-subscriber` formatter instead and bridges `log` records into it.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Per-target level filter.
///
/// The longest matching target prefix wins; targets that match no directive
/// use the default level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    default: LevelFilter,
    targets: Vec<(String, LevelFilter)>,
}

impl LogFilter {
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            targets: Vec::new(),
        }
    }

    pub fn with_target(mut self, prefix: impl Into<String>, level: LevelFilter) -> Self {
        let prefix = prefix.into();
        self.targets.retain(|(p, _)| *p != prefix);
        self.targets.push((prefix, level));
        self
    }

    /// Parse comma-separated directives: a bare level sets the default,
    /// `target=level` sets an override. Malformed directives are skipped.
    pub fn parse(directives: &str) -> Self {
        directives
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .fold(Self::new(LevelFilter::Info), |filter, directive| {
                match directive.split_once('=') {
                    Some((target, level)) => match LevelFilter::from_str(level.trim()) {
                        Ok(level) => filter.with_target(target.trim(), level),
                        Err(_) => filter,
                    },
                    None => match LevelFilter::from_str(directive) {
                        Ok(level) => Self {
                            default: level,
                            ..filter
                        },
                        Err(_) => filter,
                    },
                }
            })
    }

    /// Level in force for `target`.
    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |(_, level)| *level)
    }

    /// Most verbose level any target can reach.
    pub fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, Ord::max)
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

/// `omr` matches `omr` and `omr::session`, but not `omr_anchor`.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

struct ScanLogger {
    filter: LogFilter,
    started: Instant,
}

impl Log for ScanLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{elapsed:8.3}s {:>5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<ScanLogger> = OnceLock::new();

/// Install the stderr logger with per-target filtering.
///
/// Only the first call installs; later calls keep the first filter.
pub fn init_with_filter(filter: LogFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let max = filter.max_level();
    let logger = LOGGER.get_or_init(|| ScanLogger {
        filter,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(max);
    Ok(())
}

/// Install the stderr logger with one level for every target.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_with_filter(LogFilter::new(level))
}

/// Install a `tracing-subscriber` formatter filtered by `RUST_LOG`, falling
/// back to `default_directives`, and forward `log` records into it.
///
/// Span close events carry their timings, so the per-stage spans of a frame
/// show up with durations.
#[cfg(feature = "tracing")]
pub fn init_tracing(
    json: bool,
    default_directives: &str,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    if tracing_log::LogTracer::init().is_err() {
        log::warn!("a log backend is already installed; log records will not reach tracing");
    }
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())
    } else {
        tracing::subscriber::set_global_default(
            builder.with_timer(fmt::time::Uptime::default()).finish(),
        )
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ConversionError, ConversionResult};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (caller mistake, e.g. a bad row index).
    Warning,
    /// Error-level event (operation failed on the data).
    Error,
    /// Critical error (I/O failures reading or writing files).
    Critical,
}

/// Which operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOperation {
    /// Whole-file conversion.
    ConvertAll,
    /// Single-row conversion.
    ConvertRow,
    /// Saving a table as JSON.
    SaveJson,
    /// Chunked conversion to one or more JSON artifacts.
    ConvertLarge,
    /// File inspection.
    Inspect,
}

/// Context about a conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Source path (or output path for [`ConversionOperation::SaveJson`]).
    pub path: PathBuf,
    /// Operation that produced the event.
    pub operation: ConversionOperation,
}

/// Minimal stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionStats {
    /// Number of rows converted, written, or (for inspection) estimated.
    pub rows: usize,
}

/// Observer interface for conversion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ConversionObserver: Send + Sync {
    /// Called when an operation succeeds.
    fn on_success(&self, _ctx: &ConversionContext, _stats: ConversionStats) {}

    /// Called when an operation fails.
    fn on_failure(&self, _ctx: &ConversionContext, _severity: ConversionSeverity, _error: &ConversionError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to several observers.
///
/// Observers added with [`CompositeObserver::route`] only see events of one operation; the rest
/// see everything.
#[derive(Default)]
pub struct CompositeObserver {
    routes: Vec<(Option<ConversionOperation>, Arc<dyn ConversionObserver>)>,
}

impl CompositeObserver {
    /// Create a composite whose observers receive every event.
    pub fn new(observers: Vec<Arc<dyn ConversionObserver>>) -> Self {
        Self {
            routes: observers.into_iter().map(|o| (None, o)).collect(),
        }
    }

    /// Add an observer that only receives events of `operation`.
    pub fn route(mut self, operation: ConversionOperation, observer: Arc<dyn ConversionObserver>) -> Self {
        self.routes.push((Some(operation), observer));
        self
    }

    fn targets<'a>(&'a self, ctx: &'a ConversionContext) -> impl Iterator<Item = &'a Arc<dyn ConversionObserver>> {
        self.routes
            .iter()
            .filter(move |(only, _)| only.is_none_or(|op| op == ctx.operation))
            .map(|(_, observer)| observer)
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routed = self.routes.iter().filter(|(only, _)| only.is_some()).count();
        f.debug_struct("CompositeObserver")
            .field("observers", &self.routes.len())
            .field("routed", &routed)
            .finish()
    }
}

impl ConversionObserver for CompositeObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.targets(ctx).for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.targets(ctx).for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.targets(ctx).for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Forwards conversion events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ConversionObserver for TracingObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        tracing::info!(
            operation = ?ctx.operation,
            path = %ctx.path.display(),
            rows = stats.rows,
            "conversion succeeded"
        );
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        tracing::warn!(
            operation = ?ctx.operation,
            path = %ctx.path.display(),
            ?severity,
            %error,
            "conversion failed"
        );
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        tracing::error!(
            operation = ?ctx.operation,
            path = %ctx.path.display(),
            ?severity,
            %error,
            "conversion alert"
        );
    }
}

/// Appends one line per conversion event to a local log file:
/// `<unix secs> op=<operation> path=<path> <outcome>`.
///
/// Writes are best-effort; failures to open or write the log are ignored.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn record(&self, ctx: &ConversionContext, outcome: fmt::Arguments<'_>) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(
                f,
                "{} op={:?} path={} {outcome}",
                unix_ts(),
                ctx.operation,
                ctx.path.display()
            );
        }
    }
}

impl ConversionObserver for FileObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        self.record(ctx, format_args!("ok rows={}", stats.rows));
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.record(ctx, format_args!("fail severity={severity:?} err={error}"));
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConversionError) {
        self.record(ctx, format_args!("ALERT severity={severity:?} err={error}"));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Severity assigned to a failure when reporting it to observers.
pub fn severity_for_error(e: &ConversionError) -> ConversionSeverity {
    match e {
        _ if e.is_io() => ConversionSeverity::Critical,
        ConversionError::IndexOutOfRange { .. } => ConversionSeverity::Warning,
        _ => ConversionSeverity::Error,
    }
}

/// Report an operation outcome to an optional observer.
pub(crate) fn report<T>(
    observer: Option<&Arc<dyn ConversionObserver>>,
    alert_at_or_above: ConversionSeverity,
    ctx: ConversionContext,
    result: &ConversionResult<T>,
    rows: impl FnOnce(&T) -> usize,
) {
    let Some(obs) = observer else {
        return;
    };
    match result {
        Ok(value) => obs.on_success(&ctx, ConversionStats { rows: rows(value) }),
        Err(e) => {
            let sev = severity_for_error(e);
            obs.on_failure(&ctx, sev, e);
            if sev >= alert_at_or_above {
                obs.on_alert(&ctx, sev, e);
            }
        }
    }
}

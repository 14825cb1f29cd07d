//! Structured JSONL logging for the CLI.
//!
//! Stdout carries command output (and `--json` documents), so log records
//! only ever go to a file or, as a last resort, stderr.
//!
//! Log file selection, first match wins:
//!
//! 1. `RELTAG_LOG_PATH` (a full file path)
//! 2. `RELTAG_LOG_DIR`
//! 3. `log_dir` from configuration
//! 4. the platform data directory (`.../reltag/logs`)

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use tracing::Event;
use tracing::field::{Field, Visit};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "RELTAG_LOG_PATH";
const ENV_LOG_DIR: &str = "RELTAG_LOG_DIR";
const SERVICE: &str = env!("CARGO_PKG_NAME");

/// Where log output should go, before environment overrides.
#[derive(Clone, Debug, Default)]
pub struct LogSettings {
    /// `log_dir` from the loaded configuration.
    pub config_dir: Option<PathBuf>,
}

/// Overrides read from the environment.
#[derive(Clone, Debug, Default)]
struct LogOverrides {
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
}

impl LogOverrides {
    fn from_env() -> Self {
        Self {
            path: std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
            dir: std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogFile {
    dir: PathBuf,
    name: String,
}

impl LogFile {
    fn in_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            name: format!("{SERVICE}.jsonl"),
        }
    }

    fn at_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("{ENV_LOG_PATH} must end in a UTF-8 file name"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            dir,
            name: name.to_string(),
        })
    }

    fn open_check(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| anyhow!("cannot create log directory {}: {e}", self.dir.display()))?;
        let path = self.dir.join(&self.name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| anyhow!("cannot open log file {}: {e}", path.display()))?;
        Ok(())
    }
}

/// Keeps the background log writer alive. Drop it last.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Never fails today; an unusable log file falls back to stderr with a
/// warning.
pub fn init(settings: &LogSettings, filter: EnvFilter) -> Result<LogGuard> {
    let (writer, worker) = match file_writer(settings, LogOverrides::from_env()) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("warning: {err}; logging to stderr");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(JsonLines::new(writer))
        .init();

    tracing::debug!(service = SERVICE, "logging initialized");
    Ok(LogGuard { _worker: worker })
}

/// Build the filter from CLI flags.
///
/// `-q` wins over `-v`, which wins over `RUST_LOG`, which wins over the
/// configured level.
pub fn env_filter(quiet: bool, verbose: u8, configured: &str) -> EnvFilter {
    match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
        }
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    }
}

fn file_writer(settings: &LogSettings, overrides: LogOverrides) -> Result<(NonBlocking, WorkerGuard)> {
    let file = choose_log_file(settings, overrides)?;
    file.open_check()?;
    let appender = tracing_appender::rolling::daily(&file.dir, &file.name);
    Ok(tracing_appender::non_blocking(appender))
}

// The current directory is never a candidate: a log file there would show
// up in `git status` and make the tree look dirty.
fn choose_log_file(settings: &LogSettings, overrides: LogOverrides) -> Result<LogFile> {
    if let Some(path) = overrides.path {
        return LogFile::at_path(&path);
    }
    if let Some(dir) = overrides.dir.or_else(|| settings.config_dir.clone()) {
        return Ok(LogFile::in_dir(dir));
    }
    directories::ProjectDirs::from("", "", SERVICE)
        .map(|dirs| LogFile::in_dir(dirs.data_local_dir().join("logs")))
        .ok_or_else(|| anyhow!("no home directory for log files"))
}

// ----------------------------------------------------------------------------
// JSON lines layer
// ----------------------------------------------------------------------------

struct JsonLines<W> {
    writer: W,
}

impl<W> JsonLines<W> {
    const fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[derive(Clone, Debug, Default)]
struct SpanValues(Map<String, Value>);

impl<S, W> tracing_subscriber::Layer<S> for JsonLines<W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = FieldMap::default();
        attrs.record(&mut fields);
        span.extensions_mut().insert(SpanValues(fields.0));
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = FieldMap::default();
        values.record(&mut fields);
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanValues>() {
            Some(existing) => existing.0.extend(fields.0),
            None => extensions.insert(SpanValues(fields.0)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut record = Map::new();
        record.insert("timestamp".into(), Value::String(now_rfc3339()));
        record.insert("level".into(), Value::String(meta.level().as_str().to_lowercase()));
        record.insert("target".into(), Value::String(meta.target().to_string()));

        if let Some(scope) = ctx.event_scope(event) {
            let mut names = Vec::new();
            for span in scope.from_root() {
                names.push(Value::String(span.name().to_string()));
                if let Some(values) = span.extensions().get::<SpanValues>() {
                    record.extend(values.0.clone());
                }
            }
            record.insert("spans".into(), Value::Array(names));
        }

        let mut fields = FieldMap::default();
        event.record(&mut fields);
        record.extend(fields.0);

        let mut out = self.writer.make_writer();
        if serde_json::to_writer(&mut out, &Value::Object(record)).is_ok() {
            let _ = out.write_all(b"\n");
        }
    }
}

#[derive(Default)]
struct FieldMap(Map<String, Value>);

impl FieldMap {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldMap {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }
}

fn now_rfc3339() -> String {
    rfc3339(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default(),
    )
}

/// UTC timestamp with millisecond precision.
fn rfc3339(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    let (year, month, day) = civil_date((secs / 86_400) as i64);
    let in_day = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        in_day / 3600,
        in_day % 3600 / 60,
        in_day % 60,
        since_epoch.subsec_millis()
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
const fn civil_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + (if month <= 2 { 1 } else { 0 });
    (year, month, day)
}

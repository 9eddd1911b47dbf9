//! Logging sink
//!
//! A process starts on a console sink, with call tracing attached from the
//! first event when it was requested. Once the experiment description is
//! loaded, [`LogSink::handoff`] builds the configured sink (file, layout,
//! level, profiling), carries the trace writer over, and the driver makes it
//! the default dispatcher for the rest of the invocation. Switching from
//! console to file output is announced on the console sink before it
//! happens.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing::dispatcher::DefaultGuard;
use tracing::{warn, Dispatch};
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{filter, fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::execution::Profiler;
use crate::Result;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Call tracing: span enter/exit events from source files whose path
/// contains `filter`, written to `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceTarget {
    /// Source-file substring
    pub filter: String,
    /// Trace output file
    pub path: PathBuf,
}

/// Open trace file shared by a sink and the sinks handed off from it.
#[derive(Clone)]
struct TraceWriter {
    filter: String,
    writer: NonBlocking,
    _guard: Arc<WorkerGuard>,
}

impl TraceWriter {
    fn open(target: TraceTarget) -> Result<Self> {
        let (writer, guard) = lossless_writer(&target.path)?;
        Ok(Self {
            filter: target.filter,
            writer,
            _guard: Arc::new(guard),
        })
    }

    fn layer(&self) -> BoxedLayer {
        let pattern = self.filter.clone();
        fmt::layer()
            .with_writer(self.writer.clone())
            .with_ansi(false)
            .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
            .with_filter(filter::filter_fn(move |meta| {
                meta.file().is_some_and(|file| file.contains(pattern.as_str()))
            }))
            .boxed()
    }
}

/// Where the sink writes log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkDestination {
    /// Standard error
    Console,
    /// Appended file
    File(PathBuf),
}

/// A fully built logging configuration for the process.
pub struct LogSink {
    dispatch: Dispatch,
    destination: SinkDestination,
    trace: Option<TraceWriter>,
    _guards: Vec<WorkerGuard>,
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("destination", &self.destination)
            .field("tracing", &self.trace.is_some())
            .finish_non_exhaustive()
    }
}

impl LogSink {
    /// Default sink: stderr, filtered by `RUST_LOG` (default `info`).
    #[must_use]
    pub fn console() -> Self {
        let layer = fmt::layer()
            .with_writer(BoxMakeWriter::new(std::io::stderr))
            .with_filter(default_filter())
            .boxed();
        Self {
            dispatch: Dispatch::new(tracing_subscriber::registry().with(vec![layer])),
            destination: SinkDestination::Console,
            trace: None,
            _guards: Vec::new(),
        }
    }

    /// Console sink with call tracing enabled from its first event.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the trace file cannot be opened.
    pub fn console_traced(trace: Option<TraceTarget>) -> Result<Self> {
        Self::builder().trace(trace).build()
    }

    /// Create a builder for a configured sink.
    #[must_use]
    pub fn builder() -> LogSinkBuilder {
        LogSinkBuilder::default()
    }

    /// Build the sink declared by an experiment's `logging` block.
    ///
    /// Call tracing of `self` continues in the new sink, on the same file.
    /// When output moves to a file, a warning naming the file is emitted on
    /// `self` first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for an unknown layout or level, and
    /// an I/O error when the log file cannot be opened.
    pub fn handoff(
        &self,
        logging: Option<&LoggingConfig>,
        profiler: Option<Profiler>,
    ) -> Result<Self> {
        let mut builder = Self::builder().profiler(profiler);
        builder.trace_writer = self.trace.clone();
        if let Some(logging) = logging {
            builder = builder.format(logging.log_format()?);
            if let Some(level) = logging.level_filter()? {
                builder = builder.level(level);
            }
            if let Some(filename) = &logging.filename {
                tracing::dispatcher::with_default(&self.dispatch, || {
                    warn!(
                        file = %filename.display(),
                        "Redirecting log output to file; console logging stops here"
                    );
                });
                builder = builder.file(filename);
            }
        }
        builder.build()
    }

    /// Dispatcher to run code under.
    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Where log lines go.
    #[must_use]
    pub const fn destination(&self) -> &SinkDestination {
        &self.destination
    }

    /// Make this sink the default dispatcher of the current thread until the
    /// returned guard is dropped.
    #[must_use = "the sink is only active while the guard is alive"]
    pub fn set_default(&self) -> DefaultGuard {
        tracing::dispatcher::set_default(&self.dispatch)
    }
}

/// Builder for `LogSink`.
#[derive(Default)]
pub struct LogSinkBuilder {
    format: LogFormat,
    level: Option<LevelFilter>,
    file: Option<PathBuf>,
    trace: Option<TraceTarget>,
    trace_writer: Option<TraceWriter>,
    profiler: Option<Profiler>,
}

impl LogSinkBuilder {
    /// Line layout.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Minimum severity; `RUST_LOG` applies when unset.
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = Some(level);
        self
    }

    /// Write to `path` instead of stderr.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable call tracing.
    #[must_use]
    pub fn trace(mut self, trace: Option<TraceTarget>) -> Self {
        self.trace = trace;
        self
    }

    /// Attach a span profiler.
    #[must_use]
    pub fn profiler(mut self, profiler: Option<Profiler>) -> Self {
        self.profiler = profiler;
        self
    }

    /// Build the sink.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when a log or trace file cannot be opened.
    pub fn build(self) -> Result<LogSink> {
        let mut guards = Vec::new();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        let (writer, ansi, destination) = match &self.file {
            Some(path) => {
                let (writer, guard) = lossless_writer(path)?;
                guards.push(guard);
                (
                    BoxMakeWriter::new(writer),
                    false,
                    SinkDestination::File(path.clone()),
                )
            }
            None => (
                BoxMakeWriter::new(std::io::stderr),
                true,
                SinkDestination::Console,
            ),
        };
        layers.push(format_layer(self.format, writer, ansi, self.level));

        let trace = match self.trace {
            Some(target) => Some(TraceWriter::open(target)?),
            None => self.trace_writer,
        };
        if let Some(trace) = &trace {
            layers.push(trace.layer());
        }

        if let Some(profiler) = self.profiler {
            layers.push(profiler.layer().boxed());
        }

        Ok(LogSink {
            dispatch: Dispatch::new(tracing_subscriber::registry().with(layers)),
            destination,
            trace,
            _guards: guards,
        })
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Background writer that blocks instead of dropping lines when its buffer
/// is full.
fn lossless_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    Ok(NonBlockingBuilder::default()
        .lossy(false)
        .finish(open_append(path)?))
}

fn format_layer(
    format: LogFormat,
    writer: BoxMakeWriter,
    ansi: bool,
    level: Option<LevelFilter>,
) -> BoxedLayer {
    let layer: BoxedLayer = match format {
        LogFormat::Full => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };
    match level {
        Some(level) => layer.with_filter(level).boxed(),
        None => layer.with_filter(default_filter()).boxed(),
    }
}

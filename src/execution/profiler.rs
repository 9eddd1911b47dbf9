//! Span profiler
//!
//! Collects busy time per span name while enabled. The Execution Controller
//! enables it for exactly one run, then writes the report sorted by
//! cumulative time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::span::Id;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Accumulated timing for one span name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanTiming {
    /// Times the span was entered
    pub calls: u64,
    /// Total time inside the span
    pub total: Duration,
}

#[derive(Debug, Default)]
struct ProfilerState {
    enabled: AtomicBool,
    samples: Mutex<BTreeMap<&'static str, SpanTiming>>,
}

/// Shared handle to a span profiler.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    state: Arc<ProfilerState>,
}

impl Profiler {
    /// Create a disabled profiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting samples.
    pub fn enable(&self) {
        self.state.enabled.store(true, Ordering::SeqCst);
    }

    /// Stop collecting samples.
    pub fn disable(&self) {
        self.state.enabled.store(false, Ordering::SeqCst);
    }

    /// Whether samples are being collected.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    /// Layer feeding this profiler; attach it to the logging sink.
    #[must_use]
    pub fn layer(&self) -> ProfileLayer {
        ProfileLayer {
            profiler: self.clone(),
        }
    }

    fn record(&self, name: &'static str, busy: Duration) {
        let mut samples = self
            .state
            .samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let timing = samples.entry(name).or_default();
        timing.calls += 1;
        timing.total += busy;
    }

    /// Snapshot of the collected samples.
    #[must_use]
    pub fn report(&self) -> ProfileReport {
        let samples = self
            .state
            .samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<(&'static str, SpanTiming)> =
            samples.iter().map(|(name, timing)| (*name, *timing)).collect();
        entries.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.cmp(b.0)));
        ProfileReport { entries }
    }
}

/// Span timings sorted by cumulative time, longest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileReport {
    entries: Vec<(&'static str, SpanTiming)>,
}

impl ProfileReport {
    /// Entries, longest cumulative time first.
    #[must_use]
    pub fn entries(&self) -> &[(&'static str, SpanTiming)] {
        &self.entries
    }

    /// Timing for span `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SpanTiming> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, timing)| *timing)
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10}  {:>12}  {:>12}  span", "calls", "cumtime(s)", "percall(s)")?;
        for (name, timing) in &self.entries {
            let total = timing.total.as_secs_f64();
            #[allow(clippy::cast_precision_loss)]
            let per_call = if timing.calls == 0 {
                0.0
            } else {
                total / timing.calls as f64
            };
            writeln!(f, "{:>10}  {total:>12.6}  {per_call:>12.6}  {name}", timing.calls)?;
        }
        Ok(())
    }
}

struct Entered(Instant);

/// `tracing` layer timing every span entry while the profiler is enabled.
#[derive(Debug, Clone)]
pub struct ProfileLayer {
    profiler: Profiler,
}

impl<S> Layer<S> for ProfileLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if !self.profiler.is_enabled() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().replace(Entered(Instant::now()));
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let entered = span.extensions_mut().remove::<Entered>();
            if let Some(Entered(start)) = entered {
                self.profiler.record(span.name(), start.elapsed());
            }
        }
    }
}

//! `tracing` layer that turns events into Cloud Logging entries.
//!
//! Each span owns an encoder derived from its parent's, holding the span's
//! fields as context. An event clones the encoder of the span it happened in,
//! records its own fields, and completes the entry. The bytes returned by the
//! encoder go to the write syncer.

use crate::visitor::FieldVisitor;
use cloud_log_adapters::{CloudEncoder, EncoderStats, LogSink, StderrLogSink, is_delivery_thread};
use cloud_log_config::{LayerConfig, default_ignored_targets};
use cloud_log_domain::{EntryHeader, FieldSet, LogLevel, SourceLocation};
use cloud_log_ports::{EntryEncoder, WriteSyncer};
use cloud_log_shared::Result;
use std::fmt;
use std::sync::Arc;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::{LookupSpan, SpanRef};

/// Payload key for the event target.
pub const TARGET_KEY: &str = "target";

/// Span extension holding the span's encoder.
struct SpanEncoder(CloudEncoder);

/// Layer forwarding events to a [`CloudEncoder`].
///
/// Failures cannot travel back through `tracing`; they are counted in the
/// encoder's [`EncoderStats`] and reported to the error sink.
pub struct CloudLoggingLayer {
    root: CloudEncoder,
    syncer: Arc<dyn WriteSyncer>,
    errors: Arc<dyn LogSink>,
    min_level: LogLevel,
    ignored_targets: Vec<String>,
    include_target: bool,
    include_source_location: bool,
}

impl CloudLoggingLayer {
    /// Layer with default settings: `info` and above, the client's own
    /// dependencies ignored.
    pub fn new(root: CloudEncoder, syncer: Arc<dyn WriteSyncer>) -> Self {
        Self {
            root,
            syncer,
            errors: Arc::new(StderrLogSink),
            min_level: LogLevel::Info,
            ignored_targets: default_ignored_targets(),
            include_target: false,
            include_source_location: false,
        }
    }

    /// Layer configured from the `layer` config section.
    pub fn from_config(config: &LayerConfig, root: CloudEncoder, syncer: Arc<dyn WriteSyncer>) -> Self {
        Self::new(root.with_redaction(config.redact_secret_fields), syncer)
            .with_min_level(config.min_level)
            .with_ignored_targets(config.ignored_targets.iter().cloned())
            .with_target(config.include_target)
            .with_source_location(config.include_source_location)
    }

    /// Drop events less severe than `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Drop events whose target is one of `targets` or a submodule of one.
    #[must_use]
    pub fn with_ignored_targets(mut self, targets: impl IntoIterator<Item = String>) -> Self {
        self.ignored_targets = targets.into_iter().collect();
        self
    }

    /// Record the event target under [`TARGET_KEY`].
    #[must_use]
    pub const fn with_target(mut self, enabled: bool) -> Self {
        self.include_target = enabled;
        self
    }

    /// Attach file, line and module path to each entry.
    #[must_use]
    pub const fn with_source_location(mut self, enabled: bool) -> Self {
        self.include_source_location = enabled;
        self
    }

    /// Where failures are reported.
    #[must_use]
    pub fn with_error_sink(mut self, errors: Arc<dyn LogSink>) -> Self {
        self.errors = errors;
        self
    }

    /// Counters shared by every encoder this layer derives.
    pub fn stats(&self) -> Arc<EncoderStats> {
        self.root.stats()
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|prefix| {
            target
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }

    fn span_encoder<S>(&self, span: Option<SpanRef<'_, S>>) -> CloudEncoder
    where
        S: for<'lookup> LookupSpan<'lookup>,
    {
        if let Some(span) = span {
            let extensions = span.extensions();
            if let Some(SpanEncoder(encoder)) = extensions.get::<SpanEncoder>() {
                return encoder.clone();
            }
        }
        self.root.clone()
    }

    fn encode(&self, encoder: &mut CloudEncoder, header: EntryHeader) -> Result<usize> {
        let bytes = encoder.encode_entry(header)?;
        self.syncer.write(&bytes)
    }
}

impl fmt::Debug for CloudLoggingLayer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CloudLoggingLayer")
            .field("min_level", &self.min_level)
            .field("ignored_targets", &self.ignored_targets)
            .field("include_target", &self.include_target)
            .field("include_source_location", &self.include_source_location)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for CloudLoggingLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut encoder = self
            .span_encoder(span.parent())
            .with_context(FieldSet::new());
        attrs.record(&mut FieldVisitor::for_span(&mut encoder));
        encoder.promote_fields();
        span.extensions_mut().insert(SpanEncoder(encoder));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanEncoder(encoder)) = extensions.get_mut::<SpanEncoder>() {
            values.record(&mut FieldVisitor::for_span(&mut *encoder));
            encoder.promote_fields();
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_delivery_thread() || self.is_ignored(metadata.target()) {
            return;
        }

        let mut encoder = self.span_encoder(ctx.event_span(event));
        if self.include_target {
            encoder.add_str(TARGET_KEY, metadata.target());
        }
        let mut visitor = FieldVisitor::for_event(&mut encoder);
        event.record(&mut visitor);
        let (message, level) = visitor.finish();

        let level = level.unwrap_or_else(|| level_from_tracing(*metadata.level()));
        if level < self.min_level {
            return;
        }

        let mut header = EntryHeader::new(level, message.unwrap_or_default());
        if self.include_source_location
            && let Some(file) = metadata.file()
        {
            header = header.with_source_location(SourceLocation {
                file: file.into(),
                line: metadata.line(),
                function: metadata.module_path().map(Into::into),
            });
        }

        if let Err(error) = self.encode(&mut encoder, header) {
            self.errors.report("cloud_log.submit_failed", &error);
        }
    }
}

/// Source level for a `tracing` level.
pub const fn level_from_tracing(level: Level) -> LogLevel {
    match level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

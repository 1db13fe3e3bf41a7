//! Diagnostic events emitted by the adapter.
//!
//! The adapter never logs through global state on its own; it reports to the
//! [`DiagnosticSink`] it was constructed with. [`TracingSink`] forwards to
//! `tracing`, [`NoopSink`] drops everything.

use tracing::debug;

use crate::stats::KeyStats;

/// Something the adapter did against the store
#[derive(Debug, Clone, Copy)]
pub enum Diagnostic<'a> {
    Connected { endpoint: &'a str },
    RowStored { key: &'a str, payload: &'a str },
    ValueStored { key: &'a str, payload: &'a str },
    Broadcast { channel: &'a str, payload: &'a str },
    KeyDeleted { key: &'a str },
    KeyMissing { key: &'a str },
    StatsComputed { stats: &'a KeyStats },
}

/// Receiver for adapter diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: Diagnostic<'_>);
}

/// Forwards every event to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: Diagnostic<'_>) {
        match event {
            Diagnostic::Connected { endpoint } => {
                debug!(endpoint = %endpoint, "Connected to store");
            }
            Diagnostic::RowStored { key, payload } => {
                debug!(key = %key, payload = %payload, "Stored new row");
            }
            Diagnostic::ValueStored { key, payload } => {
                debug!(key = %key, payload = %payload, "Stored value");
            }
            Diagnostic::Broadcast { channel, payload } => {
                debug!(channel = %channel, payload = %payload, "Published");
            }
            Diagnostic::KeyDeleted { key } => {
                debug!(key = %key, "Deleted key");
            }
            Diagnostic::KeyMissing { key } => {
                debug!(key = %key, "Key does not exist");
            }
            Diagnostic::StatsComputed { stats } => {
                debug!(
                    key = %stats.key,
                    kind = %stats.kind,
                    items = stats.item_count,
                    bytes = stats.size_bytes,
                    "Key stats"
                );
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn emit(&self, _event: Diagnostic<'_>) {}
}

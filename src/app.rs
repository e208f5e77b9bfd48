//! Consumer state: the latest statistics per host and their rendering.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::net::IpAddr;

use pingwatch_engine::EventStream;
use pingwatch_types::{HostId, HostStats, Snapshot, UpdateEvent};
use serde_json::json;

/// How updates and the summary are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned text, one line per update.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Drains update events and remembers the newest statistics per host, so a
/// summary can still be printed after the manager has shut down.
#[derive(Debug, Default)]
pub struct App {
    format: OutputFormat,
    latest: BTreeMap<HostId, HostStats>,
    addresses: BTreeMap<HostId, IpAddr>,
    updates: u64,
    dropped_seen: u64,
}

impl App {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Remember a resolved address to show next to the host.
    pub fn set_address(&mut self, host: HostId, address: IpAddr) {
        self.addresses.insert(host, address);
    }

    /// Write every queued event to `out`. Returns how many were written.
    pub fn drain<W: Write>(&mut self, events: &EventStream, out: &mut W) -> io::Result<usize> {
        let batch = events.drain();
        let count = batch.len();
        for event in batch {
            writeln!(out, "{}", self.apply(event))?;
        }
        out.flush()?;

        let dropped = events.dropped();
        if dropped > self.dropped_seen {
            tracing::warn!(
                dropped = dropped - self.dropped_seen,
                "update queue overflowed, oldest events dropped"
            );
            self.dropped_seen = dropped;
        }

        Ok(count)
    }

    /// Record one event and render its output line.
    pub fn apply(&mut self, event: UpdateEvent) -> String {
        let line = match self.format {
            OutputFormat::Text => format!(
                "{} {}",
                format_clock(event.timestamp_ms),
                self.text_line(&event.stats)
            ),
            OutputFormat::Json => {
                let mut value = self.json_value(&event.stats);
                value["timestamp_ms"] = json!(event.timestamp_ms);
                value.to_string()
            }
        };

        self.updates += 1;
        self.latest.insert(event.host, event.stats);
        line
    }

    /// Fold in statistics that may be newer than the last drained event.
    pub fn absorb(&mut self, snapshot: Snapshot) {
        for (host, stats) in snapshot.hosts {
            let newer = self
                .latest
                .get(&host)
                .map_or(true, |known| stats.sent >= known.sent);
            if newer {
                self.latest.insert(host, stats);
            }
        }
    }

    /// Events applied so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Newest statistics for one host.
    pub fn latest(&self, host: &str) -> Option<&HostStats> {
        self.latest.get(host)
    }

    /// Final per-host report.
    pub fn summary(&self) -> String {
        match self.format {
            OutputFormat::Text => {
                let mut out = String::from("\n--- pingwatch summary ---\n");
                for stats in self.latest.values() {
                    out.push_str(&format!(
                        "{:<32} {:<7} sent={} received={} loss={:.1}% min/avg/max = {}/{}/{} ms\n",
                        self.display_host(&stats.host),
                        stats.status.to_string(),
                        stats.sent,
                        stats.received,
                        stats.loss_percent(),
                        format_ms(stats.min_latency_ms),
                        format_ms(stats.avg_latency_ms),
                        format_ms(stats.max_latency_ms),
                    ));
                }
                out
            }
            OutputFormat::Json => {
                let hosts: Vec<_> = self.latest.values().map(|s| self.json_value(s)).collect();
                json!({ "summary": hosts }).to_string()
            }
        }
    }

    fn text_line(&self, stats: &HostStats) -> String {
        format!(
            "{:<32} {:<7} {:>9} sent={} loss={:.1}% avg={}  {}",
            self.display_host(&stats.host),
            stats.status.to_string(),
            format!("{} ms", format_ms(stats.last_latency_ms)),
            stats.sent,
            stats.loss_percent(),
            format_ms(stats.avg_latency_ms),
            stats.last_message,
        )
    }

    fn json_value(&self, stats: &HostStats) -> serde_json::Value {
        json!({
            "host": stats.host,
            "address": self.addresses.get(&stats.host).map(ToString::to_string),
            "status": stats.status,
            "latency_ms": stats.last_latency_ms,
            "sent": stats.sent,
            "received": stats.received,
            "loss_percent": stats.loss_percent(),
            "min_latency_ms": stats.min_latency_ms,
            "avg_latency_ms": stats.avg_latency_ms,
            "max_latency_ms": stats.max_latency_ms,
            "message": stats.last_message,
        })
    }

    fn display_host(&self, host: &HostId) -> String {
        match self.addresses.get(host) {
            Some(ip) if ip.to_string() != host.as_str() => format!("{host} ({ip})"),
            _ => host.to_string(),
        }
    }
}

/// `12.3`, or `--` when absent.
fn format_ms(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{v:.1}"))
}

/// `HH:MM:SS.mmm` (UTC) of a Unix millisecond timestamp.
fn format_clock(timestamp_ms: u64) -> String {
    let millis = timestamp_ms % 1000;
    let secs = timestamp_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{millis:03}",
        secs / 3600 % 24,
        secs / 60 % 60,
        secs % 60
    )
}

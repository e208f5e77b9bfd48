//! Example: driving the monitor manager with a custom prober.
//!
//! The prober here fakes a flaky network: every fifth probe is lost and
//! latency wanders between 5 and 25 ms. Swap in `SystemPingProber` to probe
//! for real.
//!
//! Run with: cargo run -p pingwatch-engine --example stub_prober

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pingwatch_engine::{HostId, MonitorManager, ProbeResult, Prober};

#[derive(Debug, Default)]
struct FlakyProber {
    count: AtomicU64,
}

#[async_trait::async_trait]
impl Prober for FlakyProber {
    async fn probe(&self, host: &HostId, _timeout: Duration) -> ProbeResult {
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(5 + n % 20)).await;

        if n % 5 == 4 {
            ProbeResult::failure(format!("Request timeout for {host}"))
        } else {
            ProbeResult::success((5 + n % 20) as f64, format!("reply from {host}"))
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let manager = MonitorManager::builder()
        .prober(Arc::new(FlakyProber::default()))
        .interval(Duration::from_millis(500))
        .hosts(["10.0.0.1", "https://example.com/status"])
        .build()?;

    let mut events = manager.events();
    let consumer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!(
                "{:<15} {:<5} sent={:<3} lost={:<3} latency={:?}",
                event.host.as_str(),
                event.stats.status.to_string(),
                event.stats.sent,
                event.stats.lost(),
                event.stats.last_latency_ms,
            );
        }
    });

    tokio::time::sleep(Duration::from_secs(3)).await;
    manager.set_interval(0.2)?;
    manager.add_host("192.168.1.1")?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    manager.remove_host("example.com")?.stopped().await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.shutdown_gracefully(Duration::from_secs(2)).await;
    consumer.await?;

    Ok(())
}

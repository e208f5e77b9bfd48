use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pingwatch::{logging, App, OutputFormat, Overrides, Settings};
use pingwatch_engine::{resolve_host, MonitorManager, SystemPingProber};

/// How often queued updates are printed.
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// How long monitors get to finish in-flight probes on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "pingwatch")]
#[command(about = "Continuously ping a set of hosts and report latency and uptime")]
struct Args {
    /// Hosts to monitor: hostnames, IP addresses or URLs
    hosts: Vec<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between probes of each host (minimum 0.2)
    #[arg(short, long)]
    interval: Option<f64>,

    /// Per-probe timeout in milliseconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    duration: Option<f64>,

    /// Print one JSON object per line
    #[arg(long)]
    json: bool,

    /// Resolve each host once and show its address
    #[arg(long)]
    resolve: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            hosts: self.hosts.clone(),
            interval_secs: self.interval,
            timeout_ms: self.timeout,
            json: self.json,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let settings = Settings::load(args.config.as_deref())?.with_overrides(args.overrides());
    settings.validate()?;

    let duration = args
        .duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid --duration")?;

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    rt.block_on(run(settings, duration, args.resolve))
}

async fn run(settings: Settings, duration: Option<Duration>, resolve: bool) -> Result<()> {
    let manager = MonitorManager::builder()
        .prober(Arc::new(SystemPingProber::new()))
        .interval(settings.interval())
        .probe_timeout(settings.timeout())
        .history_capacity(settings.history_capacity)
        .queue_capacity(settings.queue_capacity)
        .build()?;

    for raw in &settings.hosts {
        if let Err(e) = manager.add_host(raw) {
            tracing::warn!(input = %raw, error = %e, "skipping host");
        }
    }
    if manager.is_empty() {
        bail!("no valid host to monitor; pass hosts as arguments or set `hosts` in the config");
    }

    let format = if settings.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let mut app = App::new(format);

    if resolve {
        for host in manager.hosts() {
            match resolve_host(&host).await {
                Ok(address) => {
                    tracing::info!(host = %host, %address, "resolved");
                    app.set_address(host, address);
                }
                Err(e) => tracing::warn!(host = %host, error = %e, "could not resolve"),
            }
        }
    }

    let events = manager.events();
    let mut tick = tokio::time::interval(DRAIN_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupted, stopping");
                break;
            }
            _ = &mut deadline => break,
            _ = tick.tick() => {
                app.drain(&events, &mut io::stdout().lock())
                    .context("failed to write to stdout")?;
            }
        }
    }

    app.drain(&events, &mut io::stdout().lock())
        .context("failed to write to stdout")?;
    app.absorb(manager.snapshot());

    if !manager.shutdown_gracefully(SHUTDOWN_GRACE).await {
        tracing::warn!("some monitors did not stop in time");
    }

    println!("{}", app.summary());
    Ok(())
}

//! Prober backed by the operating system's `ping` command.

use std::io;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use once_cell::sync::Lazy;
use pingwatch_types::{HostId, ProbeResult};
use regex::Regex;
use tokio::process::Command;

use crate::prober::Prober;

/// Round-trip time patterns, tried in order.
///
/// The first covers `time=12.3 ms` and Windows' `time<1ms`; the second is a
/// fallback for localized output such as `Zeit=12ms`.
static LATENCY_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)time[=<]\s*([0-9]+\.?[0-9]*)\s*ms").expect("Invalid latency regex"),
        Regex::new(r"(?i)=\s*([0-9]+\.?[0-9]*)ms").expect("Invalid fallback latency regex"),
    ]
});

/// Address family flags tried in order when a ping attempt fails.
const FAMILY_FLAGS: [Option<&str>; 3] = [None, Some("-4"), Some("-6")];

/// Time a `ping` process gets beyond its own timeout to start up and exit.
const PROCESS_EXIT_SLACK: Duration = Duration::from_secs(3);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Command-line dialect of the local `ping` utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux and other unix-likes: `-W` takes whole seconds.
    Unix,
    /// macOS and the BSDs: `-W` takes milliseconds.
    Bsd,
    /// Windows: `-n` is the count and `-w` takes milliseconds.
    Windows,
}

impl Platform {
    /// Dialect of the platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            Platform::Bsd
        } else {
            Platform::Unix
        }
    }

    /// Arguments for a single-packet ping of `host`.
    ///
    /// `family` is an optional `-4`/`-6` flag placed before the others.
    pub fn ping_args(self, host: &str, timeout: Duration, family: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = family.map(str::to_string).into_iter().collect();
        let millis = timeout.as_millis().max(1).to_string();

        match self {
            Platform::Unix => {
                // Whole seconds, rounded up, at least one
                let secs = timeout.as_millis().div_ceil(1000).max(1).to_string();
                args.extend(["-n", "-c", "1", "-W"].map(String::from));
                args.push(secs);
            }
            Platform::Bsd => {
                args.extend(["-n", "-c", "1", "-W"].map(String::from));
                args.push(millis);
            }
            Platform::Windows => {
                args.extend(["-n", "1", "-w"].map(String::from));
                args.push(millis);
            }
        }

        args.push(host.to_string());
        args
    }
}

/// Probes hosts by running the system `ping` utility once per probe.
///
/// Each probe tries the default address family first, then `-4`, then `-6`,
/// and reports success as soon as one attempt exits with status zero. The
/// round-trip time is parsed from the command output; a reply without a
/// parseable time still counts as success.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pingwatch_engine::{Prober, SystemPingProber};
/// use pingwatch_types::HostId;
///
/// # async fn demo() {
/// let prober = SystemPingProber::new();
/// let host = HostId::parse("127.0.0.1").unwrap();
/// let result = prober.probe(&host, Duration::from_secs(1)).await;
/// println!("{} {:?} {}", result.success, result.latency_ms, result.message);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SystemPingProber {
    program: String,
    platform: Platform,
}

impl SystemPingProber {
    /// Prober using `ping` from `PATH` with this platform's dialect.
    pub fn new() -> Self {
        Self {
            program: "ping".to_string(),
            platform: Platform::current(),
        }
    }

    /// Use a different executable, e.g. an absolute path to `ping`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Override the command-line dialect.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Executable this prober runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line dialect in use.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    async fn run(&self, args: &[String], timeout: Duration) -> io::Result<PingOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let output = tokio::time::timeout(timeout + PROCESS_EXIT_SLACK, cmd.output())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "ping did not exit in time"))??;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            text.push('\n');
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        Ok(PingOutput {
            success: output.status.success(),
            text,
        })
    }
}

impl Default for SystemPingProber {
    fn default() -> Self {
        Self::new()
    }
}

struct PingOutput {
    success: bool,
    text: String,
}

#[async_trait::async_trait]
impl Prober for SystemPingProber {
    async fn probe(&self, host: &HostId, timeout: Duration) -> ProbeResult {
        let mut last_message = String::new();

        for family in FAMILY_FLAGS {
            let args = self.platform.ping_args(host.as_str(), timeout, family);

            match self.run(&args, timeout).await {
                Ok(output) if output.success => {
                    let message = last_line(&output.text).to_string();
                    return match parse_latency(&output.text) {
                        Some(latency) => ProbeResult::success(latency, message),
                        None => ProbeResult::reply_without_latency(message),
                    };
                }
                Ok(output) => {
                    tracing::trace!(host = %host, ?family, "ping attempt got no reply");
                    last_message = last_line(&output.text).to_string();
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return ProbeResult::timeout(timeout);
                }
                Err(e) => {
                    tracing::warn!(host = %host, program = %self.program, error = %e, "failed to run ping");
                    last_message = format!("failed to run {}: {e}", self.program);
                }
            }
        }

        if last_message.is_empty() {
            last_message = "no reply".to_string();
        }
        ProbeResult::failure(last_message)
    }

    fn name(&self) -> &str {
        "system-ping"
    }
}

/// Extract a round-trip time in milliseconds from ping output.
pub(crate) fn parse_latency(output: &str) -> Option<f64> {
    LATENCY_PATTERNS
        .iter()
        .find_map(|re| re.captures(output))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Last non-empty line of `output`, trimmed.
pub(crate) fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

/// Resolve a host to one IP address.
///
/// IP literals are returned as-is; names go through the system resolver.
pub async fn resolve_host(host: &HostId) -> io::Result<IpAddr> {
    if let Ok(ip) = host.as_str().parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host((host.as_str(), 0)).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
}

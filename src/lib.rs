//! # pingwatch
//!
//! Watch the reachability and latency of a set of hosts from the terminal.
//!
//! The monitoring itself lives in [`pingwatch_engine`]; this crate is its
//! command-line consumer:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         pingwatch                            │
//! │  ┌──────────┐   ┌────────────────┐   ┌─────────┐   ┌───────┐ │
//! │  │  config  │──▶│ MonitorManager │──▶│   app   │──▶│ stdout│ │
//! │  │ (layers) │   │ (one task/host)│   │ (drain) │   │       │ │
//! │  └──────────┘   └────────────────┘   └─────────┘   └───────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: defaults, TOML file, `PINGWATCH_*` environment and flags
//! - **[`app`]**: drains update events, renders text or JSON lines and the
//!   final summary
//! - **[`logging`]**: `tracing` subscriber writing to stderr
//!
//! ## Usage
//!
//! ```bash
//! # Probe two hosts every second until Ctrl-C
//! pingwatch 192.168.1.1 https://example.com
//!
//! # Every half second for one minute, JSON lines
//! pingwatch --interval 0.5 --duration 60 --json 1.1.1.1
//!
//! # Hosts and settings from a file
//! pingwatch --config pingwatch.toml
//! ```

pub mod app;
pub mod config;
pub mod logging;

pub use app::{App, OutputFormat};
pub use config::{Overrides, Settings};

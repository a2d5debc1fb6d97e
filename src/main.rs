// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI daemon

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use envisalink_tpi::{Panel, PanelEvent, TpiConfig};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "etpid")]
#[command(about = "Monitor a DSC panel through an Envisalink TPI connection")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "etpid.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    #[serde(default)]
    daemon: DaemonToml,
    #[serde(default, deserialize_with = "deserialize_zone_names")]
    zone_names: HashMap<u32, String>,
}

fn deserialize_zone_names<'de, D>(deserializer: D) -> Result<HashMap<u32, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u32>()
                .map(|id| (id, v))
                .map_err(|_| serde::de::Error::custom(format!("invalid zone ID: {k}")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_password")]
    password: String,
    #[serde(default)]
    user_code: String,
    #[serde(default = "default_dial_timeout")]
    dial_timeout_ms: u64,
    #[serde(default = "default_response_timeout")]
    response_timeout_ms: u64,
    #[serde(default = "default_sync_timeout")]
    sync_timeout_ms: u64,
    #[serde(default = "default_true")]
    set_clock_on_connect: bool,
}

fn default_port() -> u16 {
    envisalink_tpi::constants::DEFAULT_PORT
}
fn default_password() -> String {
    "user".to_string()
}
fn default_dial_timeout() -> u64 {
    1000
}
fn default_response_timeout() -> u64 {
    1000
}
fn default_sync_timeout() -> u64 {
    15000
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct DaemonToml {
    #[serde(default = "default_poll_interval")]
    poll_interval_secs: u64,
    #[serde(default = "default_reconnect_delay")]
    reconnect_delay_ms: u64,
}

impl Default for DaemonToml {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

fn default_poll_interval() -> u64 {
    600
}
fn default_reconnect_delay() -> u64 {
    10000
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&text).context("Failed to parse config file")
}

fn build_tpi_config(toml: &PanelToml) -> TpiConfig {
    TpiConfig::builder()
        .host(&toml.host)
        .port(toml.port)
        .password(&toml.password)
        .user_code(&toml.user_code)
        .dial_timeout_ms(toml.dial_timeout_ms)
        .response_timeout_ms(toml.response_timeout_ms)
        .sync_timeout_ms(toml.sync_timeout_ms)
        .set_clock_on_connect(toml.set_clock_on_connect)
        .build()
}

fn zone_label(zone_id: u32, overrides: &HashMap<u32, String>) -> String {
    overrides
        .get(&zone_id)
        .cloned()
        .unwrap_or_else(|| format!("Zone {zone_id}"))
}

// ---------------------------------------------------------------------------
// Session handling
// ---------------------------------------------------------------------------

fn register_callbacks(panel: &Panel, zone_names: Arc<HashMap<u32, String>>) {
    panel.on_zone_event(move |zone_id, status| {
        info!("{}: {}", zone_label(zone_id, &zone_names), status);
    });
    panel.on_partition_event(|partition_id, status| {
        info!("Partition {}: {}", partition_id, status);
    });
    panel.on_keypad_event(|status| {
        info!("Keypad LEDs: {}", status.lit_names().join(" "));
    });
}

/// Log lifecycle events that have no callback slot.
async fn log_events(panel: Arc<Panel>) {
    let mut rx = panel.subscribe();
    loop {
        match rx.recv().await {
            Ok(PanelEvent::LoginRejected(reason)) => error!("Login rejected: {reason}"),
            Ok(PanelEvent::Trouble {
                partition_id,
                active: true,
            }) => warn!("Partition {partition_id}: trouble"),
            Ok(PanelEvent::Trouble {
                partition_id,
                active: false,
            }) => info!("Partition {partition_id}: trouble cleared"),
            Ok(PanelEvent::Disconnected) => warn!("Panel disconnected"),
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!("Event receiver lagged, missed {n} events"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Delay before reconnect attempt `attempt` (1-based): doubles up to 16x.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(4))
}

/// Connect, poll on an interval, and reconnect with exponential backoff
/// whenever the session drops.
async fn run_session(panel: Arc<Panel>, daemon: DaemonToml) {
    let mut attempt: u32 = 0;
    loop {
        if attempt > 0 {
            let delay_ms = backoff_delay_ms(daemon.reconnect_delay_ms, attempt);
            warn!(
                "Connection attempt {attempt} failed. Retrying in {:.1}s...",
                delay_ms as f64 / 1000.0
            );
            sleep(Duration::from_millis(delay_ms)).await;
        }
        attempt += 1;

        if let Err(e) = panel.connect().await {
            if e.is_retryable() {
                warn!("Connection error: {e}");
            } else {
                error!("Connection error: {e}");
            }
            continue;
        }
        attempt = 0;

        let status = panel.status();
        let open = status.zones.iter().filter(|z| z.is_open()).count();
        info!(
            "Panel ready: {open} zone(s) open, partition 1 {}",
            status.partitions[0]
        );

        let mut ticker = interval(Duration::from_secs(daemon.poll_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick; connect already requested a status report
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = panel.poll().await {
                        warn!("Status poll failed: {e}");
                    }
                }
                _ = panel.closed() => break,
            }
        }
        warn!("Session ended, will attempt reconnection");
        attempt = 1;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=envisalink_tpi=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        let panel = Arc::new(Panel::new(build_tpi_config(&config.panel)));
        register_callbacks(&panel, Arc::new(config.zone_names.clone()));

        let event_handle = tokio::spawn(log_events(Arc::clone(&panel)));
        let session_handle = tokio::spawn(run_session(Arc::clone(&panel), config.daemon.clone()));

        info!("etpid running. Send SIGHUP to reload, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and reconnecting...");
                true
            }
        };

        session_handle.abort();
        event_handle.abort();
        panel.disconnect().await;

        if !restart {
            break;
        }

        // Keep the previous config if the new one does not load
        info!("Reloading config from {}", cli.config);
        match load_config(&cli.config) {
            Ok(new_config) => {
                config = new_config;
                info!("Config reloaded successfully");
            }
            Err(e) => warn!("Failed to reload config, keeping previous: {e:#}"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "10.0.0.5"
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.port, 4025);
        assert_eq!(config.panel.password, "user");
        assert!(config.panel.set_clock_on_connect);
        assert_eq!(config.daemon.poll_interval_secs, 600);
        assert!(config.zone_names.is_empty());

        let tpi = build_tpi_config(&config.panel);
        assert_eq!(tpi.address(), "10.0.0.5:4025");
        assert_eq!(tpi.sync_timeout_ms, 15000);
    }

    #[test]
    fn test_zone_names() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "10.0.0.5"
            user_code = "1234"

            [daemon]
            poll_interval_secs = 60

            [zone_names]
            1 = "Front door"
            12 = "Kitchen motion"
            "#,
        )
        .unwrap();
        assert_eq!(config.daemon.poll_interval_secs, 60);
        assert_eq!(config.daemon.reconnect_delay_ms, 10000);
        assert_eq!(zone_label(1, &config.zone_names), "Front door");
        assert_eq!(zone_label(2, &config.zone_names), "Zone 2");
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay_ms(10000, 1), 10000);
        assert_eq!(backoff_delay_ms(10000, 2), 20000);
        assert_eq!(backoff_delay_ms(10000, 5), 160000);
        assert_eq!(backoff_delay_ms(10000, 9), 160000);
        assert_eq!(backoff_delay_ms(u64::MAX / 2, 3), u64::MAX);
    }

    #[test]
    fn test_bad_zone_id_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [panel]
            host = "10.0.0.5"

            [zone_names]
            front = "Front door"
            "#,
        );
        assert!(result.is_err());
    }
}

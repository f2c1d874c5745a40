// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::signal;
use tokio::time;
use tracing::{info, warn};

use gqrx_app::init_logging;
use gqrx_client::{parse_endpoint, GqrxClient, GqrxError};
use gqrx_core::{validate_mode, DynResult, DEMOD_MODES};
use gqrx_protocol::DEFAULT_PORT;

use config::{Bookmark, ClientConfig};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - Gqrx remote control client");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Receiver address (host:port, default port 7356)
    #[arg(short = 'u', long = "url")]
    url: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
    /// Reply timeout in milliseconds (0 = wait forever)
    #[arg(long = "io-timeout")]
    io_timeout_ms: Option<u64>,
    /// Print results as JSON
    #[arg(long = "json")]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Get or set the frequency in Hz
    Freq { hz: Option<i64> },
    /// Get or set the demodulator; bandwidth defaults to the mode preset
    Demod {
        mode: Option<String>,
        bandwidth: Option<i64>,
    },
    /// Read the signal strength in dBFS
    Strength,
    /// Get or set the squelch threshold in dBFS
    Squelch {
        #[arg(allow_negative_numbers = true)]
        level: Option<f64>,
    },
    /// Get or set audio mute (on/off)
    Mute { state: Option<String> },
    /// Get or set the DSP run state (on/off)
    Dsp { state: Option<String> },
    /// Send a raw command line and print the reply
    Raw {
        /// Number of reply lines to collect (needed for \dump_state)
        #[arg(long = "lines")]
        lines: Option<usize>,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// List, recall or capture named frequency/mode bookmarks
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },
    /// List the demodulator modes and their preset bandwidths
    Modes,
    /// Poll frequency, demodulator and signal strength until Ctrl+C
    Monitor,
}

#[derive(Debug, Subcommand)]
enum BookmarkAction {
    /// List the bookmarks from the config file
    List,
    /// Set the receiver to a bookmark's mode and frequency
    Tune { name: String },
    /// Print the receiver's current setting as a config snippet
    Capture { name: String },
}

/// Result of one command, rendered as text or JSON.
struct Report {
    text: String,
    json: serde_json::Value,
}

impl Report {
    fn print(&self, as_json: bool) {
        if as_json {
            println!("{}", self.json);
        } else {
            println!("{}", self.text);
        }
    }
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ClientConfig::example_toml());
        return Ok(());
    }

    let (cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = ClientConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        ClientConfig::load_from_default_paths()?
    };
    cfg.validate()
        .map_err(|e| format!("Invalid client configuration: {}", e))?;

    init_logging(
        cli.log_level
            .as_deref()
            .or(cfg.general.log_level.as_deref()),
    );

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let Some(command) = cli.command else {
        return Err("no command given (see --help)".into());
    };

    match command {
        Command::Modes => {
            modes_report(&cfg).print(cli.json);
            return Ok(());
        }
        Command::Bookmark {
            action: BookmarkAction::List,
        } => {
            bookmarks_report(&cfg).print(cli.json);
            return Ok(());
        }
        Command::Bookmark {
            action: BookmarkAction::Tune { ref name },
        } if cfg.bookmark(name).is_none() => {
            return Err(format!("no bookmark named '{name}' in the configuration").into());
        }
        _ => {}
    }

    // Resolve receiver URL: CLI > config [remote] section > localhost
    let url = cli
        .url
        .clone()
        .or_else(|| cfg.remote.url.clone())
        .unwrap_or_else(|| format!("127.0.0.1:{DEFAULT_PORT}"));
    let endpoint = parse_endpoint(&url).map_err(|e| format!("Invalid receiver URL: {}", e))?;

    let mut options = cfg.remote.connection_options();
    if let Some(ms) = cli.io_timeout_ms {
        options.io_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }

    let client = GqrxClient::with_options(endpoint.connect_addr(), options);
    client.connect().await?;

    let result = match command {
        Command::Monitor => {
            let poll = Duration::from_millis(cfg.remote.poll_interval_ms);
            monitor(&client, poll, cli.json).await
        }
        other => run_command(&client, &cfg, other)
            .await
            .map(|report| report.print(cli.json)),
    };

    if client.state().is_connected() {
        if let Err(e) = client.disconnect().await {
            warn!("Disconnect failed: {}", e);
        }
    }

    result.map_err(Into::into)
}

async fn run_command(
    client: &GqrxClient,
    cfg: &ClientConfig,
    command: Command,
) -> Result<Report, GqrxError> {
    let report = match command {
        Command::Freq { hz: None } => {
            let hz = client.get_frequency().await?;
            Report {
                text: hz.to_string(),
                json: json!({ "frequency_hz": hz }),
            }
        }
        Command::Freq { hz: Some(hz) } => {
            client.set_frequency(hz).await?;
            ack()
        }
        Command::Demod { mode: None, .. } => {
            let (mode, bandwidth) = client.get_demodulator().await?;
            Report {
                text: format!("{mode} {bandwidth}"),
                json: json!({ "mode": mode, "bandwidth_hz": bandwidth }),
            }
        }
        Command::Demod {
            mode: Some(mode),
            bandwidth,
        } => {
            validate_mode(&mode)?;
            let bandwidth = bandwidth
                .or_else(|| cfg.presets.bandwidth_for(&mode))
                .ok_or_else(|| {
                    GqrxError::Validation(format!(
                        "no bandwidth given and no preset for mode {mode}"
                    ))
                })?;
            client.set_demodulator(&mode, bandwidth).await?;
            ack()
        }
        Command::Strength => {
            let level = client.get_signal_strength().await?;
            Report {
                text: format!("{level:.1}"),
                json: json!({ "strength_dbfs": level }),
            }
        }
        Command::Squelch { level: None } => {
            let level = client.get_squelch().await?;
            Report {
                text: format!("{level:.1}"),
                json: json!({ "squelch_dbfs": level }),
            }
        }
        Command::Squelch { level: Some(level) } => {
            client.set_squelch(level).await?;
            ack()
        }
        Command::Mute { state: None } => {
            let muted = client.get_mute().await?;
            Report {
                text: on_off(muted).to_string(),
                json: json!({ "muted": muted }),
            }
        }
        Command::Mute { state: Some(state) } => {
            client.set_mute(parse_switch(&state)?).await?;
            ack()
        }
        Command::Dsp { state: None } => {
            let running = client.get_dsp_running().await?;
            Report {
                text: on_off(running).to_string(),
                json: json!({ "dsp_running": running }),
            }
        }
        Command::Dsp { state: Some(state) } => {
            client.set_dsp_running(parse_switch(&state)?).await?;
            ack()
        }
        Command::Raw {
            lines: None,
            command,
        } => {
            let reply = client.send_raw(&command.join(" ")).await?;
            Report {
                json: json!({ "reply": reply }),
                text: reply,
            }
        }
        Command::Raw {
            lines: Some(count),
            command,
        } => {
            let lines = client.send_raw_lines(&command.join(" "), count).await?;
            Report {
                text: lines.join("\n"),
                json: json!({ "reply": lines }),
            }
        }
        Command::Bookmark { action } => bookmark_action(client, cfg, action).await?,
        Command::Modes => modes_report(cfg),
        Command::Monitor => {
            return Err(GqrxError::Validation(
                "monitor is not a single-shot command".to_string(),
            ))
        }
    };
    Ok(report)
}

async fn bookmark_action(
    client: &GqrxClient,
    cfg: &ClientConfig,
    action: BookmarkAction,
) -> Result<Report, GqrxError> {
    match action {
        BookmarkAction::List => Ok(bookmarks_report(cfg)),
        BookmarkAction::Tune { name } => {
            let bookmark = cfg.bookmark(&name).ok_or_else(|| {
                GqrxError::Validation(format!("no bookmark named '{name}'"))
            })?;
            let bandwidth = bookmark.resolved_bandwidth(&cfg.presets).ok_or_else(|| {
                GqrxError::Validation(format!(
                    "bookmark '{name}' has no bandwidth and mode {} has no preset",
                    bookmark.mode
                ))
            })?;
            client.set_demodulator(&bookmark.mode, bandwidth).await?;
            client.set_frequency(bookmark.frequency_hz).await?;
            info!(
                "Tuned to bookmark '{}': {} Hz {} {} Hz",
                name, bookmark.frequency_hz, bookmark.mode, bandwidth
            );
            Ok(ack())
        }
        BookmarkAction::Capture { name } => {
            let (mode, bandwidth) = client.get_demodulator().await?;
            let frequency_hz = client.get_frequency().await?;
            let bookmark = Bookmark {
                frequency_hz,
                mode,
                bandwidth: Some(bandwidth),
            };
            Ok(Report {
                text: bookmark.to_toml(&name),
                json: json!({
                    "name": name,
                    "frequency_hz": bookmark.frequency_hz,
                    "mode": bookmark.mode,
                    "bandwidth_hz": bandwidth,
                }),
            })
        }
    }
}

/// Poll the receiver until Ctrl+C. The signal also interrupts a poll round
/// that is still waiting on replies.
async fn monitor(client: &GqrxClient, poll: Duration, as_json: bool) -> Result<(), GqrxError> {
    info!("Monitoring every {:?}, Ctrl+C to stop", poll);
    let mut interval = time::interval(poll);
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let round = async {
            interval.tick().await;
            poll_round(client).await
        };
        let report = tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl+C received, stopping monitor");
                return Ok(());
            }
            report = round => report?,
        };
        report.print(as_json);
    }
}

async fn poll_round(client: &GqrxClient) -> Result<Report, GqrxError> {
    let hz = client.get_frequency().await?;
    let (mode, bandwidth) = client.get_demodulator().await?;
    let strength = client.get_signal_strength().await?;
    Ok(Report {
        text: format!("{hz} Hz  {mode} {bandwidth} Hz  {strength:.1} dBFS"),
        json: json!({
            "frequency_hz": hz,
            "mode": mode,
            "bandwidth_hz": bandwidth,
            "strength_dbfs": strength,
        }),
    })
}

fn bookmarks_report(cfg: &ClientConfig) -> Report {
    let text = cfg
        .bookmarks
        .iter()
        .map(|(name, b)| match b.resolved_bandwidth(&cfg.presets) {
            Some(bw) => format!("{name} {} {} {bw}", b.frequency_hz, b.mode),
            None => format!("{name} {} {}", b.frequency_hz, b.mode),
        })
        .collect::<Vec<_>>()
        .join("\n");
    let json = json!(cfg
        .bookmarks
        .iter()
        .map(|(name, b)| json!({
            "name": name,
            "frequency_hz": b.frequency_hz,
            "mode": b.mode,
            "bandwidth_hz": b.resolved_bandwidth(&cfg.presets),
        }))
        .collect::<Vec<_>>());
    Report { text, json }
}

fn modes_report(cfg: &ClientConfig) -> Report {
    let entries: Vec<(&str, Option<i64>)> = DEMOD_MODES
        .iter()
        .map(|mode| (*mode, cfg.presets.bandwidth_for(mode)))
        .collect();
    let text = entries
        .iter()
        .map(|(mode, bw)| match bw {
            Some(bw) => format!("{mode} {bw}"),
            None => mode.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    let json = json!(entries
        .iter()
        .map(|(mode, bw)| json!({ "mode": mode, "bandwidth_hz": bw }))
        .collect::<Vec<_>>());
    Report { text, json }
}

fn ack() -> Report {
    Report {
        text: "ok".to_string(),
        json: json!({ "ok": true }),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn parse_switch(s: &str) -> Result<bool, GqrxError> {
    if is_true(s) {
        Ok(true)
    } else if is_false(s) {
        Ok(false)
    } else {
        Err(GqrxError::Validation(format!(
            "expected on/off (or 1/0), got '{s}'"
        )))
    }
}

fn is_true(s: &str) -> bool {
    matches!(s, "1" | "on" | "ON" | "true" | "True" | "TRUE")
}

fn is_false(s: &str) -> bool {
    matches!(s, "0" | "off" | "OFF" | "false" | "False" | "FALSE")
}

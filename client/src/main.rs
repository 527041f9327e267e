// Terminal race-timing client: reads commands from stdin and renders updates to stdout.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use race_timing_client::app::{self, AppContext};
use race_timing_client::constants::{COMMAND_CHANNEL_CAPACITY, UI_CHANNEL_CAPACITY};
use race_timing_client::http::RaceApi;
use race_timing_client::settings::ClientSettings;
use race_timing_client::stream::HttpEventChannel;
use race_timing_client::ui::{UiUpdate, UserCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = ClientSettings::from_env();
    info!(server = %settings.server_url, tick_ms = settings.clock_tick.as_millis() as u64, "starting race client");

    let api = RaceApi::new(&settings).context("failed to build HTTP client")?;
    let channel = Arc::new(HttpEventChannel::new(api.clone()));
    let (ui_tx, ui_rx) = mpsc::channel(UI_CHANNEL_CAPACITY);
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (ctx, inbox) = AppContext::new(&settings, api, channel, ui_tx);

    let renderer = tokio::spawn(render_loop(ui_rx, settings.json_output));
    tokio::spawn(read_commands(cmd_tx));

    app::run(ctx, inbox, cmd_rx).await;
    renderer.await.context("renderer task failed")?;
    Ok(())
}

async fn read_commands(tx: mpsc::Sender<UserCommand>) {
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match UserCommand::parse(&line) {
            Some(command) => {
                // Stop reading after quit; a pending stdin read would hold up runtime shutdown.
                let quit = command == UserCommand::Quit;
                if tx.send(command).await.is_err() || quit {
                    break;
                }
            }
            None => warn!(input = %line.trim(), "unknown command (start <name> <laps>, reset, reconnect, focus, config, quit)"),
        }
    }
}

async fn render_loop(mut rx: mpsc::Receiver<UiUpdate>, json: bool) {
    let mut stdout = std::io::stdout();
    let mut timer_line = false;
    while let Some(update) = rx.recv().await {
        if json {
            if let Ok(line) = serde_json::to_string(&update) {
                let _ = writeln!(stdout, "{}", line);
            }
            continue;
        }
        if let UiUpdate::Timer { elapsed } = &update {
            let _ = write!(stdout, "\r{}", elapsed);
            let _ = stdout.flush();
            timer_line = true;
            continue;
        }
        if timer_line {
            let _ = writeln!(stdout);
            timer_line = false;
        }
        for line in render_text(&update) {
            let _ = writeln!(stdout, "{}", line);
        }
    }
}

fn render_text(update: &UiUpdate) -> Vec<String> {
    match update {
        UiUpdate::Lifecycle {
            to, start_enabled, ..
        } => vec![format!(
            "[race] {} (start {})",
            to,
            if *start_enabled { "enabled" } else { "disabled" }
        )],
        UiUpdate::LapsCleared => vec!["[laps] cleared".to_string()],
        UiUpdate::LapAppended {
            sequence,
            segment,
            cumulative,
            ..
        } => vec![format!("[lap {:>2}] {}  total {}", sequence, segment, cumulative)],
        UiUpdate::Timer { elapsed } => vec![elapsed.clone()],
        UiUpdate::TimerLocked { elapsed } => vec![format!("[time] {}", elapsed)],
        UiUpdate::Connection {
            status,
            reconnect_attempts,
        } => vec![format!(
            "[stream] {} (attempts {})",
            status.as_str(),
            reconnect_attempts
        )],
        UiUpdate::ResultHidden => Vec::new(),
        UiUpdate::Result(view) => vec![format!(
            "[result] {}  avg {}s  rank {}",
            view.driver, view.average, view.rank
        )],
        UiUpdate::Leaderboard { entries } => {
            let mut lines = vec!["[leaderboard]".to_string()];
            lines.extend(entries.iter().map(|row| {
                format!("  {:>3}  {:<20} {:>3} laps  {}s", row.rank, row.name, row.laps, row.average)
            }));
            lines
        }
        UiUpdate::Status { message } => vec![format!("[status] {}", message)],
        UiUpdate::Error { messages } => messages.iter().map(|m| format!("[error] {}", m)).collect(),
        UiUpdate::Config {
            min_laps,
            max_laps,
            default_laps,
        } => vec![format!(
            "[config] laps {}..={} (default {})",
            min_laps, max_laps, default_laps
        )],
    }
}

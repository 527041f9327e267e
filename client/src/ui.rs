// Messages exchanged with the UI shell: render updates out, user commands in.

use serde::Serialize;

use timing_core::backoff::ConnectionStatus;
use timing_core::lifecycle::RaceState;

use crate::results::{LeaderboardRow, ResultView};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiUpdate {
    Lifecycle {
        from: RaceState,
        to: RaceState,
        start_enabled: bool,
    },
    LapsCleared,
    /// Appended after the previous row; earlier rows never change.
    LapAppended {
        sequence: u32,
        segment: String,
        cumulative: String,
        segment_ms: u64,
        cumulative_ms: u64,
    },
    Timer {
        elapsed: String,
    },
    TimerLocked {
        elapsed: String,
    },
    Connection {
        status: ConnectionStatus,
        reconnect_attempts: u32,
    },
    ResultHidden,
    Result(ResultView),
    Leaderboard {
        entries: Vec<LeaderboardRow>,
    },
    Status {
        message: String,
    },
    Error {
        messages: Vec<String>,
    },
    Config {
        min_laps: u32,
        max_laps: u32,
        default_laps: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserCommand {
    /// Raw form input; `laps` may be empty to use the server default.
    Start { name: String, laps: String },
    Reset,
    Reconnect,
    FocusRegained,
    ReloadConfig,
    Quit,
}

impl UserCommand {
    /// Parses one input line. The last token of `start` is the lap count, the rest is the name.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let command = tokens.next()?.to_ascii_lowercase();
        match command.as_str() {
            "start" => {
                let mut rest: Vec<&str> = tokens.collect();
                let laps = if rest.len() >= 2 {
                    rest.pop().unwrap_or_default().to_string()
                } else {
                    String::new()
                };
                Some(UserCommand::Start {
                    name: rest.join(" "),
                    laps,
                })
            }
            "reset" => Some(UserCommand::Reset),
            "reconnect" => Some(UserCommand::Reconnect),
            "focus" => Some(UserCommand::FocusRegained),
            "config" => Some(UserCommand::ReloadConfig),
            "quit" | "exit" => Some(UserCommand::Quit),
            _ => None,
        }
    }
}

//! Text commands exposed to a front end
//!
//! All commands follow the pattern:
//! - Parse from one line of input via `FromStr`
//! - Run against AppState in `dispatch`
//! - Return Result<String, AppError> with a printable reply

use crate::app::AppState;
use crate::config::{MAX_DAILY_TARGET_SECONDS, RECENT_TAGS_LIMIT};
use crate::display;
use crate::error::Result;
use crate::services::{TimerMode, TimerSnapshot, TimerState};
use chrono::Local;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    Pause,
    Resume,
    Toggle,
    /// `end [description] [| remarks]`
    End {
        description: String,
        remarks: String,
    },
    Switch,
    Status,
    Today,
    Tags(String),
    /// Daily target in minutes
    Target(i64),
    Mode(TimerMode),
    Reset(u32),
    Hotkey(bool),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, rest) = match s.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (s, ""),
        };

        match verb.to_lowercase().as_str() {
            "start" => Ok(Command::Start(rest.to_string())),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "toggle" => Ok(Command::Toggle),
            "end" | "stop" => {
                let (description, remarks) = match rest.split_once('|') {
                    Some((d, r)) => (d.trim(), r.trim()),
                    None => (rest, ""),
                };
                Ok(Command::End {
                    description: description.to_string(),
                    remarks: remarks.to_string(),
                })
            }
            "switch" => Ok(Command::Switch),
            "status" | "" => Ok(Command::Status),
            "today" => Ok(Command::Today),
            "tags" => Ok(Command::Tags(rest.to_string())),
            "target" => rest
                .parse::<i64>()
                .ok()
                .filter(|m| (0..=MAX_DAILY_TARGET_SECONDS / 60).contains(m))
                .map(Command::Target)
                .ok_or_else(|| format!("Invalid target minutes: '{}'", rest)),
            "mode" => match rest.to_lowercase().as_str() {
                "target" | "target_time" => Ok(Command::Mode(TimerMode::TargetTime)),
                "stopwatch" => Ok(Command::Mode(TimerMode::Stopwatch)),
                other => Err(format!(
                    "Invalid mode '{}'. Use 'target' or 'stopwatch'",
                    other
                )),
            },
            "reset" => rest
                .parse::<u32>()
                .ok()
                .filter(|h| *h <= 23)
                .map(Command::Reset)
                .ok_or_else(|| format!("Invalid reset hour: '{}'", rest)),
            "hotkey" => match rest.to_lowercase().as_str() {
                "on" => Ok(Command::Hotkey(true)),
                "off" => Ok(Command::Hotkey(false)),
                other => Err(format!("Invalid hotkey value '{}'. Use 'on' or 'off'", other)),
            },
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{}'. Type 'help'", other)),
        }
    }
}

pub const HELP: &str = "\
start <tag>            start a session
pause | resume | toggle
end [desc] [| remarks] end the current session
switch                 end the session and pick a new tag
status | today         show progress / today's sessions
tags [query]           search tags (recent when empty)
target <minutes>       set the daily target
mode target|stopwatch  set the status mode
reset <hour>           set the day reset hour
hotkey on|off          enable or disable global hotkeys
quit";

/// Apply `command` and describe the outcome
pub async fn dispatch(state: &AppState, command: Command) -> Result<String> {
    let engine = &state.engine;

    tracing::debug!("Dispatching {:?}", command);

    let reply = match command {
        Command::Start(tag) => match engine.start(&tag) {
            Some(session) => format!("Started '{}'", session.tag),
            None => describe(&engine.snapshot()),
        },
        Command::Pause => {
            engine.pause();
            describe(&engine.snapshot())
        }
        Command::Resume => {
            engine.resume();
            describe(&engine.snapshot())
        }
        Command::Toggle => {
            engine.toggle_pause();
            describe(&engine.snapshot())
        }
        Command::End {
            description,
            remarks,
        } => match engine.end(&description, &remarks) {
            Some(session) => format!(
                "Ended '{}' after {}",
                session.tag,
                display::format_long(session.duration_seconds)
            ),
            None => "No session running".to_string(),
        },
        Command::Switch => {
            let ended = engine.switch_task();
            let suggestions: Vec<String> = engine
                .recent_tags(RECENT_TAGS_LIMIT)
                .into_iter()
                .map(|t| t.name)
                .collect();
            match ended {
                Some(session) => format!(
                    "Ended '{}'. Next tag? [{}]",
                    session.tag,
                    suggestions.join(", ")
                ),
                None => format!("Next tag? [{}]", suggestions.join(", ")),
            }
        }
        Command::Status => describe(&engine.snapshot()),
        Command::Today => {
            let sessions = engine.today_sessions();
            if sessions.is_empty() {
                "No sessions today".to_string()
            } else {
                sessions
                    .iter()
                    .map(|s| {
                        let length = if s.is_active() {
                            "running".to_string()
                        } else {
                            display::format_long(s.duration_seconds)
                        };
                        format!(
                            "{}  {:<30}  {}",
                            s.start.with_timezone(&Local).format("%H:%M"),
                            s.tag,
                            length
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Tags(query) => {
            let names: Vec<String> = engine
                .filter_tags(&query)
                .into_iter()
                .map(|t| t.name)
                .collect();
            if names.is_empty() {
                "No matching tags".to_string()
            } else {
                names.join(", ")
            }
        }
        Command::Target(minutes) => {
            let mut settings = engine.settings();
            settings.daily_target_seconds = minutes.saturating_mul(60);
            engine.update_settings(settings).await;
            format!("Daily target set to {}", engine.settings().daily_target_formatted())
        }
        Command::Mode(mode) => {
            let mut settings = engine.settings();
            settings.timer_mode = mode;
            engine.update_settings(settings).await;
            format!("Mode set to {}", mode.display_name())
        }
        Command::Reset(hour) => {
            let mut settings = engine.settings();
            settings.day_reset_hour = hour;
            engine.update_settings(settings).await;
            format!("Day resets at {}", engine.settings().reset_time_formatted())
        }
        Command::Hotkey(enabled) => {
            let mut settings = engine.settings();
            settings.hotkey_enabled = enabled;
            engine.update_settings(settings).await;
            format!("Hotkeys {}", if enabled { "enabled" } else { "disabled" })
        }
        Command::Help => HELP.to_string(),
        Command::Quit => {
            engine.flush().await?;
            "Bye".to_string()
        }
    };

    Ok(reply)
}

fn describe(snapshot: &TimerSnapshot) -> String {
    let today = format!("today {}", snapshot.status_text);
    match (&snapshot.state, &snapshot.current_session) {
        (TimerState::Running, Some(session)) => {
            format!("{} {} | {}", session.tag, snapshot.elapsed_text, today)
        }
        (TimerState::Paused, Some(session)) => {
            format!("{} {} (paused) | {}", session.tag, snapshot.elapsed_text, today)
        }
        _ => format!("idle | {}", today),
    }
}

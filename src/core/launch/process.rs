// ─── Process Supervisor ───
// Spawns the game detached from the launcher, turns its output into log and
// progress events, and reports the exit code.

use std::process::Stdio;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::command::LaunchCommand;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{
    emit_log, EventSink, ExitEvent, LauncherEvent, LogLevel, ProgressCategory, ProgressEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProgress {
    pub label: String,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClass {
    pub level: LogLevel,
    pub progress: Option<LineProgress>,
}

/// `Exception` counts unless every occurrence is followed by a zero code.
fn has_nonzero_exception(line: &str) -> bool {
    line.match_indices("Exception").any(|(at, word)| {
        let rest = line[at + word.len()..].trim_start_matches(|c: char| c == ':' || c.is_whitespace());
        !rest.starts_with('0')
    })
}

fn is_crash_report(line: &str) -> bool {
    line.contains("Crash Report")
}

fn is_fatal(line: &str) -> bool {
    line.contains("FATAL")
}

fn is_error(line: &str) -> bool {
    line.contains("ERROR")
}

fn is_warning(line: &str) -> bool {
    line.contains("WARN")
}

type LevelRule = (fn(&str) -> bool, LogLevel);

/// Checked in order; the first match decides.
const LEVEL_RULES: [LevelRule; 5] = [
    (is_crash_report, LogLevel::Error),
    (is_fatal, LogLevel::Error),
    (is_error, LogLevel::Error),
    (has_nonzero_exception, LogLevel::Error),
    (is_warning, LogLevel::Warn),
];

fn percent_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z][A-Za-z ]*?)\s*:\s*(\d{1,3})%").ok())
        .as_ref()
}

fn loading_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Loading \((\d+)/(\d+)\)").ok())
        .as_ref()
}

fn parse_progress(line: &str) -> Option<LineProgress> {
    if let Some(caps) = percent_pattern().and_then(|re| re.captures(line)) {
        let percent: u32 = caps[2].parse().ok()?;
        return Some(LineProgress {
            label: caps[1].trim().to_string(),
            percent: percent.min(100) as u8,
        });
    }
    let caps = loading_pattern()?.captures(line)?;
    let done: u64 = caps[1].parse().ok()?;
    let total: u64 = caps[2].parse().ok()?;
    if total == 0 {
        return None;
    }
    Some(LineProgress {
        label: "Loading".into(),
        percent: ((done.min(total) * 100) / total) as u8,
    })
}

/// Log level and optional progress for one stdout line of the game.
pub fn classify_line(line: &str) -> LineClass {
    let level = LEVEL_RULES
        .iter()
        .find(|(matches, _)| matches(line))
        .map(|(_, level)| *level)
        .unwrap_or(LogLevel::Info);
    LineClass {
        level,
        progress: parse_progress(line),
    }
}

fn platform_command(cmd: &LaunchCommand) -> std::process::Command {
    let mut command = std::process::Command::new(&cmd.java);
    command
        .args(cmd.args())
        .current_dir(&cmd.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }
    command
}

/// A running game. Dropping it does not kill the process.
pub struct GameProcess {
    pub pid: Option<u32>,
    handle: JoinHandle<Option<i32>>,
}

impl GameProcess {
    /// Exit code once the process has ended and a `Closed` event was emitted.
    pub async fn wait(self) -> Option<i32> {
        self.handle.await.ok().flatten()
    }
}

async fn pump<R>(reader: R, sink: Arc<dyn EventSink>, instance_id: String, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            emit_log(&*sink, Some(&instance_id), LogLevel::Error, line);
            continue;
        }
        let class = classify_line(&line);
        if let Some(p) = class.progress {
            sink.progress(
                ProgressEvent::percent(ProgressCategory::Game, p.percent)
                    .with_label(p.label)
                    .for_instance(instance_id.clone()),
            );
        }
        emit_log(&*sink, Some(&instance_id), class.level, line);
    }
}

pub fn spawn_game(
    cmd: &LaunchCommand,
    instance_id: &str,
    sink: Arc<dyn EventSink>,
) -> LauncherResult<GameProcess> {
    info!("Launching {} with {:?}", cmd.main_class, cmd.java);
    debug!("Arguments: {:?}", cmd.args());

    let mut child = tokio::process::Command::from(platform_command(cmd))
        .spawn()
        .map_err(|e| LauncherError::io(&cmd.java, e))?;
    let pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let id = instance_id.to_string();

    let handle = tokio::spawn(async move {
        let out_task = stdout.map(|s| tokio::spawn(pump(s, sink.clone(), id.clone(), false)));
        let err_task = stderr.map(|s| tokio::spawn(pump(s, sink.clone(), id.clone(), true)));

        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                emit_log(&*sink, Some(&id), LogLevel::Error, format!("wait failed: {}", e));
                None
            }
        };
        if let Some(t) = out_task {
            let _ = t.await;
        }
        if let Some(t) = err_task {
            let _ = t.await;
        }

        info!("Instance {} exited with {:?}", id, code);
        sink.emit(LauncherEvent::Closed(ExitEvent {
            instance_id: id,
            code,
        }));
        code
    });

    Ok(GameProcess { pid, handle })
}

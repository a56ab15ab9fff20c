// ─── Events ───
// One-way notification channel from the engine to whatever hosts it.
// Emitting never blocks and never fails from the caller's point of view.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressCategory {
    Java,
    Minecraft,
    Assets,
    Libraries,
    Loader,
    Modpack,
    Hash,
    Detect,
    Game,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub category: ProgressCategory,
    pub current: u64,
    pub total: u64,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl ProgressEvent {
    pub fn counted(category: ProgressCategory, current: u64, total: u64) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((current.min(total) * 100) / total) as u8
        };
        Self {
            category,
            current,
            total,
            percent,
            label: None,
            instance_id: None,
        }
    }

    pub fn percent(category: ProgressCategory, percent: u8) -> Self {
        let percent = percent.min(100);
        Self {
            category,
            current: percent as u64,
            total: 100,
            percent,
            label: None,
            instance_id: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn for_instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitEvent {
    pub instance_id: String,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LauncherEvent {
    Progress(ProgressEvent),
    Log(LogEvent),
    Closed(ExitEvent),
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LauncherEvent);

    fn progress(&self, event: ProgressEvent) {
        self.emit(LauncherEvent::Progress(event));
    }
}

pub fn emit_log(
    sink: &dyn EventSink,
    instance_id: Option<&str>,
    level: LogLevel,
    message: impl Into<String>,
) {
    sink.emit(LauncherEvent::Log(LogEvent {
        instance_id: instance_id.map(str::to_string),
        level,
        message: message.into(),
    }));
}

/// Forwards events into `tracing`. Used by the CLI.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LauncherEvent) {
        match event {
            LauncherEvent::Progress(p) => info!(
                target: "blocklaunch::progress",
                "[{:?}] {}/{} ({}%) {}",
                p.category,
                p.current,
                p.total,
                p.percent,
                p.label.unwrap_or_default()
            ),
            LauncherEvent::Log(l) => {
                let id = l.instance_id.unwrap_or_default();
                match l.level {
                    LogLevel::Info => info!(target: "blocklaunch::game", "[{}] {}", id, l.message),
                    LogLevel::Warn => warn!(target: "blocklaunch::game", "[{}] {}", id, l.message),
                    LogLevel::Error => error!(target: "blocklaunch::game", "[{}] {}", id, l.message),
                }
            }
            LauncherEvent::Closed(e) => info!(
                target: "blocklaunch::game",
                "Instance {} closed with code {:?}",
                e.instance_id,
                e.code
            ),
        }
    }
}

/// Pushes events into an unbounded channel. A dropped receiver is ignored.
pub struct ChannelSink {
    tx: UnboundedSender<LauncherEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<LauncherEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LauncherEvent) {
        let _ = self.tx.send(event);
    }
}

pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LauncherEvent) {}
}

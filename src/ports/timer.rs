//! 计时器意图端口 - 把贪睡/停止意图转交给计时器子系统

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::payload::ParsedNotification;

/// 计时器意图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerIntent {
    /// Restart the timer for another round.
    Snooze,
    /// Cancel the timer for good.
    Stop,
}

impl std::fmt::Display for TimerIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimerIntent::Snooze => "snooze",
            TimerIntent::Stop => "stop",
        };
        write!(f, "{s}")
    }
}

/// 计时器意图端口
pub trait TimerIntentPort: Send + Sync {
    /// Forward an intent together with the notification that triggered it.
    fn submit_intent(&self, intent: TimerIntent, source: &ParsedNotification) -> Result<()>;
}

/// 意图记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerIntentRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    pub intent: TimerIntent,
    /// 触发意图的通知
    pub notification: ParsedNotification,
}

/// 把意图追加到 JSONL 文件的实现
///
/// 计时器子系统从该文件消费意图；写入端只负责追加。
pub struct FileTimerIntentSink {
    path: PathBuf,
}

impl FileTimerIntentSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 读取全部已记录的意图（消费端与测试用）
    pub fn read_all(&self) -> Vec<TimerIntentRecord> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl TimerIntentPort for FileTimerIntentSink {
    fn submit_intent(&self, intent: TimerIntent, source: &ParsedNotification) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = TimerIntentRecord {
            ts: Utc::now(),
            intent,
            notification: source.clone(),
        };

        // 打开文件并加锁
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let mut file = file;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
        file.unlock()?;

        debug!(intent = %intent, "timer intent submitted");
        Ok(())
    }
}

//! 接收入口 - 把一次推送事件串成 解析 → 分类 → 分发 的完整流水线

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::action::{ActionEvent, ActionRouter};
use crate::dispatch::EffectDispatcher;
use crate::lifecycle;
use crate::payload::{self, RawPayload};
use crate::ports::{BundleSoundPlayer, FileBadgeCounter, FileTimerIntentSink};
use crate::report::DispatchReport;
use crate::store::{DispatchRecord, ReportStore};

/// 事件携带的用户动作描述
///
/// Category is optional here: platforms that omit it fall back to the
/// category parsed out of the payload itself.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub action_identifier: String,
    pub category_id: Option<String>,
}

/// 一次完整的推送接收事件
#[derive(Debug, Clone)]
pub struct IntakeEvent {
    /// 原始 payload（未经校验）
    pub payload: RawPayload,
    /// 收到时应用是否在前台活跃
    pub app_was_active: bool,
    /// 是否由点击通知启动了应用
    pub launched_from_notification: bool,
    /// 用户动作（没有点击时为 None）
    pub action: Option<ActionDescriptor>,
}

/// 推送接收器 - 解析、分类、分发并记录历史
pub struct PushIntake {
    dispatcher: EffectDispatcher,
    store: Option<ReportStore>,
}

impl PushIntake {
    /// 处理一次推送事件，总是产出报告
    pub fn handle(&self, event: &IntakeEvent) -> DispatchReport {
        let notification = payload::parse(&event.payload);
        let context =
            lifecycle::classify(event.app_was_active, event.launched_from_notification);

        let action = event.action.as_ref().map(|desc| ActionEvent {
            category_id: desc
                .category_id
                .clone()
                .or_else(|| notification.category_id.clone())
                .unwrap_or_default(),
            action_identifier: desc.action_identifier.clone(),
            notification: notification.clone(),
        });

        let report = self
            .dispatcher
            .dispatch(&notification, context, action.as_ref());

        if let Some(store) = &self.store {
            let record = DispatchRecord::from_report(&report, notification.category_id.clone());
            if let Err(e) = store.append(&record) {
                warn!(error = %e, "failed to append dispatch record");
            }
        }

        report
    }

    pub fn dispatcher(&self) -> &EffectDispatcher {
        &self.dispatcher
    }
}

/// 接收器构建器 - 自动检测配置并接好文件端口
pub struct IntakeBuilder {
    sound_dir: Option<PathBuf>,
    player: Option<PathBuf>,
    badge_file: Option<PathBuf>,
    intents_file: Option<PathBuf>,
    history_file: Option<PathBuf>,
    keep_history: bool,
    dry_run: bool,
    router: ActionRouter,
}

impl IntakeBuilder {
    pub fn new() -> Self {
        Self {
            sound_dir: None,
            player: None,
            badge_file: None,
            intents_file: None,
            history_file: None,
            keep_history: true,
            dry_run: false,
            router: ActionRouter::default(),
        }
    }

    /// 声音文件目录
    pub fn sound_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sound_dir = Some(dir.into());
        self
    }

    /// 播放器命令（默认自动探测）
    pub fn player(mut self, player: impl Into<PathBuf>) -> Self {
        self.player = Some(player.into());
        self
    }

    /// 角标计数文件
    pub fn badge_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.badge_file = Some(path.into());
        self
    }

    /// 计时器意图文件
    pub fn intents_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.intents_file = Some(path.into());
        self
    }

    /// 历史记录文件
    pub fn history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_file = Some(path.into());
        self
    }

    /// 是否记录分发历史
    pub fn keep_history(mut self, keep: bool) -> Self {
        self.keep_history = keep;
        self
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 替换路由表
    pub fn router(mut self, router: ActionRouter) -> Self {
        self.router = router;
        self
    }

    /// 构建 PushIntake（自动检测配置文件）
    pub fn build(self) -> Result<PushIntake> {
        let config = Self::detect_config()?;

        let base = Self::config_home();
        let sound_dir = self
            .sound_dir
            .or_else(|| config.as_ref().and_then(|c| Self::extract_path(c, "sound_dir")))
            .unwrap_or_else(|| base.join("sounds"));
        let badge_file = self
            .badge_file
            .or_else(|| config.as_ref().and_then(|c| Self::extract_path(c, "badge_file")))
            .unwrap_or_else(|| base.join("badge"));
        let intents_file = self
            .intents_file
            .or_else(|| config.as_ref().and_then(|c| Self::extract_path(c, "intents_file")))
            .unwrap_or_else(|| base.join("timer_intents.jsonl"));
        let player = self
            .player
            .or_else(|| config.as_ref().and_then(|c| Self::extract_path(c, "player")));

        info!(
            sound_dir = %sound_dir.display(),
            dry_run = self.dry_run,
            "building push intake"
        );

        let mut sound = BundleSoundPlayer::new(sound_dir);
        if let Some(player) = player {
            sound = sound.with_player(player);
        }

        let dispatcher = EffectDispatcher::new(
            Arc::new(sound),
            Arc::new(FileBadgeCounter::new(badge_file)),
            Arc::new(FileTimerIntentSink::new(intents_file)),
        )
        .with_router(self.router)
        .with_dry_run(self.dry_run);

        // dry-run 不留历史
        let store = if self.keep_history && !self.dry_run {
            Some(
                self.history_file
                    .map(ReportStore::at)
                    .unwrap_or_else(ReportStore::default_location),
            )
        } else {
            None
        };

        Ok(PushIntake { dispatcher, store })
    }

    /// 配置与状态文件的根目录
    fn config_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("pushbell")
    }

    /// 检测配置文件
    fn detect_config() -> Result<Option<serde_json::Value>> {
        let config_path = Self::config_home().join("config.json");

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path)?;
        let config: serde_json::Value = serde_json::from_str(&content)?;
        Ok(Some(config))
    }

    /// 提取路径型配置项
    fn extract_path(config: &serde_json::Value, key: &str) -> Option<PathBuf> {
        config
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for IntakeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{StepName, StepOutcome};
    use serde_json::json;

    #[test]
    fn test_builder_default() {
        let builder = IntakeBuilder::new();
        assert!(!builder.dry_run);
        assert!(builder.keep_history);
        assert!(builder.sound_dir.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let builder = IntakeBuilder::new()
            .sound_dir("/tmp/sounds")
            .dry_run(true)
            .keep_history(false);

        assert!(builder.dry_run);
        assert!(!builder.keep_history);
        assert_eq!(builder.sound_dir, Some(PathBuf::from("/tmp/sounds")));
    }

    #[test]
    fn test_extract_path() {
        let config = json!({"sound_dir": "/var/sounds", "player": "  ", "badge_file": 3});
        assert_eq!(
            IntakeBuilder::extract_path(&config, "sound_dir"),
            Some(PathBuf::from("/var/sounds"))
        );
        // 空白与非字符串值都按缺失处理
        assert_eq!(IntakeBuilder::extract_path(&config, "player"), None);
        assert_eq!(IntakeBuilder::extract_path(&config, "badge_file"), None);
        assert_eq!(IntakeBuilder::extract_path(&config, "missing"), None);
    }

    fn built_intake(dir: &std::path::Path) -> PushIntake {
        IntakeBuilder::new()
            .sound_dir(dir.join("sounds"))
            .player("/bin/true")
            .badge_file(dir.join("badge"))
            .intents_file(dir.join("intents.jsonl"))
            .history_file(dir.join("dispatches.jsonl"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_handle_parses_classifies_and_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/ding.aiff"), b"x").unwrap();

        let intake = built_intake(dir.path());
        let report = intake.handle(&IntakeEvent {
            payload: json!({"aps": {"sound": "ding.aiff"}}),
            app_was_active: true,
            launched_from_notification: false,
            action: None,
        });

        assert!(report.succeeded(StepName::Intake));
        assert!(report.succeeded(StepName::SoundPlayback));
        // 历史已经落盘
        let store = ReportStore::at(dir.path().join("dispatches.jsonl"));
        assert_eq!(store.read_recent(10).len(), 1);
    }

    #[test]
    fn test_action_category_falls_back_to_payload() {
        let dir = tempfile::tempdir().unwrap();
        let intake = built_intake(dir.path());

        // 描述里没给 category，payload 里有
        let report = intake.handle(&IntakeEvent {
            payload: json!({"aps": {"category": "TIMER_EXPIRED"}}),
            app_was_active: false,
            launched_from_notification: false,
            action: Some(ActionDescriptor {
                action_identifier: "SNOOZE_ACTION".to_string(),
                category_id: None,
            }),
        });

        assert_eq!(report.effect, Some(crate::action::EffectName::Snooze));
        let sink = FileTimerIntentSink::new(dir.path().join("intents.jsonl"));
        assert_eq!(sink.read_all().len(), 1);
    }

    #[test]
    fn test_malformed_payload_still_produces_report() {
        let dir = tempfile::tempdir().unwrap();
        let intake = built_intake(dir.path());

        let report = intake.handle(&IntakeEvent {
            payload: json!("not an object"),
            app_was_active: true,
            launched_from_notification: false,
            action: None,
        });

        assert!(report.succeeded(StepName::Intake));
        match &report.step(StepName::SoundPlayback).unwrap().outcome {
            StepOutcome::Skipped(reason) => assert!(reason.contains("no sound")),
            other => panic!("expected Skipped, got {other:?}"),
        }
    }

    #[test]
    fn test_dry_run_builds_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let intake = IntakeBuilder::new()
            .sound_dir(dir.path().join("sounds"))
            .badge_file(dir.path().join("badge"))
            .intents_file(dir.path().join("intents.jsonl"))
            .history_file(dir.path().join("dispatches.jsonl"))
            .dry_run(true)
            .build()
            .unwrap();

        intake.handle(&IntakeEvent {
            payload: json!({"aps": {"sound": "ding.aiff"}}),
            app_was_active: true,
            launched_from_notification: false,
            action: None,
        });

        // dry-run 不写历史
        assert!(!dir.path().join("dispatches.jsonl").exists());
    }
}

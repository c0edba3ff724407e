//! 效果分发器 - 按生命周期场景执行副作用并产出报告
//!
//! Dispatch runs a fixed step sequence: intake, sound playback, action
//! routing, badge reset. Which steps apply depends on the delivery context;
//! every step that runs leaves a record. A failing port never aborts the
//! sequence, it only marks its own step as failed.

use std::sync::Arc;

use tracing::{info, warn};

use crate::action::{ActionEvent, ActionRouter, EffectName};
use crate::lifecycle::DeliveryContext;
use crate::payload::ParsedNotification;
use crate::ports::{BadgeResetPort, PlaybackOutcome, SoundPlaybackPort, TimerIntent, TimerIntentPort};
use crate::report::{DispatchReport, StepName, StepOutcome};

/// 效果分发器 - 持有路由表和三个副作用端口
pub struct EffectDispatcher {
    router: ActionRouter,
    sound: Arc<dyn SoundPlaybackPort>,
    badge: Arc<dyn BadgeResetPort>,
    timer: Arc<dyn TimerIntentPort>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl EffectDispatcher {
    pub fn new(
        sound: Arc<dyn SoundPlaybackPort>,
        badge: Arc<dyn BadgeResetPort>,
        timer: Arc<dyn TimerIntentPort>,
    ) -> Self {
        Self {
            router: ActionRouter::default(),
            sound,
            badge,
            timer,
            dry_run: false,
        }
    }

    /// 替换路由表
    pub fn with_router(mut self, router: ActionRouter) -> Self {
        self.router = router;
        self
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 当前路由表（只读视图）
    pub fn router(&self) -> &ActionRouter {
        &self.router
    }

    /// 执行一次分发
    ///
    /// Always returns a report; port failures are folded into step records
    /// instead of propagating.
    pub fn dispatch(
        &self,
        notification: &ParsedNotification,
        context: DeliveryContext,
        action: Option<&ActionEvent>,
    ) -> DispatchReport {
        let mut report = DispatchReport::new(context);

        // 第 1 步：intake，payload 已被接受，必然成功
        info!(
            context = %context,
            alert = notification.alert.as_deref().unwrap_or("<none>"),
            category = notification.category(),
            sound = notification.has_sound(),
            custom_fields = notification.custom_fields.len(),
            "notification accepted"
        );
        report.record(StepName::Intake, StepOutcome::Success);

        // 第 2 步：声音只在前台收到时播放
        if context == DeliveryContext::Foreground {
            report.record(StepName::SoundPlayback, self.play_sound(notification));
        }

        // 第 3 步：有用户动作时走路由
        if let Some(event) = action {
            let effect = self.router.route(event);
            report.effect = Some(effect);
            report.record(StepName::Action, self.perform_effect(effect, event));
        }

        // 第 4 步：后台点击把应用带回前台后清零角标
        if context == DeliveryContext::BackgroundTap {
            report.record(StepName::BadgeReset, self.reset_badge());
        }

        info!(summary = %report.summary(), "dispatch finished");
        report
    }

    fn play_sound(&self, notification: &ParsedNotification) -> StepOutcome {
        let Some(name) = notification.sound_file_name.as_deref() else {
            return StepOutcome::Skipped("payload carries no sound field".to_string());
        };

        if self.dry_run {
            eprintln!("[DRY-RUN] Would play sound: {name}");
            return StepOutcome::Skipped("dry-run".to_string());
        }

        match self.sound.play(name) {
            Ok(PlaybackOutcome::Played) => StepOutcome::Success,
            Ok(PlaybackOutcome::FileNotFound) => {
                warn!(file = %name, "sound file not found");
                StepOutcome::Failed(format!("sound file not found: {name}"))
            }
            Ok(PlaybackOutcome::PlaybackError(reason)) => {
                warn!(file = %name, reason = %reason, "sound playback failed");
                StepOutcome::Failed(reason)
            }
            Err(e) => {
                warn!(file = %name, error = %e, "sound port failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    fn perform_effect(&self, effect: EffectName, event: &ActionEvent) -> StepOutcome {
        match effect {
            // 打开 / 划掉 / 无动作都只记日志，没有外部副作用
            EffectName::Open | EffectName::Dismiss | EffectName::NoAction => {
                info!(
                    effect = %effect,
                    category = %event.category_id,
                    action = %event.action_identifier,
                    "action resolved"
                );
                StepOutcome::Success
            }
            EffectName::Snooze => self.submit_timer_intent(TimerIntent::Snooze, event),
            EffectName::Stop => self.submit_timer_intent(TimerIntent::Stop, event),
        }
    }

    fn submit_timer_intent(&self, intent: TimerIntent, event: &ActionEvent) -> StepOutcome {
        if self.dry_run {
            eprintln!("[DRY-RUN] Would submit timer intent: {intent}");
            return StepOutcome::Skipped("dry-run".to_string());
        }

        match self.timer.submit_intent(intent, &event.notification) {
            Ok(()) => StepOutcome::Success,
            Err(e) => {
                warn!(intent = %intent, error = %e, "timer intent submission failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    fn reset_badge(&self) -> StepOutcome {
        if self.dry_run {
            eprintln!("[DRY-RUN] Would reset badge count");
            return StepOutcome::Skipped("dry-run".to_string());
        }

        match self.badge.reset_badge_count() {
            Ok(()) => StepOutcome::Success,
            Err(e) => {
                warn!(error = %e, "badge reset failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

//! 分发报告 - 一次 dispatch 中每个副作用步骤的结构化结果
//!
//! The report is the dispatcher's only return value. Every step that ran
//! leaves a record; steps that did not apply to the delivery context leave
//! nothing. No wall-clock data lives here, so two identical dispatches
//! produce structurally equal reports.

use serde::{Deserialize, Serialize};

use crate::action::EffectName;
use crate::lifecycle::DeliveryContext;

/// 副作用步骤名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    /// Payload accepted and logged.
    Intake,
    /// Sound playback attempt.
    SoundPlayback,
    /// User action routed to an effect.
    Action,
    /// Badge count reset.
    BadgeReset,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Intake => "intake",
            StepName::SoundPlayback => "sound_playback",
            StepName::Action => "action",
            StepName::BadgeReset => "badge_reset",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单步结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step ran and its effect took hold.
    Success,
    /// The step was deliberately not performed.
    Skipped(String),
    /// The step ran and its effect did not take hold.
    Failed(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// 一条步骤记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepName,
    pub outcome: StepOutcome,
}

/// 一次 dispatch 的完整报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Delivery context the dispatch ran under.
    pub context: DeliveryContext,
    /// Effect the action step resolved to, when an action was present.
    pub effect: Option<EffectName>,
    /// Records for every step that ran, in execution order.
    pub steps: Vec<StepRecord>,
}

impl DispatchReport {
    pub fn new(context: DeliveryContext) -> Self {
        Self {
            context,
            effect: None,
            steps: Vec::new(),
        }
    }

    /// 追加一条步骤记录
    pub fn record(&mut self, step: StepName, outcome: StepOutcome) {
        self.steps.push(StepRecord { step, outcome });
    }

    /// Record for a given step, if that step ran.
    pub fn step(&self, name: StepName) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == name)
    }

    /// Whether a given step ran and succeeded.
    pub fn succeeded(&self, name: StepName) -> bool {
        self.step(name).map(|r| r.outcome.is_success()).unwrap_or(false)
    }

    /// True when no step recorded a failure.
    pub fn is_clean(&self) -> bool {
        !self.steps.iter().any(|r| r.outcome.is_failed())
    }

    /// 人类可读摘要，供历史记录与 CLI 输出
    pub fn summary(&self) -> String {
        let steps: Vec<String> = self
            .steps
            .iter()
            .map(|r| {
                let mark = match &r.outcome {
                    StepOutcome::Success => "ok".to_string(),
                    StepOutcome::Skipped(reason) => format!("skipped: {reason}"),
                    StepOutcome::Failed(reason) => format!("failed: {reason}"),
                };
                format!("{}={}", r.step, mark)
            })
            .collect();
        match self.effect {
            Some(effect) => format!("[{}] effect={} {}", self.context, effect, steps.join(" ")),
            None => format!("[{}] {}", self.context, steps.join(" ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_records_in_execution_order() {
        let mut report = DispatchReport::new(DeliveryContext::Foreground);
        report.record(StepName::Intake, StepOutcome::Success);
        report.record(StepName::SoundPlayback, StepOutcome::Failed("no player".to_string()));

        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[0].step, StepName::Intake);
        assert_eq!(report.steps[1].step, StepName::SoundPlayback);
        assert!(report.succeeded(StepName::Intake));
        assert!(!report.succeeded(StepName::SoundPlayback));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_absent_step_is_none_not_failure() {
        let mut report = DispatchReport::new(DeliveryContext::BackgroundTap);
        report.record(StepName::Intake, StepOutcome::Success);

        assert!(report.step(StepName::SoundPlayback).is_none());
        assert!(!report.succeeded(StepName::SoundPlayback));
        assert!(report.is_clean());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let ok = serde_json::to_value(StepOutcome::Success).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "success"}));

        let skipped = serde_json::to_value(StepOutcome::Skipped("dry-run".to_string())).unwrap();
        assert_eq!(skipped, serde_json::json!({"status": "skipped", "reason": "dry-run"}));

        let failed = serde_json::to_value(StepOutcome::Failed("file missing".to_string())).unwrap();
        assert_eq!(failed, serde_json::json!({"status": "failed", "reason": "file missing"}));
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let mut report = DispatchReport::new(DeliveryContext::ColdLaunch);
        report.effect = Some(EffectName::Snooze);
        report.record(StepName::Intake, StepOutcome::Success);
        report.record(StepName::Action, StepOutcome::Skipped("dry-run".to_string()));

        let json = serde_json::to_string(&report).unwrap();
        let back: DispatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_summary_mentions_context_effect_and_steps() {
        let mut report = DispatchReport::new(DeliveryContext::Foreground);
        report.effect = Some(EffectName::Stop);
        report.record(StepName::Intake, StepOutcome::Success);
        report.record(StepName::Action, StepOutcome::Success);

        let summary = report.summary();
        assert!(summary.contains("foreground"));
        assert!(summary.contains("effect=stop"));
        assert!(summary.contains("intake=ok"));
        assert!(summary.contains("action=ok"));
    }
}

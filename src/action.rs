//! 动作路由 - 把 (category, action identifier) 映射到具体效果
//!
//! Routing is a first-match table walk over declarative rules. Unknown
//! combinations fall through to [`EffectName::NoAction`] with a warning
//! instead of an error, so a stale or hostile payload cannot wedge intake.

use serde::{Deserialize, Serialize};

use crate::payload::ParsedNotification;

/// Platform action identifier for "user tapped the notification body".
pub const OPEN_DEFAULT_ACTION: &str = "open-default";
/// Platform action identifier for "user dismissed the notification".
pub const DISMISS_DEFAULT_ACTION: &str = "dismiss-default";

/// Category whose notifications carry snooze/stop buttons.
pub const TIMER_EXPIRED_CATEGORY: &str = "TIMER_EXPIRED";
/// Snooze button on a timer notification.
pub const SNOOZE_ACTION: &str = "SNOOZE_ACTION";
/// Stop button on a timer notification.
pub const STOP_ACTION: &str = "STOP_ACTION";

/// 路由产出的效果名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectName {
    /// Bring the app forward; no side effect beyond logging.
    Open,
    /// Forward a snooze intent to the timer port.
    Snooze,
    /// Forward a stop intent to the timer port.
    Stop,
    /// User swiped the notification away; log only.
    Dismiss,
    /// Unknown combination; intentionally does nothing.
    NoAction,
}

impl EffectName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectName::Open => "open",
            EffectName::Snooze => "snooze",
            EffectName::Stop => "stop",
            EffectName::Dismiss => "dismiss",
            EffectName::NoAction => "no_action",
        }
    }
}

impl std::fmt::Display for EffectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 一次用户动作事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    /// Category the platform attached to the tapped notification.
    pub category_id: String,
    /// Which button (or built-in gesture) the user chose.
    pub action_identifier: String,
    /// The notification the action was performed on.
    pub notification: ParsedNotification,
}

/// 单条路由规则
///
/// `category: None` matches any category; the action identifier always
/// matches exactly.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRule {
    pub category: Option<String>,
    pub action: String,
    pub effect: EffectName,
}

impl RouteRule {
    fn matches(&self, category_id: &str, action_identifier: &str) -> bool {
        let category_ok = match &self.category {
            Some(c) => c == category_id,
            None => true,
        };
        category_ok && self.action == action_identifier
    }
}

/// 动作路由器
///
/// Walks its rules in declaration order and returns the first match.
pub struct ActionRouter {
    rules: Vec<RouteRule>,
}

impl ActionRouter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 追加一条规则（链式调用）
    pub fn with_rule(
        mut self,
        category: Option<&str>,
        action: &str,
        effect: EffectName,
    ) -> Self {
        self.rules.push(RouteRule {
            category: category.map(str::to_string),
            action: action.to_string(),
            effect,
        });
        self
    }

    /// Resolve an action event to an effect. First match wins; no match
    /// logs a warning and yields [`EffectName::NoAction`].
    pub fn route(&self, event: &ActionEvent) -> EffectName {
        for rule in &self.rules {
            if rule.matches(&event.category_id, &event.action_identifier) {
                return rule.effect;
            }
        }
        tracing::warn!(
            category = %event.category_id,
            action = %event.action_identifier,
            "no route for action, falling back to no_action"
        );
        EffectName::NoAction
    }

    /// 当前路由表（只读视图，供 CLI 展示）
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

impl Default for ActionRouter {
    /// The built-in table: platform defaults plus the timer category.
    fn default() -> Self {
        ActionRouter::new()
            .with_rule(None, DISMISS_DEFAULT_ACTION, EffectName::Dismiss)
            .with_rule(None, OPEN_DEFAULT_ACTION, EffectName::Open)
            // 某些通道对「点通知本体」不带 identifier，等价于 open
            .with_rule(None, "", EffectName::Open)
            .with_rule(Some(TIMER_EXPIRED_CATEGORY), SNOOZE_ACTION, EffectName::Snooze)
            .with_rule(Some(TIMER_EXPIRED_CATEGORY), STOP_ACTION, EffectName::Stop)
    }
}

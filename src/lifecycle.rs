//! Delivery context classification.
//!
//! A notification reaches the app in one of three ways, and downstream
//! effects differ per way: sounds only make sense while the user is already
//! looking at the app, badge resets only after a tap pulled a backgrounded
//! app forward.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 通知到达应用时的生命周期场景
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryContext {
    /// App was not running; the notification tap launched it.
    ColdLaunch,
    /// App was active in the foreground when the payload arrived.
    Foreground,
    /// App existed in the background; the tap brought it forward.
    BackgroundTap,
}

impl DeliveryContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryContext::ColdLaunch => "cold_launch",
            DeliveryContext::Foreground => "foreground",
            DeliveryContext::BackgroundTap => "background_tap",
        }
    }
}

impl fmt::Display for DeliveryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify two runtime observations into a [`DeliveryContext`].
///
/// `app_was_active` wins: an active app is Foreground no matter what the
/// launch flag claims, since a live process cannot be cold-launched.
pub fn classify(app_was_active: bool, launched_from_notification: bool) -> DeliveryContext {
    match (app_was_active, launched_from_notification) {
        (true, _) => DeliveryContext::Foreground,
        (false, true) => DeliveryContext::ColdLaunch,
        (false, false) => DeliveryContext::BackgroundTap,
    }
}

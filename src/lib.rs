//! Pushbell - 接收推送通知并分发声音、角标与计时器副作用

pub mod action;
pub mod dispatch;
pub mod intake;
pub mod lifecycle;
pub mod payload;
pub mod ports;
pub mod registration;
pub mod report;
pub mod store;

pub use action::{ActionEvent, ActionRouter, EffectName, RouteRule};
pub use action::{DISMISS_DEFAULT_ACTION, OPEN_DEFAULT_ACTION, SNOOZE_ACTION, STOP_ACTION, TIMER_EXPIRED_CATEGORY};
pub use dispatch::EffectDispatcher;
pub use intake::{ActionDescriptor, IntakeBuilder, IntakeEvent, PushIntake};
pub use lifecycle::{classify, DeliveryContext};
pub use payload::{parse, ParsedNotification, RawPayload};
pub use ports::{BadgeResetPort, BundleSoundPlayer, FileBadgeCounter, FileTimerIntentSink, PlaybackOutcome, SoundPlaybackPort, TimerIntent, TimerIntentPort};
pub use registration::{
    format_token, ConsoleRegistrationPort, MainExecutor, PermissionResponse, PushRegistrationPort,
    PushToken, RegistrationError, RegistrationEvents, RegistrationFlow,
};
pub use report::{DispatchReport, StepName, StepOutcome, StepRecord};
pub use store::{DispatchRecord, ReportStore};

//! 外部协作者端口

pub mod badge;
pub mod sound;
pub mod timer;

pub use badge::{BadgeResetPort, FileBadgeCounter};
pub use sound::{BundleSoundPlayer, PlaybackOutcome, SoundPlaybackPort};
pub use timer::{FileTimerIntentSink, TimerIntent, TimerIntentPort, TimerIntentRecord};

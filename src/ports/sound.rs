//! 声音播放端口 - 按 payload 给出的文件名播放提示音
//!
//! The payload names a file, never a path. Lookup is confined to one
//! configured directory, and a name that could escape it is refused before
//! touching the filesystem.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

/// 一次播放尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The player accepted the file.
    Played,
    /// No file with that name exists in the sound directory.
    FileNotFound,
    /// The file exists but could not be handed to a player.
    PlaybackError(String),
}

/// 声音播放端口
pub trait SoundPlaybackPort: Send + Sync {
    /// Play the named bundled sound. `Err` is reserved for faults outside
    /// the playback attempt itself; expected misses come back as outcomes.
    fn play(&self, file_name: &str) -> Result<PlaybackOutcome>;
}

/// 基于本地声音目录与系统播放器的实现
pub struct BundleSoundPlayer {
    /// Directory holding the bundled sound files.
    sound_dir: PathBuf,
    /// Resolved player binary, when one is installed.
    player_cmd: Option<PathBuf>,
    /// Accepted file name shape. Anything else is treated as hostile.
    name_re: Regex,
}

impl BundleSoundPlayer {
    pub fn new(sound_dir: impl Into<PathBuf>) -> Self {
        Self {
            sound_dir: sound_dir.into(),
            player_cmd: Self::find_player(),
            name_re: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._ -]*$").unwrap(),
        }
    }

    /// 覆盖播放器命令（测试用，或用户自定义播放器）
    pub fn with_player(mut self, player: impl Into<PathBuf>) -> Self {
        self.player_cmd = Some(player.into());
        self
    }

    /// 查找系统自带的命令行播放器
    fn find_player() -> Option<PathBuf> {
        for candidate in ["afplay", "paplay", "aplay"] {
            if let Ok(path) = which::which(candidate) {
                debug!(player = %path.display(), "sound player resolved");
                return Some(path);
            }
        }
        None
    }

    /// File names must be plain names. Path separators and parent-dir
    /// segments would escape the sound directory.
    fn is_safe_name(&self, file_name: &str) -> bool {
        self.name_re.is_match(file_name) && !file_name.contains("..")
    }
}

impl SoundPlaybackPort for BundleSoundPlayer {
    fn play(&self, file_name: &str) -> Result<PlaybackOutcome> {
        if !self.is_safe_name(file_name) {
            warn!(file = %file_name, "rejected unsafe sound file name");
            return Ok(PlaybackOutcome::PlaybackError(format!(
                "unsafe sound file name: {file_name}"
            )));
        }

        let path = self.sound_dir.join(file_name);
        if !path.is_file() {
            debug!(path = %path.display(), "sound file not found");
            return Ok(PlaybackOutcome::FileNotFound);
        }

        let Some(player) = &self.player_cmd else {
            return Ok(PlaybackOutcome::PlaybackError(
                "no sound player installed".to_string(),
            ));
        };

        // 播放不阻塞 dispatch，交给播放器进程自行结束
        match Command::new(player)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => {
                debug!(file = %file_name, "sound playback started");
                Ok(PlaybackOutcome::Played)
            }
            Err(e) => Ok(PlaybackOutcome::PlaybackError(format!(
                "failed to launch player: {e}"
            ))),
        }
    }
}

//! 角标端口 - 维护并清零应用角标计数

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// 角标清零端口
pub trait BadgeResetPort: Send + Sync {
    /// Reset the badge count to zero. Idempotent: resetting an already
    /// clean badge succeeds.
    fn reset_badge_count(&self) -> Result<()>;
}

/// 把角标计数存到一个文件里的实现
///
/// The count lives as a decimal string. A missing file reads as zero.
pub struct FileBadgeCounter {
    path: PathBuf,
}

impl FileBadgeCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 当前计数（文件缺失或内容损坏按 0 处理）
    pub fn current(&self) -> u32 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    /// 写入新的计数
    pub fn set_count(&self, count: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建角标目录失败: {}", parent.display()))?;
        }
        fs::write(&self.path, count.to_string())
            .with_context(|| format!("写入角标文件失败: {}", self.path.display()))?;
        Ok(())
    }
}

impl BadgeResetPort for FileBadgeCounter {
    fn reset_badge_count(&self) -> Result<()> {
        let before = self.current();
        self.set_count(0)?;
        debug!(before, "badge count reset");
        Ok(())
    }
}

//! 分发历史存储 - 本地 JSONL 文件读写

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::lifecycle::DeliveryContext;
use crate::report::DispatchReport;

/// 分发记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    /// 生命周期场景
    pub context: DeliveryContext,
    /// 通知分类
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// 简短摘要
    pub summary: String,
    /// 完整报告
    pub report: DispatchReport,
}

impl DispatchRecord {
    pub fn from_report(report: &DispatchReport, category: Option<String>) -> Self {
        Self {
            ts: Utc::now(),
            context: report.context,
            category,
            summary: report.summary(),
            report: report.clone(),
        }
    }
}

/// 分发历史存储
pub struct ReportStore {
    path: PathBuf,
}

const MAX_RECORDS: usize = 200;
const KEEP_AFTER_CLEANUP: usize = 100;
const CLEANUP_CHECK_INTERVAL: usize = 10;
static WRITE_COUNT: AtomicUsize = AtomicUsize::new(0);

impl ReportStore {
    /// 指定存储文件路径
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 默认存储位置
    pub fn default_location() -> Self {
        let path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("pushbell")
            .join("dispatches.jsonl");
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// 追加分发记录（带文件锁）
    pub fn append(&self, record: &DispatchRecord) -> Result<()> {
        use fs2::FileExt;

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // 打开文件并加锁
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        file.lock_exclusive()?;
        let mut file = file;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.unlock()?;

        // 定期检查是否需要清理
        self.maybe_cleanup();

        Ok(())
    }

    /// 读取最近 N 条记录
    pub fn read_recent(&self, n: usize) -> Vec<DispatchRecord> {
        if !self.path.exists() {
            return Vec::new();
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let records: Vec<DispatchRecord> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        // 返回最后 N 条（按时间排序）
        let start = records.len().saturating_sub(n);
        let mut recent = records[start..].to_vec();
        recent.sort_by_key(|r| r.ts);
        recent
    }

    /// 定期检查并清理
    fn maybe_cleanup(&self) {
        let count = WRITE_COUNT.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_CHECK_INTERVAL != 0 {
            return;
        }

        if let Ok(metadata) = fs::metadata(&self.path) {
            // 估算行数：平均每行 300 字节
            let estimated_lines = metadata.len() as usize / 300;
            if estimated_lines > MAX_RECORDS {
                let _ = self.cleanup();
            }
        }
    }

    /// 执行清理（保留最近的记录）
    fn cleanup(&self) -> Result<()> {
        use fs2::FileExt;

        let file = File::open(&self.path)?;

        // 独占锁用于清理
        file.lock_exclusive()?;

        let reader = BufReader::new(&file);
        let records: Vec<DispatchRecord> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if records.len() <= MAX_RECORDS {
            file.unlock()?;
            return Ok(());
        }

        // 保留最后 KEEP_AFTER_CLEANUP 条
        let start = records.len().saturating_sub(KEEP_AFTER_CLEANUP);
        let to_keep = &records[start..];

        // 写入临时文件再原子替换
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in to_keep {
                writeln!(temp_file, "{}", serde_json::to_string(record)?)?;
            }
        }
        fs::rename(&temp_path, &self.path)?;

        file.unlock()?;
        Ok(())
    }
}

//! 推送注册流程 - 权限询问、注册发起与设备令牌回传
//!
//! Registration is a three-stage hand-off: ask the user for permission,
//! start registration on the main executor, then wait for the push channel
//! to report back on whatever thread it likes. The events handle consumes
//! itself on first use, so the channel reports exactly once.

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// 设备令牌（推送通道下发的原始字节）
pub type PushToken = Vec<u8>;

/// 权限询问的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    Granted,
    Denied,
}

/// 注册失败的各种方式
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// 用户拒绝了通知权限。不重试，后续通知静默丢失。
    #[error("notification permission denied")]
    PermissionDenied,
    /// 权限询问本身没能完成
    #[error("permission prompt failed: {0}")]
    PromptFailed(String),
    /// 推送通道拒绝了注册
    #[error("registration failed: {0}")]
    Failed(String),
    /// 端口丢弃了事件句柄，没有报告任何结果
    #[error("registration port dropped its events handle without reporting")]
    EventsDropped,
    /// 主执行器已停止，无法发起注册
    #[error("main executor is no longer running")]
    ExecutorStopped,
}

/// 注册事件句柄 - 推送通道通过它报告唯一一次结果
///
/// Consuming `self` makes double-reporting a compile error.
pub struct RegistrationEvents {
    tx: oneshot::Sender<Result<PushToken, String>>,
}

impl RegistrationEvents {
    fn channel() -> (Self, oneshot::Receiver<Result<PushToken, String>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// 通道接受了注册并发回设备令牌
    pub fn token_received(self, token: PushToken) {
        let _ = self.tx.send(Ok(token));
    }

    /// 通道拒绝了注册
    pub fn registration_failed(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(reason.into()));
    }
}

/// 推送注册端口
pub trait PushRegistrationPort: Send + Sync {
    /// Ask the user whether notifications may be shown. May block on an
    /// interactive prompt.
    fn request_permission(&self) -> Result<PermissionResponse>;

    /// Start registration with the push channel. The channel answers
    /// through `events`, possibly from another thread.
    fn register_for_remote_delivery(&self, events: RegistrationEvents);
}

type Job = Box<dyn FnOnce() + Send>;

/// 主执行器 - 一个串行执行任务的专用任务
///
/// Registration must be started from one designated context; the executor
/// serializes submitted jobs onto a single task to provide that.
#[derive(Clone)]
pub struct MainExecutor {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainExecutor {
    /// 启动执行器循环
    pub fn start() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { tx }
    }

    /// 把任务提交到执行器，按提交顺序执行
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), RegistrationError> {
        self.tx
            .send(Box::new(job))
            .map_err(|_| RegistrationError::ExecutorStopped)
    }
}

/// 注册流程
pub struct RegistrationFlow {
    port: Arc<dyn PushRegistrationPort>,
    executor: MainExecutor,
}

impl RegistrationFlow {
    pub fn new(port: Arc<dyn PushRegistrationPort>, executor: MainExecutor) -> Self {
        Self { port, executor }
    }

    /// 执行完整注册：权限 → 发起注册 → 等待令牌
    ///
    /// Denial is terminal for this run; the caller decides whether to ask
    /// again some other day.
    pub async fn run(&self) -> Result<PushToken, RegistrationError> {
        // 权限询问可能阻塞在交互式提示上，放进 blocking 线程
        let port = self.port.clone();
        let response = tokio::task::spawn_blocking(move || port.request_permission())
            .await
            .map_err(|e| RegistrationError::PromptFailed(e.to_string()))?
            .map_err(|e| RegistrationError::PromptFailed(e.to_string()))?;

        if response == PermissionResponse::Denied {
            info!("notification permission denied, skipping registration");
            return Err(RegistrationError::PermissionDenied);
        }

        // 注册必须从主执行器发起
        let (events, token_rx) = RegistrationEvents::channel();
        let port = self.port.clone();
        self.executor
            .submit(move || port.register_for_remote_delivery(events))?;

        match token_rx.await {
            Ok(Ok(token)) => {
                info!(token = %format_token(&token), "device token received");
                Ok(token)
            }
            Ok(Err(reason)) => {
                warn!(reason = %reason, "remote registration failed");
                Err(RegistrationError::Failed(reason))
            }
            Err(_) => Err(RegistrationError::EventsDropped),
        }
    }
}

/// 设备令牌的十六进制展示（大写，无分隔符）
pub fn format_token(token: &PushToken) -> String {
    token.iter().map(|b| format!("{b:02X}")).collect()
}

/// 基于终端确认的注册端口
///
/// 没有真实推送通道可用时的本地实现：权限走终端确认，令牌由本机合成。
pub struct ConsoleRegistrationPort {
    /// 跳过交互式确认，直接视为已授权
    assume_granted: bool,
}

impl ConsoleRegistrationPort {
    pub fn new(assume_granted: bool) -> Self {
        Self { assume_granted }
    }

    /// 本地合成令牌：进程 PID 与当前 Unix 时间戳的字节拼接
    fn local_token() -> PushToken {
        let pid = std::process::id().to_be_bytes();
        let ts = chrono::Utc::now().timestamp().to_be_bytes();
        let mut token = Vec::with_capacity(pid.len() + ts.len());
        token.extend_from_slice(&pid);
        token.extend_from_slice(&ts);
        token
    }
}

impl PushRegistrationPort for ConsoleRegistrationPort {
    fn request_permission(&self) -> Result<PermissionResponse> {
        if self.assume_granted {
            return Ok(PermissionResponse::Granted);
        }

        let granted = dialoguer::Confirm::new()
            .with_prompt("允许接收通知（声音与角标）?")
            .default(false)
            .interact()
            .unwrap_or(false);

        Ok(if granted {
            PermissionResponse::Granted
        } else {
            PermissionResponse::Denied
        })
    }

    fn register_for_remote_delivery(&self, events: RegistrationEvents) {
        events.token_received(Self::local_token());
    }
}

//! Pushbell CLI
//!
//! 接收推送 payload 并分发声音、角标与计时器副作用

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use pushbell::{
    format_token, ActionDescriptor, ActionRouter, ConsoleRegistrationPort, IntakeBuilder,
    IntakeEvent, MainExecutor, RawPayload, RegistrationFlow, ReportStore,
};

#[derive(Parser)]
#[command(name = "pbell")]
#[command(about = "Pushbell - 接收推送通知并分发声音、角标与计时器副作用")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 接收一次推送事件并执行分发
    Intake {
        /// 内联 JSON payload
        #[arg(long, conflicts_with = "payload_file")]
        payload: Option<String>,
        /// 从文件读取 payload（- 表示 stdin）
        #[arg(long)]
        payload_file: Option<String>,
        /// 收到时应用在前台活跃
        #[arg(long)]
        app_active: bool,
        /// 应用由点击通知启动
        #[arg(long)]
        launched_from_notification: bool,
        /// 用户动作 identifier（如 SNOOZE_ACTION、open-default）
        #[arg(long)]
        action: Option<String>,
        /// 动作所属 category（默认取 payload 里的 aps.category）
        #[arg(long, requires = "action")]
        category: Option<String>,
        /// Dry-run 模式（只打印不执行副作用）
        #[arg(long)]
        dry_run: bool,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
        /// 不记录分发历史
        #[arg(long)]
        no_store: bool,
        /// 声音文件目录
        #[arg(long)]
        sound_dir: Option<PathBuf>,
    },
    /// 请求通知权限并注册推送
    Register {
        /// 跳过交互确认，直接视为已授权
        #[arg(long)]
        assume_granted: bool,
    },
    /// 查看最近的分发记录
    Recent {
        /// 显示最近 N 条
        #[arg(long, short, default_value = "10")]
        limit: usize,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 查看动作路由表
    Routes {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

/// 读取 payload 文本并解析为 JSON
///
/// 非法 JSON 不让 intake 失败，降级为空 payload 继续走流水线。
fn read_payload(payload: Option<String>, payload_file: Option<String>) -> RawPayload {
    let text = if let Some(inline) = payload {
        Some(inline)
    } else if let Some(path) = payload_file {
        if path == "-" {
            let mut buf = String::new();
            match std::io::stdin().read_to_string(&mut buf) {
                Ok(_) => Some(buf),
                Err(e) => {
                    warn!(error = %e, "failed to read payload from stdin");
                    None
                }
            }
        } else {
            match std::fs::read_to_string(&path) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(error = %e, path = %path, "failed to read payload file");
                    None
                }
            }
        }
    } else {
        None
    };

    match text {
        Some(text) => match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "payload is not valid JSON, treating as empty");
                RawPayload::Null
            }
        },
        None => RawPayload::Null,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug pbell intake --payload '{}'
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pushbell=info,pbell=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Intake {
            payload,
            payload_file,
            app_active,
            launched_from_notification,
            action,
            category,
            dry_run,
            json,
            no_store,
            sound_dir,
        } => {
            let event = IntakeEvent {
                payload: read_payload(payload, payload_file),
                app_was_active: app_active,
                launched_from_notification,
                action: action.map(|action_identifier| ActionDescriptor {
                    action_identifier,
                    category_id: category,
                }),
            };

            let mut builder = IntakeBuilder::new()
                .dry_run(dry_run)
                .keep_history(!no_store);
            if let Some(dir) = sound_dir {
                builder = builder.sound_dir(dir);
            }
            let intake = builder.build()?;

            let report = intake.handle(&event);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
            }

            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Commands::Register { assume_granted } => {
            let executor = MainExecutor::start();
            let port = Arc::new(ConsoleRegistrationPort::new(assume_granted));
            let flow = RegistrationFlow::new(port, executor);

            match flow.run().await {
                Ok(token) => {
                    println!("注册成功");
                    println!("device_token: {}", format_token(&token));
                }
                Err(e) => {
                    eprintln!("注册失败: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Recent { limit, json } => {
            let store = ReportStore::default_location();
            let records = store.read_recent(limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("最近 {} 条分发记录:\n", records.len());
                for record in records {
                    println!(
                        "  {} | {}",
                        record.ts.format("%Y-%m-%d %H:%M:%S"),
                        record.summary
                    );
                }
            }
        }
        Commands::Routes { json } => {
            let router = ActionRouter::default();

            if json {
                println!("{}", serde_json::to_string_pretty(router.rules())?);
            } else {
                println!("动作路由表:\n");
                for rule in router.rules() {
                    let category = rule.category.as_deref().unwrap_or("*");
                    let action = if rule.action.is_empty() {
                        "<tap>"
                    } else {
                        rule.action.as_str()
                    };
                    println!("  {:<16} {:<24} -> {}", category, action, rule.effect);
                }
            }
        }
    }

    Ok(())
}

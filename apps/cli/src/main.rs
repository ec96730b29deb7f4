//! # Kite CLI
//!
//! Command-line interface for the kite ground station.
//!
//! ```bash
//! # 使用默认配置，针对模拟飞行器运行 30 秒
//! kite-cli run --duration 30
//!
//! # 覆盖目标点
//! kite-cli run --target 20,5,10
//!
//! # 查看生效的配置
//! kite-cli config show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, RunCommand};

/// Kite CLI - 地面站命令行工具
#[derive(Parser, Debug)]
#[command(name = "kite-cli")]
#[command(about = "Command-line interface for the kite ground station", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 针对模拟飞行器运行地面站
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志（target 前缀匹配 kite_driver / kite_link / kite_cli）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("kite=info".parse()?),
        )
        .with_thread_names(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}

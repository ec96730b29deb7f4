//! 运行命令
//!
//! 启动地面站的四个 worker，连接模拟飞行器，持续打印制导结果与
//! 链路状态变化，直到 Ctrl-C、到达 `--duration` 或 worker 全部退出。

use super::config::load_config;
use anyhow::{Context, Result, bail};
use clap::Args;
use kite_driver::{GroundStationBuilder, HealthStatus, Position};
use kite_link::{SimConfig, SimConnection};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 主循环的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 解析 "X,Y,Z" 形式的目标点
fn parse_target(s: &str) -> Result<Position> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("Invalid target '{}'", s))?;

    match parts.as_slice() {
        [x, y, z] => Ok(Position::new(*x, *y, *z)),
        _ => bail!("Target must have exactly 3 components (X,Y,Z), got {}", parts.len()),
    }
}

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件路径（默认 <config_dir>/kite/config.toml）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 目标点 X,Y,Z（m），覆盖配置文件
    #[arg(short, long, allow_hyphen_values = true)]
    pub target: Option<String>,

    /// 运行时长（秒），缺省时直到 Ctrl-C
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// 模拟飞行器的遥测频率（Hz）
    #[arg(long, default_value_t = 10.0)]
    pub sim_rate: f64,
}

impl RunCommand {
    pub fn execute(self) -> Result<()> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(target) = &self.target {
            config.target = parse_target(target)?;
        }
        let duration = match self.duration {
            Some(secs) => Some(
                Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("Invalid duration {}", secs))?,
            ),
            None => None,
        };

        let vehicle = Arc::new(SimConnection::new(SimConfig {
            telemetry_rate_hz: self.sim_rate,
            ..Default::default()
        }));

        let station = GroundStationBuilder::new()
            .config(config)
            .spawn(Arc::clone(&vehicle))?;

        let controller = station.controller().clone();
        ctrlc::set_handler(move || {
            eprintln!("\n⚠️ Ctrl-C received, shutting down...");
            controller.request_exit();
        })
        .context("Failed to install Ctrl-C handler")?;

        println!("🚀 Ground station running (press Ctrl-C to stop)");

        let start = Instant::now();
        let mut health = HealthStatus::Disconnected;
        loop {
            if station.controller().is_exit_requested() {
                break;
            }
            if duration.is_some_and(|d| start.elapsed() >= d) {
                info!("Run duration elapsed");
                break;
            }
            if !station.is_running() {
                warn!("All workers have stopped");
                break;
            }

            if let Some(result) = station.next_command_status(POLL_INTERVAL) {
                println!("{}", result);
            }
            while let Some(status) = station.next_health_status(Duration::ZERO) {
                if status != health {
                    println!("🔗 Link: {}", status);
                    health = status;
                }
            }
        }

        let reports = station.shutdown();
        vehicle.shutdown();

        let (position, yaw) = vehicle.pose();
        println!(
            "🏁 Vehicle at ({:.2}, {:.2}, {:.2}), yaw {:.1}°, {} heartbeats received",
            position[0],
            position[1],
            position[2],
            yaw.to_degrees(),
            vehicle.heartbeats_received()
        );
        for report in reports {
            match report.stats {
                Some(stats) => println!("  {}: {}", report.name, stats),
                None => println!("  {}: did not stop cleanly", report.name),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("10,0,5").unwrap(),
            Position::new(10.0, 0.0, 5.0)
        );
        assert_eq!(
            parse_target(" -1.5, 2 ,3e1 ").unwrap(),
            Position::new(-1.5, 2.0, 30.0)
        );
    }

    #[test]
    fn test_parse_target_rejects_bad_input() {
        assert!(parse_target("1,2").is_err());
        assert!(parse_target("1,2,3,4").is_err());
        assert!(parse_target("a,b,c").is_err());
    }
}

//! Builder 模式实现
//!
//! 提供链式构造 [`GroundStation`] 的便捷方式。

use crate::config::StationConfig;
use crate::controller::WorkerController;
use crate::error::DriverError;
use crate::pipeline::*;
use crate::queue::bounded;
use crate::state::Position;
use crate::station::{GroundStation, Worker};
use kite_link::Connection;
use std::sync::Arc;
use std::thread;
use tracing::info;

/// GroundStation Builder（链式构造）
///
/// # Example
///
/// ```
/// use kite_driver::{GroundStationBuilder, Position};
/// use kite_link::MockConnection;
/// use std::sync::Arc;
///
/// let station = GroundStationBuilder::new()
///     .target(Position::new(10.0, 0.0, 5.0))
///     .queue_capacity(8)
///     .spawn(Arc::new(MockConnection::new()))
///     .unwrap();
///
/// let reports = station.shutdown();
/// assert_eq!(reports.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroundStationBuilder {
    config: StationConfig,
}

impl GroundStationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换配置
    pub fn config(mut self, config: StationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn target(mut self, target: Position) -> Self {
        self.config.target = target;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// 校验配置并启动四个 worker 线程
    ///
    /// # 错误
    /// - `DriverError::InvalidConfig`: 配置非法（不会启动任何线程）
    /// - `DriverError::WorkerThread`: 线程创建失败（已启动的线程随返回值一起被关闭）
    pub fn spawn<C>(self, connection: Arc<C>) -> Result<GroundStation, DriverError>
    where
        C: Connection + Send + Sync + 'static,
    {
        let config = self.config;
        config.validate()?;

        let controller = WorkerController::new();
        let (telemetry_tx, telemetry_rx) = bounded(config.queue_capacity);
        let (command_tx, command_rx) = bounded(config.queue_capacity);
        let (health_tx, health_rx) = bounded(config.queue_capacity);

        let mut station = GroundStation::new(
            controller.clone(),
            telemetry_tx.clone(),
            command_rx,
            health_rx,
        );

        {
            let (conn, cfg, ctrl) = (
                Arc::clone(&connection),
                config.telemetry.clone(),
                controller.clone(),
            );
            station.push_worker(spawn_worker("kite-telemetry", move || {
                telemetry_loop(conn, &cfg, telemetry_tx, ctrl)
            })?);
        }
        {
            let (conn, cfg, ctrl) = (
                Arc::clone(&connection),
                config.guidance.clone(),
                controller.clone(),
            );
            let target = config.target;
            station.push_worker(spawn_worker("kite-command", move || {
                command_loop(conn, target, &cfg, telemetry_rx, command_tx, ctrl)
            })?);
        }
        {
            let (conn, cfg, ctrl) = (
                Arc::clone(&connection),
                config.heartbeat.clone(),
                controller.clone(),
            );
            station.push_worker(spawn_worker("kite-hb-send", move || {
                heartbeat_sender_loop(conn, &cfg, ctrl)
            })?);
        }
        {
            let (cfg, ctrl) = (config.heartbeat.clone(), controller);
            station.push_worker(spawn_worker("kite-hb-recv", move || {
                heartbeat_receiver_loop(connection, &cfg, health_tx, ctrl)
            })?);
        }

        info!("Ground station started, target {}", config.target);
        Ok(station)
    }
}

fn spawn_worker<F>(name: &'static str, body: F) -> Result<Worker, DriverError>
where
    F: FnOnce() -> WorkerStats + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| DriverError::WorkerThread(format!("failed to spawn {}: {}", name, e)))?;
    Ok(Worker { name, handle })
}

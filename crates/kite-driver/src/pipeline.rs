//! Pipeline 模块
//!
//! 四个 worker 的主循环。每个循环在独立线程中运行，彼此只通过队列和
//! [`WorkerController`] 交互。
//!
//! 每次迭代的顺序固定为：
//! 1. 检查退出标志
//! 2. `check_pause()`（暂停期间阻塞本线程）
//! 3. 执行一个组件周期
//! 4. 把结果交给下游队列
//!
//! 组件构造失败时记录一条 error 日志并直接返回，不进入循环。
//! 稳态循环中的超时与链路错误只跳过当前周期；链路立即失败（例如已关闭）
//! 时，循环睡满本周期的接收窗口再重试，不会空转。

use crate::command::Guidance;
use crate::config::{GuidanceConfig, HeartbeatConfig, TelemetryConfig};
use crate::controller::WorkerController;
use crate::heartbeat::{HeartbeatReceiver, HeartbeatSender};
use crate::queue::{Packet, QueueReceiver, QueueSender};
use crate::state::{CommandResult, HealthStatus, Position, TelemetrySnapshot};
use crate::telemetry::Telemetry;
use kite_link::Connection;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

/// 心跳发送间隔内检查退出标志的粒度
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// 单个 worker 的周期统计（线程本地，退出时返回）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// 已执行的周期数
    pub cycles: u64,
    /// 失败（超时或链路错误）的周期数
    pub failures: u64,
}

impl fmt::Display for WorkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles, {} failures", self.cycles, self.failures)
    }
}

/// 下游队列断开时的日志：已请求退出属于正常收尾
fn output_closed(controller: &WorkerController) {
    if controller.is_exit_requested() {
        debug!("Output queue closed during shutdown");
    } else {
        warn!("Output queue closed, stopping worker");
    }
}

/// 遥测 worker：融合快照并推入 `output`
pub fn telemetry_loop<C: Connection>(
    connection: Arc<C>,
    config: &TelemetryConfig,
    output: QueueSender<TelemetrySnapshot>,
    controller: WorkerController,
) -> WorkerStats {
    let _span = info_span!("telemetry").entered();
    let mut stats = WorkerStats::default();

    let mut telemetry = match Telemetry::create(connection, config) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            error!("Failed to create Telemetry: {}", e);
            return stats;
        },
    };
    let window = telemetry.fusion_timeout();
    info!("Telemetry worker started");

    while !controller.is_exit_requested() {
        controller.check_pause();
        if controller.is_exit_requested() {
            break;
        }

        stats.cycles += 1;
        let cycle_start = Instant::now();
        let snapshot = match telemetry.run() {
            Ok(snapshot) => snapshot,
            Err(_) => {
                // 组件内部已记录日志
                stats.failures += 1;
                sleep_unless_exit(window.saturating_sub(cycle_start.elapsed()), &controller);
                continue;
            },
        };

        if output.put(snapshot).is_err() {
            output_closed(&controller);
            break;
        }
    }

    info!("Telemetry worker stopped ({})", stats);
    stats
}

/// 制导 worker：消费快照，推出每个周期的 [`CommandResult`]
///
/// 收到 `EndOfStream`（或上游断开）时立即退出。
pub fn command_loop<C: Connection>(
    connection: Arc<C>,
    target: Position,
    config: &GuidanceConfig,
    input: QueueReceiver<TelemetrySnapshot>,
    output: QueueSender<CommandResult>,
    controller: WorkerController,
) -> WorkerStats {
    let _span = info_span!("command").entered();
    let mut stats = WorkerStats::default();

    let mut guidance = match Guidance::create(connection, target, config) {
        Ok(guidance) => guidance,
        Err(e) => {
            error!("Failed to create Guidance: {}", e);
            return stats;
        },
    };
    info!("Command worker started, target {}", guidance.target());

    while !controller.is_exit_requested() {
        controller.check_pause();
        if controller.is_exit_requested() {
            break;
        }

        let snapshot = match input.get() {
            Packet::Data(snapshot) => snapshot,
            Packet::EndOfStream => {
                debug!("End of telemetry stream");
                break;
            },
        };

        stats.cycles += 1;
        let result = match guidance.run(&snapshot) {
            Ok(result) => result,
            Err(_) => {
                stats.failures += 1;
                continue;
            },
        };

        if output.put(result).is_err() {
            output_closed(&controller);
            break;
        }
    }

    if let Some(average) = guidance.average_velocity() {
        info!("Final average velocity: {:.3} m/s", average);
    }
    info!("Command worker stopped ({})", stats);
    stats
}

/// 心跳发送 worker：每个 `period` 发送一次
pub fn heartbeat_sender_loop<C: Connection>(
    connection: Arc<C>,
    config: &HeartbeatConfig,
    controller: WorkerController,
) -> WorkerStats {
    let _span = info_span!("heartbeat_sender").entered();
    let mut stats = WorkerStats::default();

    let sender = match HeartbeatSender::create(connection) {
        Ok(sender) => sender,
        Err(e) => {
            error!("Failed to create HeartbeatSender: {}", e);
            return stats;
        },
    };
    let period = config.period();
    info!("Heartbeat sender started (period {:?})", period);

    while !controller.is_exit_requested() {
        controller.check_pause();
        if controller.is_exit_requested() {
            break;
        }

        stats.cycles += 1;
        if sender.run().is_err() {
            stats.failures += 1;
        }

        sleep_unless_exit(period, &controller);
    }

    info!("Heartbeat sender stopped ({})", stats);
    stats
}

/// 心跳接收 worker：每个周期把当前 [`HealthStatus`] 推入 `output`
pub fn heartbeat_receiver_loop<C: Connection>(
    connection: Arc<C>,
    config: &HeartbeatConfig,
    output: QueueSender<HealthStatus>,
    controller: WorkerController,
) -> WorkerStats {
    let _span = info_span!("heartbeat_receiver").entered();
    let mut stats = WorkerStats::default();

    let mut receiver = match HeartbeatReceiver::create(connection, config) {
        Ok(receiver) => receiver,
        Err(e) => {
            error!("Failed to create HeartbeatReceiver: {}", e);
            return stats;
        },
    };
    let window = config.timeout();
    info!("Heartbeat receiver started");

    while !controller.is_exit_requested() {
        controller.check_pause();
        if controller.is_exit_requested() {
            break;
        }

        stats.cycles += 1;
        let cycle_start = Instant::now();
        let missed_before = receiver.missed_heartbeats();
        let status = receiver.run();
        if receiver.missed_heartbeats() > missed_before {
            stats.failures += 1;
            sleep_unless_exit(window.saturating_sub(cycle_start.elapsed()), &controller);
        }

        if output.put(status).is_err() {
            output_closed(&controller);
            break;
        }
    }

    info!("Heartbeat receiver stopped ({})", stats);
    stats
}

/// 睡眠 `duration`，期间按 [`SLEEP_SLICE`] 检查退出标志
fn sleep_unless_exit(duration: Duration, controller: &WorkerController) {
    let deadline = Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || controller.is_exit_requested() {
            return;
        }
        spin_sleep::sleep(remaining.min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::bounded;
    use kite_link::MockConnection;
    use kite_protocol::{Attitude, Heartbeat, LocalPositionNed};
    use std::thread;

    #[test]
    fn test_worker_stats_display() {
        let stats = WorkerStats {
            cycles: 10,
            failures: 2,
        };
        assert_eq!(stats.to_string(), "10 cycles, 2 failures");
    }

    #[test]
    fn test_exit_before_start_runs_no_cycle() {
        let conn = Arc::new(MockConnection::new());
        let controller = WorkerController::new();
        controller.request_exit();

        let (tx, _rx) = bounded(1);
        let stats = telemetry_loop(
            Arc::clone(&conn),
            &TelemetryConfig::default(),
            tx,
            controller.clone(),
        );
        assert_eq!(stats, WorkerStats::default());
        assert!(conn.recv_calls().is_empty());

        let stats = heartbeat_sender_loop(conn.clone(), &HeartbeatConfig::default(), controller);
        assert_eq!(stats.cycles, 0);
        assert!(conn.sent().is_empty());
    }

    #[test]
    fn test_construction_failure_returns_immediately() {
        let conn = Arc::new(MockConnection::new());
        conn.close();
        let (tx, _rx) = bounded(1);
        let stats = heartbeat_receiver_loop(
            conn,
            &HeartbeatConfig::default(),
            tx,
            WorkerController::new(),
        );
        assert_eq!(stats, WorkerStats::default());
    }

    #[test]
    fn test_command_loop_stops_on_end_of_stream() {
        let conn = Arc::new(MockConnection::new());
        let (snap_tx, snap_rx) = bounded(4);
        let (result_tx, result_rx) = bounded(4);

        snap_tx
            .put(TelemetrySnapshot {
                z: 5.0,
                ..Default::default()
            })
            .unwrap();
        snap_tx.put_end_of_stream().unwrap();

        let stats = command_loop(
            conn,
            Position::new(10.0, 0.0, 5.0),
            &GuidanceConfig::default(),
            snap_rx,
            result_tx,
            WorkerController::new(),
        );

        assert_eq!(stats.cycles, 1);
        assert_eq!(result_rx.drain(), vec![CommandResult::OnTarget]);
        assert!(result_rx.get().is_end_of_stream());
    }

    #[test]
    fn test_telemetry_loop_stops_when_consumer_gone() {
        let conn = Arc::new(MockConnection::new());
        conn.push(Attitude::default());
        conn.push(LocalPositionNed::default());

        let (tx, rx) = bounded(1);
        drop(rx);

        let stats = telemetry_loop(
            conn,
            &TelemetryConfig::default(),
            tx,
            WorkerController::new(),
        );
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn test_heartbeat_receiver_loop_reports_each_cycle() {
        let conn = Arc::new(MockConnection::new());
        conn.push(Heartbeat::gcs());

        let config = HeartbeatConfig {
            timeout_s: 0.01,
            disconnect_threshold: 1,
            period_s: 1.0,
        };
        let (tx, rx) = bounded(16);
        let controller = WorkerController::new();

        let worker = {
            let controller = controller.clone();
            thread::spawn(move || heartbeat_receiver_loop(conn, &config, tx, controller))
        };

        assert_eq!(rx.get(), Packet::Data(HealthStatus::Connected));
        assert_eq!(rx.get(), Packet::Data(HealthStatus::Disconnected));
        controller.request_exit();
        drop(rx);

        let stats = worker.join().unwrap();
        assert!(stats.cycles >= 2);
        assert!(stats.failures >= 1);
    }

    #[test]
    fn test_telemetry_loop_paces_closed_link() {
        let conn = Arc::new(MockConnection::new());
        let config = TelemetryConfig {
            fusion_timeout_s: 0.05,
        };
        let (tx, rx) = bounded(16);
        let controller = WorkerController::new();

        let worker = {
            let conn = Arc::clone(&conn);
            let controller = controller.clone();
            thread::spawn(move || telemetry_loop(conn, &config, tx, controller))
        };

        // 创建成功后关闭：之后每个周期都立即返回 Closed
        thread::sleep(Duration::from_millis(20));
        conn.close();
        thread::sleep(Duration::from_millis(300));
        controller.request_exit();

        let stats = worker.join().unwrap();
        assert!(stats.cycles >= 2, "{}", stats);
        assert!(stats.cycles <= 10, "busy loop: {}", stats);
        assert_eq!(stats.failures, stats.cycles);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_heartbeat_receiver_loop_paces_closed_link() {
        let conn = Arc::new(MockConnection::new());
        let config = HeartbeatConfig {
            timeout_s: 0.05,
            disconnect_threshold: 1,
            period_s: 1.0,
        };
        let (tx, rx) = bounded(64);
        let controller = WorkerController::new();

        let worker = {
            let conn = Arc::clone(&conn);
            let controller = controller.clone();
            thread::spawn(move || heartbeat_receiver_loop(conn, &config, tx, controller))
        };

        thread::sleep(Duration::from_millis(20));
        conn.close();
        thread::sleep(Duration::from_millis(300));
        controller.request_exit();
        drop(rx);

        let stats = worker.join().unwrap();
        assert!(stats.cycles >= 2, "{}", stats);
        assert!(stats.cycles <= 10, "busy loop: {}", stats);
        assert_eq!(stats.failures, stats.cycles);
    }

    #[test]
    fn test_sleep_unless_exit_returns_early() {
        let controller = WorkerController::new();
        controller.request_exit();
        let start = Instant::now();
        sleep_unless_exit(Duration::from_secs(5), &controller);
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}

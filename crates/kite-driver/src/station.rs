//! 地面站对外 API
//!
//! [`GroundStation`] 持有四个 worker 线程、它们之间的队列以及共享的
//! [`WorkerController`]。通过 [`GroundStationBuilder`](crate::GroundStationBuilder) 创建。

use crate::controller::WorkerController;
use crate::error::DriverError;
use crate::pipeline::WorkerStats;
use crate::queue::{Packet, QueueReceiver, QueueSender};
use crate::state::{CommandResult, HealthStatus, TelemetrySnapshot};
use crossbeam_channel::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

/// 关闭时每个线程的最长等待时间
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout<T> {
    fn join_timeout(self, timeout: Duration) -> Result<T, DriverError>;
}

impl<T: Send + 'static> JoinTimeout<T> for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<T, DriverError> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // watchdog 线程代为 join，本线程只等待 `timeout`
        thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(DriverError::WorkerThread("thread panicked".to_string())),
            // 超时后 watchdog 线程继续存在，进程退出时回收
            Err(RecvTimeoutError::Timeout) => Err(DriverError::WorkerThread(format!(
                "thread did not stop within {:?}",
                timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(DriverError::WorkerThread("join watchdog vanished".to_string()))
            },
        }
    }
}

/// 一个 worker 的退出报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// 线程名
    pub name: &'static str,
    /// 正常退出时的统计；panic 或超时未退出时为 `None`
    pub stats: Option<WorkerStats>,
}

pub(crate) struct Worker {
    pub(crate) name: &'static str,
    pub(crate) handle: JoinHandle<WorkerStats>,
}

/// 运行中的地面站
///
/// Drop 时执行与 [`shutdown`](Self::shutdown) 相同的收尾流程。
pub struct GroundStation {
    controller: WorkerController,
    /// 保留一个遥测队列发送端，用于关闭时投递结束标记
    telemetry_tx: Option<QueueSender<TelemetrySnapshot>>,
    command_rx: Option<QueueReceiver<CommandResult>>,
    health_rx: Option<QueueReceiver<HealthStatus>>,
    workers: Vec<Worker>,
}

impl GroundStation {
    pub(crate) fn new(
        controller: WorkerController,
        telemetry_tx: QueueSender<TelemetrySnapshot>,
        command_rx: QueueReceiver<CommandResult>,
        health_rx: QueueReceiver<HealthStatus>,
    ) -> Self {
        Self {
            controller,
            telemetry_tx: Some(telemetry_tx),
            command_rx: Some(command_rx),
            health_rx: Some(health_rx),
            workers: Vec::with_capacity(4),
        }
    }

    pub(crate) fn push_worker(&mut self, worker: Worker) {
        self.workers.push(worker);
    }

    /// 共享的控制句柄（可交给信号处理器等）
    pub fn controller(&self) -> &WorkerController {
        &self.controller
    }

    pub fn pause(&self) {
        info!("Pausing workers");
        self.controller.request_pause();
    }

    pub fn resume(&self) {
        info!("Resuming workers");
        self.controller.request_resume();
    }

    /// 等待下一个制导结果
    ///
    /// 超时或制导 worker 已退出时返回 `None`。
    pub fn next_command_status(&self, timeout: Duration) -> Option<CommandResult> {
        self.command_rx
            .as_ref()?
            .get_timeout(timeout)
            .and_then(Packet::into_data)
    }

    /// 等待下一个链路健康状态
    pub fn next_health_status(&self, timeout: Duration) -> Option<HealthStatus> {
        self.health_rx
            .as_ref()?
            .get_timeout(timeout)
            .and_then(Packet::into_data)
    }

    /// 是否仍有 worker 在运行
    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|w| !w.handle.is_finished())
    }

    /// 有序关闭：设置退出标志 → 投递结束标记 → 释放队列端 → 逐个 join
    pub fn shutdown(mut self) -> Vec<WorkerReport> {
        self.stop()
    }

    fn stop(&mut self) -> Vec<WorkerReport> {
        if self.workers.is_empty() {
            return Vec::new();
        }
        info!("Shutting down ground station");

        self.controller.request_exit();

        // 制导 worker 可能正阻塞在空队列上
        if let Some(tx) = self.telemetry_tx.take() {
            tx.try_put_end_of_stream();
        }
        // 释放状态队列，阻塞在 put 上的 worker 会看到断开
        drop(self.command_rx.take());
        drop(self.health_rx.take());

        self.workers
            .drain(..)
            .map(|worker| {
                let stats = match worker.handle.join_timeout(JOIN_TIMEOUT) {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        error!("Worker {} failed to shut down: {}", worker.name, e);
                        None
                    },
                };
                WorkerReport {
                    name: worker.name,
                    stats,
                }
            })
            .collect()
    }
}

impl Drop for GroundStation {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_timeout_returns_value() {
        let handle = thread::spawn(|| 42);
        assert_eq!(handle.join_timeout(Duration::from_secs(1)).unwrap(), 42);
    }

    #[test]
    fn test_join_timeout_expires() {
        let handle = thread::spawn(|| thread::sleep(Duration::from_millis(500)));
        assert!(matches!(
            handle.join_timeout(Duration::from_millis(20)),
            Err(DriverError::WorkerThread(_))
        ));
    }

    #[test]
    fn test_join_timeout_reports_panic() {
        let handle = thread::spawn(|| -> u32 { panic!("boom") });
        match handle.join_timeout(Duration::from_secs(1)) {
            Err(DriverError::WorkerThread(msg)) => assert!(msg.contains("panicked")),
            other => panic!("Expected WorkerThread error, got {:?}", other.map(|_| ())),
        }
    }
}

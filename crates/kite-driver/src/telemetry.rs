//! 遥测融合
//!
//! 在一个固定时间窗口内接收一条 ATTITUDE 和一条 LOCAL_POSITION_NED，
//! 合并为一个 [`TelemetrySnapshot`]。
//!
//! **窗口语义**：
//! - 窗口从 `run()` 调用时开始计时
//! - 每次接收只等待窗口内的剩余时间，某一类消息迟到不会为另一类重新计时
//! - 剩余预算为零时仍会尝试一次接收，已排队的消息不会被忽略
//! - 窗口耗尽时返回 `Timeout`，已收到的半份数据随之丢弃（每个周期从零开始）

use crate::config::TelemetryConfig;
use crate::error::DriverError;
use crate::state::TelemetrySnapshot;
use kite_link::{Connection, LinkError, recv_as};
use kite_protocol::{Attitude, InboundMessage, LocalPositionNed, MessageKind, ProtocolError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// 遥测融合器
pub struct Telemetry<C> {
    connection: Arc<C>,
    fusion_timeout: Duration,
}

impl<C: Connection> Telemetry<C> {
    /// 创建融合器
    ///
    /// # 错误
    /// - `DriverError::ConnectionClosed`: 链路不可用
    /// - `DriverError::InvalidConfig`: 窗口不是正的有限秒数
    pub fn create(connection: Arc<C>, config: &TelemetryConfig) -> Result<Self, DriverError> {
        if !connection.is_open() {
            error!("Connection is not open");
            return Err(DriverError::ConnectionClosed {
                component: "Telemetry",
            });
        }
        config.validate()?;

        Ok(Self {
            connection,
            fusion_timeout: config.fusion_timeout(),
        })
    }

    pub fn fusion_timeout(&self) -> Duration {
        self.fusion_timeout
    }

    /// 执行一个融合周期
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 窗口内未收齐两类消息
    /// - `DriverError::Link`: 链路返回了超时以外的错误
    pub fn run(&mut self) -> Result<TelemetrySnapshot, DriverError> {
        let start = Instant::now();
        let mut attitude: Option<Attitude> = None;
        let mut position: Option<LocalPositionNed> = None;

        loop {
            if let (Some(att), Some(pos)) = (&attitude, &position) {
                let snapshot = TelemetrySnapshot::fuse(att, pos);
                debug!("Telemetry data: {}", snapshot);
                return Ok(snapshot);
            }

            // 剩余预算可能为零：仍尝试一次，已在队列中的消息照常取走
            let remaining = self.fusion_timeout.saturating_sub(start.elapsed());
            let received = if attitude.is_none() {
                attitude = self.receive(MessageKind::Attitude, remaining)?;
                attitude.is_some()
            } else {
                position = self.receive(MessageKind::LocalPositionNed, remaining)?;
                position.is_some()
            };

            if !received && start.elapsed() >= self.fusion_timeout {
                let missing = match (&attitude, &position) {
                    (None, None) => "ATTITUDE and LOCAL_POSITION_NED",
                    (None, Some(_)) => "ATTITUDE",
                    _ => "LOCAL_POSITION_NED",
                };
                error!("Timeout waiting for telemetry messages (missing {})", missing);
                return Err(DriverError::Timeout {
                    waited: start.elapsed(),
                    missing,
                });
            }
        }
    }

    /// 在 `budget` 内接收一条指定类型消息；超时返回 `Ok(None)`
    fn receive<T>(&self, kind: MessageKind, budget: Duration) -> Result<Option<T>, DriverError>
    where
        T: TryFrom<InboundMessage, Error = ProtocolError>,
    {
        match recv_as::<T, _>(&*self.connection, kind, budget) {
            Ok(msg) => {
                debug!("Received {} message", kind);
                Ok(Some(msg))
            },
            Err(LinkError::Timeout) => Ok(None),
            Err(e) => {
                error!("Failed to receive {}: {}", kind, e);
                Err(e.into())
            },
        }
    }
}

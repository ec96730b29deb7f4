//! # Kite Link Layer
//!
//! 飞行器链路抽象层，提供统一的收发接口。
//!
//! 真实的 MAVLink 帧编解码与串口/UDP IO 由具体实现负责；
//! 地面站核心只依赖 [`Connection`] trait。
//!
//! ## 实现
//!
//! - `SimConnection`（`sim` feature，默认启用）：进程内模拟飞行器
//! - `MockConnection`（`mock` feature）：可脚本化的测试替身

use kite_protocol::{InboundMessage, MessageKind, OutboundMessage, ProtocolError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockConnection;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "sim")]
pub use sim::{SimConfig, SimConnection};

// 重新导出协议层消息类型
pub use kite_protocol::{
    Attitude, CommandLong, Heartbeat, LocalPositionNed, MavCmd, YawDirection,
};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Read timeout")]
    Timeout,
    #[error("Link closed")]
    Closed,
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl LinkError {
    /// 是否为接收超时（正常情况，调用方通常跳过本周期）
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// 飞行器链路
///
/// 所有方法只需 `&self`：同一条链路以 `Arc<C>` 的形式在 worker 间共享，
/// 实现方负责内部同步。trait 不提供关闭操作，组件无法关闭链路。
pub trait Connection {
    /// 发送一条上行消息
    fn send(&self, msg: OutboundMessage) -> Result<(), LinkError>;

    /// 阻塞接收指定类型的下一条消息
    ///
    /// 最多等待 `timeout`；超时返回 [`LinkError::Timeout`]。
    /// `timeout` 为零时只检查已到达的消息。
    fn recv_match(&self, kind: MessageKind, timeout: Duration) -> Result<InboundMessage, LinkError>;

    /// 链路是否可用（组件构造时检查）
    fn is_open(&self) -> bool {
        true
    }

    /// 非阻塞接收
    fn try_recv_match(&self, kind: MessageKind) -> Result<Option<InboundMessage>, LinkError> {
        match self.recv_match(kind, Duration::ZERO) {
            Ok(msg) => Ok(Some(msg)),
            Err(LinkError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn send(&self, msg: OutboundMessage) -> Result<(), LinkError> {
        (**self).send(msg)
    }

    fn recv_match(&self, kind: MessageKind, timeout: Duration) -> Result<InboundMessage, LinkError> {
        (**self).recv_match(kind, timeout)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// 接收并解包为具体消息类型
///
/// 实现方返回了错误类型的消息时，报告 [`LinkError::Protocol`]。
pub fn recv_as<T, C>(conn: &C, kind: MessageKind, timeout: Duration) -> Result<T, LinkError>
where
    C: Connection + ?Sized,
    T: TryFrom<InboundMessage, Error = ProtocolError>,
{
    let msg = conn.recv_match(kind, timeout)?;
    Ok(T::try_from(msg)?)
}

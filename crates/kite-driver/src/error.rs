//! 驱动层错误类型定义

use kite_link::LinkError;
use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 链路错误（发送失败、链路关闭等）
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 构造组件时链路不可用
    #[error("Connection is not open, cannot create {component}")]
    ConnectionClosed { component: &'static str },

    /// 配置项非法（负数、NaN、零容量等）
    #[error("Invalid config: {field} = {value}")]
    InvalidConfig { field: &'static str, value: String },

    /// 在时间窗口内未收齐消息
    #[error("Timed out after {waited:?} waiting for {missing}")]
    Timeout {
        waited: Duration,
        missing: &'static str,
    },

    /// 队列对端已断开
    #[error("Queue disconnected")]
    QueueDisconnected,

    /// 工作线程错误
    #[error("Worker thread error: {0}")]
    WorkerThread(String),
}

impl DriverError {
    /// 是否为超时（跳过本周期即可）
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

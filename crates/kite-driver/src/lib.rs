//! 地面站决策层
//!
//! 本 crate 提供地面站的四个周期性组件及其运行框架：
//! - 遥测融合（ATTITUDE + LOCAL_POSITION_NED → [`TelemetrySnapshot`]）
//! - 链路健康监测（带迟滞的心跳接收）与心跳发送
//! - 制导决策（高度优先于航向）
//! - worker 线程、有界队列与协作式暂停/退出
//!
//! # 使用场景
//!
//! 大多数调用方只需要 [`GroundStationBuilder`]；单独的组件
//! （[`Telemetry`]、[`HeartbeatReceiver`]、[`HeartbeatSender`]、[`Guidance`]）
//! 可用于自定义调度或测试。

mod builder;
pub mod command;
mod config;
pub mod controller;
mod error;
pub mod heartbeat;
pub mod pipeline;
pub mod queue;
pub mod state;
mod station;
pub mod telemetry;

pub use builder::GroundStationBuilder;
pub use command::{Guidance, normalize_angle};
pub use config::{GuidanceConfig, HeartbeatConfig, StationConfig, TelemetryConfig};
pub use controller::WorkerController;
pub use error::DriverError;
pub use heartbeat::{HeartbeatReceiver, HeartbeatSender};
pub use pipeline::{
    WorkerStats, command_loop, heartbeat_receiver_loop, heartbeat_sender_loop, telemetry_loop,
};
pub use queue::{Packet, QueueReceiver, QueueSender, bounded};
pub use state::*;
pub use station::{GroundStation, WorkerReport};
pub use telemetry::Telemetry;

//! 消息 ID 与 MAVLink 枚举常量
//!
//! 只收录地面站核心实际用到的子集（common dialect）。

use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// 消息 ID 常量
// ============================================================================

/// HEARTBEAT (#0)
pub const MSG_ID_HEARTBEAT: u32 = 0;

/// ATTITUDE (#30)
pub const MSG_ID_ATTITUDE: u32 = 30;

/// LOCAL_POSITION_NED (#32)
pub const MSG_ID_LOCAL_POSITION_NED: u32 = 32;

// ============================================================================
// 指令寻址
// ============================================================================

/// 指令目标系统 ID（飞控）
pub const TARGET_SYSTEM: u8 = 1;

/// 指令目标组件 ID（0 = 广播给该系统的所有组件）
pub const TARGET_COMPONENT: u8 = 0;

/// MAV_CMD 子集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum MavCmd {
    /// MAV_CMD_CONDITION_CHANGE_ALT：以指定速率爬升/下降到目标高度
    ConditionChangeAlt = 113,
    /// MAV_CMD_CONDITION_YAW：转向到指定航向（绝对或相对）
    ConditionYaw = 115,
}

/// MAV_TYPE 子集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MavType {
    Generic = 0,
    Quadrotor = 2,
    /// 地面站
    Gcs = 6,
}

/// MAV_AUTOPILOT 子集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MavAutopilot {
    Generic = 0,
    ArduPilotMega = 3,
    /// 非飞控设备（地面站心跳使用）
    Invalid = 8,
}

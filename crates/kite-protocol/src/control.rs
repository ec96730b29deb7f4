//! 上行消息（地面站 → 飞行器）
//!
//! 提供 COMMAND_LONG 的类型安全构建方法，以及地面站心跳。

use crate::feedback::Heartbeat;
use crate::ids::{MavAutopilot, MavCmd, MavType, TARGET_COMPONENT, TARGET_SYSTEM};

/// MAV_CMD_CONDITION_YAW 的转向方向（param3）
///
/// 协议约定：1 = 逆时针，-1 = 顺时针（仅相对模式有效）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum YawDirection {
    CounterClockwise,
    Clockwise,
}

impl YawDirection {
    /// 由带符号角度推导方向：非负为逆时针
    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            Self::Clockwise
        } else {
            Self::CounterClockwise
        }
    }

    /// 作为 COMMAND_LONG 参数的取值
    pub fn as_param(self) -> f32 {
        match self {
            Self::CounterClockwise => 1.0,
            Self::Clockwise => -1.0,
        }
    }
}

/// COMMAND_LONG (#76)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandLong {
    pub target_system: u8,
    pub target_component: u8,
    pub command: MavCmd,
    pub confirmation: u8,
    /// param1..param7
    pub params: [f32; 7],
}

impl CommandLong {
    /// 通用构造器（固定寻址：system 1 / component 0）
    pub fn new(command: MavCmd, params: [f32; 7]) -> Self {
        Self {
            target_system: TARGET_SYSTEM,
            target_component: TARGET_COMPONENT,
            command,
            confirmation: 0,
            params,
        }
    }

    /// MAV_CMD_CONDITION_CHANGE_ALT
    ///
    /// - `rate`: 爬升/下降速率（m/s，param1）
    /// - `target_altitude`: 目标高度（m，param7，绝对值）
    pub fn change_altitude(rate: f32, target_altitude: f32) -> Self {
        Self::new(
            MavCmd::ConditionChangeAlt,
            [rate, 0.0, 0.0, 0.0, 0.0, 0.0, target_altitude],
        )
    }

    /// MAV_CMD_CONDITION_YAW
    ///
    /// - `angle_deg`: 转向角度（deg，param1，恒为非负幅值）
    /// - `rate`: 转向角速度（deg/s，param2）
    /// - `direction`: 转向方向（param3）
    /// - `relative`: 是否为相对当前航向（param4）
    pub fn condition_yaw(angle_deg: f32, rate: f32, direction: YawDirection, relative: bool) -> Self {
        Self::new(
            MavCmd::ConditionYaw,
            [
                angle_deg,
                rate,
                direction.as_param(),
                if relative { 1.0 } else { 0.0 },
                0.0,
                0.0,
                0.0,
            ],
        )
    }

    /// 获取第 `n` 个参数（1-based，与协议文档一致）；`n` 不在 1..=7 时返回 `None`
    pub fn param(&self, n: usize) -> Option<f32> {
        self.params.get(n.checked_sub(1)?).copied()
    }
}

impl Heartbeat {
    /// 地面站心跳（MAV_TYPE_GCS / MAV_AUTOPILOT_INVALID，模式与状态为 0）
    pub fn gcs() -> Self {
        Self {
            mav_type: MavType::Gcs.into(),
            autopilot: MavAutopilot::Invalid.into(),
            base_mode: 0,
            custom_mode: 0,
            system_status: 0,
        }
    }
}

/// 上行消息
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutboundMessage {
    CommandLong(CommandLong),
    Heartbeat(Heartbeat),
}

impl From<CommandLong> for OutboundMessage {
    fn from(cmd: CommandLong) -> Self {
        Self::CommandLong(cmd)
    }
}

impl From<Heartbeat> for OutboundMessage {
    fn from(hb: Heartbeat) -> Self {
        Self::Heartbeat(hb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_altitude_layout() {
        let cmd = CommandLong::change_altitude(1.5, 5.0);
        assert_eq!(cmd.command, MavCmd::ConditionChangeAlt);
        assert_eq!(cmd.target_system, 1);
        assert_eq!(cmd.target_component, 0);
        assert_eq!(cmd.confirmation, 0);
        assert_eq!(cmd.param(1), Some(1.5));
        assert_eq!(cmd.param(7), Some(5.0));
        assert_eq!(&cmd.params[1..6], &[0.0; 5]);
    }

    #[test]
    fn test_condition_yaw_layout() {
        let cmd = CommandLong::condition_yaw(30.0, 10.0, YawDirection::Clockwise, true);
        assert_eq!(cmd.command, MavCmd::ConditionYaw);
        assert_eq!(cmd.param(1), Some(30.0));
        assert_eq!(cmd.param(2), Some(10.0));
        assert_eq!(cmd.param(3), Some(-1.0));
        assert_eq!(cmd.param(4), Some(1.0));
    }

    #[test]
    fn test_yaw_direction_from_delta() {
        assert_eq!(YawDirection::from_delta(0.0), YawDirection::CounterClockwise);
        assert_eq!(YawDirection::from_delta(12.0), YawDirection::CounterClockwise);
        assert_eq!(YawDirection::from_delta(-0.5), YawDirection::Clockwise);
    }

    #[test]
    fn test_gcs_heartbeat() {
        let hb = Heartbeat::gcs();
        assert_eq!(hb.mav_type, 6);
        assert_eq!(hb.autopilot, 8);
        assert_eq!(hb.base_mode, 0);
        assert_eq!(hb.custom_mode, 0);
        assert_eq!(hb.system_status, 0);
    }

    #[test]
    fn test_param_out_of_range() {
        let cmd = CommandLong::change_altitude(1.0, 1.0);
        assert_eq!(cmd.param(0), None);
        assert_eq!(cmd.param(8), None);
        assert_eq!(cmd.param(7), Some(1.0));
    }
}

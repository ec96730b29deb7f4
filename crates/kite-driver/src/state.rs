//! 数据模型
//!
//! worker 之间传递的不可变值类型。

use kite_protocol::{Attitude, LocalPositionNed};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 三维位置（m）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 融合后的遥测快照
///
/// 位置/速度来自 LOCAL_POSITION_NED，姿态/角速度来自 ATTITUDE。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// 开机时间（ms），取两条源消息中较新的时间戳
    pub time_since_boot: u32,
    /// 位置（m）
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// 速度（m/s）
    pub x_velocity: f64,
    pub y_velocity: f64,
    pub z_velocity: f64,
    /// 姿态（rad）
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    /// 角速度（rad/s）
    pub roll_speed: f64,
    pub pitch_speed: f64,
    pub yaw_speed: f64,
}

impl TelemetrySnapshot {
    /// 按字段映射合并两条消息
    pub fn fuse(attitude: &Attitude, position: &LocalPositionNed) -> Self {
        Self {
            time_since_boot: attitude.time_boot_ms.max(position.time_boot_ms),
            x: f64::from(position.x),
            y: f64::from(position.y),
            z: f64::from(position.z),
            x_velocity: f64::from(position.vx),
            y_velocity: f64::from(position.vy),
            z_velocity: f64::from(position.vz),
            roll: f64::from(attitude.roll),
            pitch: f64::from(attitude.pitch),
            yaw: f64::from(attitude.yaw),
            roll_speed: f64::from(attitude.rollspeed),
            pitch_speed: f64::from(attitude.pitchspeed),
            yaw_speed: f64::from(attitude.yawspeed),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }

    /// 速度模长（m/s）
    pub fn speed(&self) -> f64 {
        (self.x_velocity.powi(2) + self.y_velocity.powi(2) + self.z_velocity.powi(2)).sqrt()
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={}ms pos=({:.3}, {:.3}, {:.3}) vel=({:.3}, {:.3}, {:.3}) \
             rpy=({:.4}, {:.4}, {:.4}) rates=({:.4}, {:.4}, {:.4})",
            self.time_since_boot,
            self.x,
            self.y,
            self.z,
            self.x_velocity,
            self.y_velocity,
            self.z_velocity,
            self.roll,
            self.pitch,
            self.yaw,
            self.roll_speed,
            self.pitch_speed,
            self.yaw_speed,
        )
    }
}

/// 链路健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    Connected,
    #[default]
    Disconnected,
}

impl HealthStatus {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("Connected"),
            Self::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// 单个制导周期的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandResult {
    /// 已发出高度修正；`delta_m` = 目标高度 − 当前高度
    ChangeAltitude { delta_m: f64 },
    /// 已发出航向修正；`delta_deg` 为带符号角度，范围 (−180, 180]
    ChangeYaw { delta_deg: f64 },
    /// 高度与航向均在容差内
    OnTarget,
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChangeAltitude { delta_m } => write!(f, "CHANGE_ALTITUDE: {}", delta_m),
            Self::ChangeYaw { delta_deg } => write!(f, "CHANGING_YAW: {}", delta_deg),
            Self::OnTarget => f.write_str("ON_TARGET"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_maps_fields() {
        let attitude = Attitude {
            time_boot_ms: 1000,
            roll: 0.1,
            pitch: -0.2,
            yaw: 1.5,
            rollspeed: 0.01,
            pitchspeed: 0.02,
            yawspeed: -0.03,
        };
        let position = LocalPositionNed {
            time_boot_ms: 1040,
            x: 1.0,
            y: 2.0,
            z: -3.5,
            vx: 0.5,
            vy: 0.25,
            vz: -0.125,
        };
        let snapshot = TelemetrySnapshot::fuse(&attitude, &position);

        assert_eq!(snapshot.time_since_boot, 1040);
        assert_eq!(snapshot.x, 1.0);
        assert_eq!(snapshot.y, 2.0);
        assert_eq!(snapshot.z, -3.5);
        assert_eq!(snapshot.x_velocity, 0.5);
        assert_eq!(snapshot.y_velocity, 0.25);
        assert_eq!(snapshot.z_velocity, -0.125);
        assert_eq!(snapshot.roll, f64::from(0.1f32));
        assert_eq!(snapshot.pitch, f64::from(-0.2f32));
        assert_eq!(snapshot.yaw, f64::from(1.5f32));
        assert_eq!(snapshot.roll_speed, f64::from(0.01f32));
        assert_eq!(snapshot.pitch_speed, f64::from(0.02f32));
        assert_eq!(snapshot.yaw_speed, f64::from(-0.03f32));
    }

    #[test]
    fn test_fuse_takes_later_timestamp() {
        let attitude = Attitude {
            time_boot_ms: 2500,
            ..Default::default()
        };
        let position = LocalPositionNed {
            time_boot_ms: 2100,
            ..Default::default()
        };
        assert_eq!(
            TelemetrySnapshot::fuse(&attitude, &position).time_since_boot,
            2500
        );
    }

    #[test]
    fn test_speed() {
        let snapshot = TelemetrySnapshot {
            x_velocity: 3.0,
            y_velocity: 4.0,
            ..Default::default()
        };
        assert_eq!(snapshot.speed(), 5.0);
    }

    #[test]
    fn test_health_status_default_and_display() {
        assert_eq!(HealthStatus::default(), HealthStatus::Disconnected);
        assert_eq!(HealthStatus::Connected.to_string(), "Connected");
        assert_eq!(HealthStatus::Disconnected.to_string(), "Disconnected");
        assert!(HealthStatus::Connected.is_connected());
    }

    #[test]
    fn test_command_result_display() {
        assert_eq!(
            CommandResult::ChangeAltitude { delta_m: 5.0 }.to_string(),
            "CHANGE_ALTITUDE: 5"
        );
        assert_eq!(
            CommandResult::ChangeYaw { delta_deg: -45.5 }.to_string(),
            "CHANGING_YAW: -45.5"
        );
        assert_eq!(CommandResult::OnTarget.to_string(), "ON_TARGET");
    }
}

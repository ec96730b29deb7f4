//! 制导决策
//!
//! 每个周期根据一份遥测快照做出至多一个决策，优先级严格为：
//! 1. 高度误差超出容差 → 发送 `MAV_CMD_CONDITION_CHANGE_ALT`
//! 2. 航向误差超出容差 → 发送 `MAV_CMD_CONDITION_YAW`（相对转向）
//! 3. 否则 `OnTarget`
//!
//! 高度修正总是优先于航向修正，即使航向误差更大。

use crate::config::GuidanceConfig;
use crate::error::DriverError;
use crate::state::{CommandResult, Position, TelemetrySnapshot};
use kite_link::Connection;
use kite_protocol::{CommandLong, YawDirection};
use std::f64::consts::{PI, TAU};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 超过此幅度先取模，避免逐次 ±2π 循环过长
const PRE_REDUCE_LIMIT: f64 = 64.0 * TAU;

/// 将角度（rad）规范到 (−π, π]
///
/// 非有限值原样返回。幅度超过 64·2π 的输入先用 `%`（fmod）约减，
/// 再进入逐次 ±2π 调整。
///
/// # Example
///
/// ```
/// use kite_driver::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert_eq!(normalize_angle(PI), PI);
/// assert_eq!(normalize_angle(-PI), PI);
/// assert!((normalize_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
/// ```
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }

    let mut angle = if angle.abs() > PRE_REDUCE_LIMIT {
        angle % TAU
    } else {
        angle
    };
    while angle > PI {
        angle -= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    angle
}

/// 制导器：对每份快照输出一个 [`CommandResult`]
pub struct Guidance<C> {
    connection: Arc<C>,
    target: Position,
    height_tolerance: f64,
    z_speed: f64,
    angle_tolerance: f64,
    turning_speed: f64,
    // 平均速度统计
    speed_sum: f64,
    samples: u64,
}

impl<C: Connection> Guidance<C> {
    /// 创建制导器
    ///
    /// # 错误
    /// - `DriverError::ConnectionClosed`: 链路不可用
    /// - `DriverError::InvalidConfig`: 容差/速率为负数或非有限值
    pub fn create(
        connection: Arc<C>,
        target: Position,
        config: &GuidanceConfig,
    ) -> Result<Self, DriverError> {
        if !connection.is_open() {
            error!("Connection is not open");
            return Err(DriverError::ConnectionClosed {
                component: "Guidance",
            });
        }
        config.validate()?;

        Ok(Self {
            connection,
            target,
            height_tolerance: config.height_tolerance,
            z_speed: config.z_speed,
            angle_tolerance: config.angle_tolerance,
            turning_speed: config.turning_speed,
            speed_sum: 0.0,
            samples: 0,
        })
    }

    pub fn target(&self) -> Position {
        self.target
    }

    /// 到目前为止所有快照速度模长的平均值（m/s）；尚无样本时为 `None`
    pub fn average_velocity(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.speed_sum / self.samples as f64)
    }

    /// 执行一个制导周期
    ///
    /// # 错误
    /// - `DriverError::Link`: 指令发送失败（本周期无结果）
    pub fn run(&mut self, telemetry: &TelemetrySnapshot) -> Result<CommandResult, DriverError> {
        self.record_velocity(telemetry);

        let altitude_delta = self.target.z - telemetry.z;
        if altitude_delta.abs() > self.height_tolerance {
            let command =
                CommandLong::change_altitude(self.z_speed as f32, self.target.z as f32);
            self.send(command)?;
            debug!(
                "Altitude {:.3} m off target, climbing to {:.3} m at {} m/s",
                altitude_delta, self.target.z, self.z_speed
            );
            return Ok(CommandResult::ChangeAltitude {
                delta_m: altitude_delta,
            });
        }

        let bearing = (self.target.y - telemetry.y).atan2(self.target.x - telemetry.x);
        let angle_delta_deg = normalize_angle(bearing - telemetry.yaw).to_degrees();
        if angle_delta_deg.abs() > self.angle_tolerance {
            // 线上发送幅值 + 方向，返回值保留符号
            let command = CommandLong::condition_yaw(
                angle_delta_deg.abs() as f32,
                self.turning_speed as f32,
                YawDirection::from_delta(angle_delta_deg),
                true,
            );
            self.send(command)?;
            debug!(
                "Heading {:.2} deg off target, turning at {} deg/s",
                angle_delta_deg, self.turning_speed
            );
            return Ok(CommandResult::ChangeYaw {
                delta_deg: angle_delta_deg,
            });
        }

        debug!("On target at {}", telemetry.position());
        Ok(CommandResult::OnTarget)
    }

    fn record_velocity(&mut self, telemetry: &TelemetrySnapshot) {
        self.speed_sum += telemetry.speed();
        self.samples += 1;
        info!(
            "Average velocity: {:.3} m/s over {} samples",
            self.speed_sum / self.samples as f64,
            self.samples
        );
    }

    fn send(&self, command: CommandLong) -> Result<(), DriverError> {
        self.connection.send(command.into()).map_err(|e| {
            error!("Failed to send {:?}: {}", command.command, e);
            DriverError::from(e)
        })
    }
}

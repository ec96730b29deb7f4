//! 构造期配置
//!
//! 所有时间量在配置文件中以秒（f64）表示，便于 TOML 书写；
//! 通过访问器转换为 `Duration`。
//!
//! # Example
//!
//! ```
//! use kite_driver::StationConfig;
//!
//! let config = StationConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.heartbeat.disconnect_threshold, 5);
//! ```

use crate::error::DriverError;
use crate::state::Position;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 检查数值为有限非负数
fn non_negative(field: &'static str, value: f64) -> Result<(), DriverError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DriverError::InvalidConfig {
            field,
            value: value.to_string(),
        })
    }
}

/// 检查时间量为正，且能表示为 `Duration`
fn positive_seconds(field: &'static str, value: f64) -> Result<(), DriverError> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(()),
        _ => Err(DriverError::InvalidConfig {
            field,
            value: value.to_string(),
        }),
    }
}

/// 将秒数转换为 `Duration`；未通过 [`positive_seconds`] 的值退化为零
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// 遥测融合配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// 融合窗口（秒）：两类消息必须在此窗口内全部到达
    pub fusion_timeout_s: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            fusion_timeout_s: 1.0,
        }
    }
}

impl TelemetryConfig {
    pub fn fusion_timeout(&self) -> Duration {
        seconds(self.fusion_timeout_s)
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        positive_seconds("telemetry.fusion_timeout_s", self.fusion_timeout_s)
    }
}

/// 心跳配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// 单次心跳接收超时（秒）
    pub timeout_s: f64,
    /// 连续丢失多少次心跳后判定断连
    pub disconnect_threshold: u32,
    /// 心跳发送周期（秒）
    pub period_s: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            timeout_s: 1.0,
            disconnect_threshold: 5,
            period_s: 1.0,
        }
    }
}

impl HeartbeatConfig {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_s)
    }

    pub fn period(&self) -> Duration {
        seconds(self.period_s)
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        positive_seconds("heartbeat.timeout_s", self.timeout_s)?;
        positive_seconds("heartbeat.period_s", self.period_s)?;
        if self.disconnect_threshold == 0 {
            return Err(DriverError::InvalidConfig {
                field: "heartbeat.disconnect_threshold",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// 制导配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// 高度容差（m）
    pub height_tolerance: f64,
    /// 垂直速率（m/s）
    pub z_speed: f64,
    /// 航向容差（deg）
    pub angle_tolerance: f64,
    /// 转向角速度（deg/s）
    pub turning_speed: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            height_tolerance: 0.5,
            z_speed: 1.0,
            angle_tolerance: 5.0,
            turning_speed: 5.0,
        }
    }
}

impl GuidanceConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        non_negative("guidance.height_tolerance", self.height_tolerance)?;
        non_negative("guidance.z_speed", self.z_speed)?;
        non_negative("guidance.angle_tolerance", self.angle_tolerance)?;
        non_negative("guidance.turning_speed", self.turning_speed)
    }
}

/// 地面站整体配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// 目标位置（m）
    pub target: Position,
    /// worker 之间队列的容量
    pub queue_capacity: usize,
    pub telemetry: TelemetryConfig,
    pub heartbeat: HeartbeatConfig,
    pub guidance: GuidanceConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            target: Position::new(10.0, 0.0, 5.0),
            queue_capacity: 5,
            telemetry: TelemetryConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            guidance: GuidanceConfig::default(),
        }
    }
}

impl StationConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        for (field, value) in [
            ("target.x", self.target.x),
            ("target.y", self.target.y),
            ("target.z", self.target.z),
        ] {
            if !value.is_finite() {
                return Err(DriverError::InvalidConfig {
                    field,
                    value: value.to_string(),
                });
            }
        }
        if self.queue_capacity == 0 {
            return Err(DriverError::InvalidConfig {
                field: "queue_capacity",
                value: "0".to_string(),
            });
        }
        self.telemetry.validate()?;
        self.heartbeat.validate()?;
        self.guidance.validate()
    }
}

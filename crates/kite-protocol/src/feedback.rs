//! 下行消息（飞行器 → 地面站）
//!
//! 字段命名与 MAVLink 定义保持一致（`rollspeed`、`vx` 等），
//! 便于对照协议文档。

use crate::ProtocolError;
use crate::ids::{MSG_ID_ATTITUDE, MSG_ID_HEARTBEAT, MSG_ID_LOCAL_POSITION_NED};
use std::fmt;

/// 消息类型（用于按类型接收）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    Heartbeat,
    Attitude,
    LocalPositionNed,
}

impl MessageKind {
    /// MAVLink 消息 ID
    pub fn msg_id(self) -> u32 {
        match self {
            Self::Heartbeat => MSG_ID_HEARTBEAT,
            Self::Attitude => MSG_ID_ATTITUDE,
            Self::LocalPositionNed => MSG_ID_LOCAL_POSITION_NED,
        }
    }

    /// MAVLink 消息名（大写，与 pymavlink / QGC 日志一致）
    pub fn name(self) -> &'static str {
        match self {
            Self::Heartbeat => "HEARTBEAT",
            Self::Attitude => "ATTITUDE",
            Self::LocalPositionNed => "LOCAL_POSITION_NED",
        }
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = ProtocolError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            MSG_ID_HEARTBEAT => Ok(Self::Heartbeat),
            MSG_ID_ATTITUDE => Ok(Self::Attitude),
            MSG_ID_LOCAL_POSITION_NED => Ok(Self::LocalPositionNed),
            _ => Err(ProtocolError::UnknownMessageId { id }),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ATTITUDE (#30)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attitude {
    /// 开机时间（毫秒）
    pub time_boot_ms: u32,
    /// 横滚角（rad）
    pub roll: f32,
    /// 俯仰角（rad）
    pub pitch: f32,
    /// 偏航角（rad）
    pub yaw: f32,
    /// 横滚角速度（rad/s）
    pub rollspeed: f32,
    /// 俯仰角速度（rad/s）
    pub pitchspeed: f32,
    /// 偏航角速度（rad/s）
    pub yawspeed: f32,
}

/// LOCAL_POSITION_NED (#32)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalPositionNed {
    /// 开机时间（毫秒）
    pub time_boot_ms: u32,
    /// 位置（m）
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// 速度（m/s）
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

/// HEARTBEAT (#0)
///
/// 上下行共用：飞行器周期性发送，地面站也以 1Hz 回发自己的心跳。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Heartbeat {
    /// MAV_TYPE 原始值
    pub mav_type: u8,
    /// MAV_AUTOPILOT 原始值
    pub autopilot: u8,
    pub base_mode: u8,
    pub custom_mode: u32,
    pub system_status: u8,
}

/// 下行消息
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InboundMessage {
    Heartbeat(Heartbeat),
    Attitude(Attitude),
    LocalPositionNed(LocalPositionNed),
}

impl InboundMessage {
    /// 消息类型
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Heartbeat(_) => MessageKind::Heartbeat,
            Self::Attitude(_) => MessageKind::Attitude,
            Self::LocalPositionNed(_) => MessageKind::LocalPositionNed,
        }
    }

    /// 开机时间戳（HEARTBEAT 不携带时间戳）
    pub fn time_boot_ms(&self) -> Option<u32> {
        match self {
            Self::Heartbeat(_) => None,
            Self::Attitude(msg) => Some(msg.time_boot_ms),
            Self::LocalPositionNed(msg) => Some(msg.time_boot_ms),
        }
    }
}

impl From<Heartbeat> for InboundMessage {
    fn from(msg: Heartbeat) -> Self {
        Self::Heartbeat(msg)
    }
}

impl From<Attitude> for InboundMessage {
    fn from(msg: Attitude) -> Self {
        Self::Attitude(msg)
    }
}

impl From<LocalPositionNed> for InboundMessage {
    fn from(msg: LocalPositionNed) -> Self {
        Self::LocalPositionNed(msg)
    }
}

macro_rules! impl_try_from_inbound {
    ($ty:ident, $kind:ident) => {
        impl TryFrom<InboundMessage> for $ty {
            type Error = ProtocolError;

            fn try_from(msg: InboundMessage) -> Result<Self, Self::Error> {
                match msg {
                    InboundMessage::$kind(inner) => Ok(inner),
                    other => Err(ProtocolError::UnexpectedMessage {
                        expected: MessageKind::$kind,
                        actual: other.kind(),
                    }),
                }
            }
        }
    };
}

impl_try_from_inbound!(Heartbeat, Heartbeat);
impl_try_from_inbound!(Attitude, Attitude);
impl_try_from_inbound!(LocalPositionNed, LocalPositionNed);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MavAutopilot, MavType};

    #[test]
    fn test_message_kind_ids() {
        assert_eq!(MessageKind::Attitude.msg_id(), 30);
        assert_eq!(MessageKind::LocalPositionNed.msg_id(), 32);
        assert_eq!(MessageKind::try_from(0).unwrap(), MessageKind::Heartbeat);
        assert!(matches!(
            MessageKind::try_from(33),
            Err(ProtocolError::UnknownMessageId { id: 33 })
        ));
    }

    #[test]
    fn test_message_kind_display() {
        assert_eq!(MessageKind::LocalPositionNed.to_string(), "LOCAL_POSITION_NED");
    }

    #[test]
    fn test_inbound_timestamp() {
        let att = InboundMessage::from(Attitude {
            time_boot_ms: 1200,
            ..Default::default()
        });
        assert_eq!(att.kind(), MessageKind::Attitude);
        assert_eq!(att.time_boot_ms(), Some(1200));

        let hb = InboundMessage::from(Heartbeat {
            mav_type: MavType::Quadrotor.into(),
            autopilot: MavAutopilot::ArduPilotMega.into(),
            base_mode: 0,
            custom_mode: 0,
            system_status: 4,
        });
        assert_eq!(hb.time_boot_ms(), None);
    }

    #[test]
    fn test_try_from_wrong_kind() {
        let msg = InboundMessage::from(LocalPositionNed::default());
        let err = Attitude::try_from(msg).unwrap_err();
        match err {
            ProtocolError::UnexpectedMessage { expected, actual } => {
                assert_eq!(expected, MessageKind::Attitude);
                assert_eq!(actual, MessageKind::LocalPositionNed);
            },
            other => panic!("Expected UnexpectedMessage, got {:?}", other),
        }
    }
}

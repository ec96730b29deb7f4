//! # Kite Protocol
//!
//! 地面站核心使用的 MAVLink 消息子集（无 IO 依赖）
//!
//! ## 模块
//!
//! - `ids`: 消息 ID、MAV_CMD / MAV_TYPE / MAV_AUTOPILOT 常量
//! - `feedback`: 下行消息（ATTITUDE、LOCAL_POSITION_NED、HEARTBEAT）
//! - `control`: 上行消息（COMMAND_LONG、地面站 HEARTBEAT）
//!
//! 帧编解码（MAVLink v2 framing、CRC）由传输层负责，不在本 crate 范围内。

pub mod control;
pub mod feedback;
pub mod ids;

// 重新导出常用类型
pub use control::*;
pub use feedback::*;
pub use ids::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown message id: {id}")]
    UnknownMessageId { id: u32 },

    #[error("Unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        expected: MessageKind,
        actual: MessageKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnknownMessageId { id: 999 };
        assert_eq!(err.to_string(), "Unknown message id: 999");

        let err = ProtocolError::UnexpectedMessage {
            expected: MessageKind::Attitude,
            actual: MessageKind::Heartbeat,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected message: expected ATTITUDE, got HEARTBEAT"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_command_long() {
        let cmd = OutboundMessage::from(CommandLong::change_altitude(1.0, 10.0));
        let json = serde_json::to_string(&cmd).unwrap();
        let decoded: OutboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, decoded);
    }
}

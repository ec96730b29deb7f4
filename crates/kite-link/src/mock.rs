//! Mock 链路
//!
//! 可脚本化的测试替身：按类型排队下行消息（可从其他线程延迟注入），
//! 记录所有上行消息，并可模拟发送失败与链路关闭。
//!
//! 与真实 `recv_match` 不同，这里的下行消息按类型分队列保存，
//! 等待某一类型时不会丢弃其他类型的消息。

use crate::{Connection, LinkError};
use kite_protocol::{InboundMessage, MessageKind, OutboundMessage};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Default)]
struct MockState {
    inbox: HashMap<MessageKind, VecDeque<InboundMessage>>,
    sent: Vec<OutboundMessage>,
    /// 每次 recv_match 调用的 (类型, 超时)
    recv_calls: Vec<(MessageKind, Duration)>,
    closed: bool,
    fail_sends: bool,
}

/// Mock 链路
#[derive(Default)]
pub struct MockConnection {
    state: Mutex<MockState>,
    arrived: Condvar,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入一条下行消息（唤醒等待中的接收方）
    pub fn push(&self, msg: impl Into<InboundMessage>) {
        let msg = msg.into();
        let mut state = self.state.lock();
        state.inbox.entry(msg.kind()).or_default().push_back(msg);
        drop(state);
        self.arrived.notify_all();
    }

    /// 在 `delay` 之后从后台线程注入一条消息
    pub fn push_after(
        self: &Arc<Self>,
        delay: Duration,
        msg: impl Into<InboundMessage>,
    ) -> JoinHandle<()> {
        let conn = Arc::clone(self);
        let msg = msg.into();
        thread::spawn(move || {
            thread::sleep(delay);
            conn.push(msg);
        })
    }

    /// 已发送的上行消息（按发送顺序）
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.state.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// 所有接收调用的 (类型, 超时) 记录
    pub fn recv_calls(&self) -> Vec<(MessageKind, Duration)> {
        self.state.lock().recv_calls.clone()
    }

    /// 指定类型尚未被取走的消息数
    pub fn pending(&self, kind: MessageKind) -> usize {
        self.state.lock().inbox.get(&kind).map_or(0, VecDeque::len)
    }

    /// 让后续发送全部失败
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    /// 关闭链路（唤醒所有等待中的接收方）
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.arrived.notify_all();
    }
}

impl Connection for MockConnection {
    fn send(&self, msg: OutboundMessage) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LinkError::Closed);
        }
        if state.fail_sends {
            return Err(LinkError::SendFailed("mock send failure".to_string()));
        }
        state.sent.push(msg);
        Ok(())
    }

    fn recv_match(&self, kind: MessageKind, timeout: Duration) -> Result<InboundMessage, LinkError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        state.recv_calls.push((kind, timeout));

        loop {
            if state.closed {
                return Err(LinkError::Closed);
            }
            if let Some(msg) = state.inbox.get_mut(&kind).and_then(VecDeque::pop_front) {
                return Ok(msg);
            }
            if self.arrived.wait_until(&mut state, deadline).timed_out() {
                // 超时前最后一刻到达的消息仍然有效
                return match state.inbox.get_mut(&kind).and_then(VecDeque::pop_front) {
                    Some(msg) => Ok(msg),
                    None => Err(LinkError::Timeout),
                };
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.state.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_protocol::{Attitude, CommandLong, Heartbeat};

    #[test]
    fn test_recv_returns_queued_message() {
        let conn = MockConnection::new();
        conn.push(Heartbeat::gcs());
        let msg = conn
            .recv_match(MessageKind::Heartbeat, Duration::from_millis(10))
            .unwrap();
        assert_eq!(msg.kind(), MessageKind::Heartbeat);
        assert_eq!(conn.pending(MessageKind::Heartbeat), 0);
    }

    #[test]
    fn test_recv_keeps_other_kinds() {
        let conn = MockConnection::new();
        conn.push(Heartbeat::gcs());
        let err = conn
            .recv_match(MessageKind::Attitude, Duration::from_millis(10))
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(conn.pending(MessageKind::Heartbeat), 1);
    }

    #[test]
    fn test_recv_times_out_after_budget() {
        let conn = MockConnection::new();
        let start = Instant::now();
        let err = conn
            .recv_match(MessageKind::Attitude, Duration::from_millis(50))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(
            conn.recv_calls(),
            vec![(MessageKind::Attitude, Duration::from_millis(50))]
        );
    }

    #[test]
    fn test_push_after_wakes_receiver() {
        let conn = Arc::new(MockConnection::new());
        let handle = conn.push_after(
            Duration::from_millis(30),
            Attitude {
                time_boot_ms: 42,
                ..Default::default()
            },
        );
        let start = Instant::now();
        let msg = conn
            .recv_match(MessageKind::Attitude, Duration::from_secs(2))
            .unwrap();
        assert_eq!(msg.time_boot_ms(), Some(42));
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().unwrap();
    }

    #[test]
    fn test_send_records_and_fails() {
        let conn = MockConnection::new();
        let cmd = CommandLong::change_altitude(1.0, 3.0);
        conn.send(cmd.into()).unwrap();
        assert_eq!(conn.sent(), vec![OutboundMessage::CommandLong(cmd)]);

        conn.set_fail_sends(true);
        assert!(matches!(
            conn.send(Heartbeat::gcs().into()),
            Err(LinkError::SendFailed(_))
        ));
        assert_eq!(conn.sent().len(), 1);
    }

    #[test]
    fn test_close_unblocks_receiver() {
        let conn = Arc::new(MockConnection::new());
        let closer = {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                conn.close();
            })
        };
        let err = conn
            .recv_match(MessageKind::Heartbeat, Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, LinkError::Closed));
        assert!(!conn.is_open());
        closer.join().unwrap();
    }
}

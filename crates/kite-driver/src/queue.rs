//! worker 之间的有界 FIFO 队列
//!
//! 基于 `crossbeam-channel` 的薄封装，增加一个带外的结束标记
//! [`Packet::EndOfStream`]：生产者在关闭前投递它，消费者收到后退出循环。
//! 对端全部断开时，`get` 同样返回 `EndOfStream`。

use crate::error::DriverError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::time::Duration;

/// 队列中的一项
#[derive(Debug, Clone, PartialEq)]
pub enum Packet<T> {
    Data(T),
    /// 生产端已结束
    EndOfStream,
}

impl<T> Packet<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(item) => Some(item),
            Self::EndOfStream => None,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// 创建容量为 `capacity` 的队列
///
/// `capacity` 为 0 时按 1 处理（crossbeam 的 0 容量是 rendezvous 通道）。
pub fn bounded<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (QueueSender { inner: tx }, QueueReceiver { inner: rx })
}

/// 生产端
#[derive(Debug)]
pub struct QueueSender<T> {
    inner: Sender<Packet<T>>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// 阻塞投递；队列满时等待空位
    pub fn put(&self, item: T) -> Result<(), DriverError> {
        self.inner
            .send(Packet::Data(item))
            .map_err(|_| DriverError::QueueDisconnected)
    }

    /// 阻塞投递结束标记
    pub fn put_end_of_stream(&self) -> Result<(), DriverError> {
        self.inner
            .send(Packet::EndOfStream)
            .map_err(|_| DriverError::QueueDisconnected)
    }

    /// 非阻塞投递结束标记，队列满或已断开时返回 `false`
    pub fn try_put_end_of_stream(&self) -> bool {
        match self.inner.try_send(Packet::EndOfStream) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// 消费端
#[derive(Debug)]
pub struct QueueReceiver<T> {
    inner: Receiver<Packet<T>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// 阻塞取出一项；生产端全部断开时返回 `EndOfStream`
    pub fn get(&self) -> Packet<T> {
        self.inner.recv().unwrap_or(Packet::EndOfStream)
    }

    /// 最多等待 `timeout`；超时返回 `None`
    pub fn get_timeout(&self, timeout: Duration) -> Option<Packet<T>> {
        match self.inner.recv_timeout(timeout) {
            Ok(packet) => Some(packet),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Packet::EndOfStream),
        }
    }

    /// 非阻塞取出
    pub fn try_get(&self) -> Option<Packet<T>> {
        match self.inner.try_recv() {
            Ok(packet) => Some(packet),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Packet::EndOfStream),
        }
    }

    /// 取走当前所有数据项（遇到结束标记即停止）
    pub fn drain(&self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(packet) = self.inner.try_recv() {
            match packet {
                Packet::Data(item) => items.push(item),
                Packet::EndOfStream => break,
            }
        }
        items
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

//! worker 的协作式暂停/退出控制
//!
//! 所有 worker 共享同一个 [`WorkerController`]。退出与暂停都是协作式的：
//! worker 在每个周期开始时检查退出标志，并调用 `check_pause()`。

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Shared {
    exit: AtomicBool,
    paused: Mutex<bool>,
    resumed: Condvar,
}

/// 暂停/退出控制句柄（克隆后共享同一状态）
#[derive(Clone)]
pub struct WorkerController {
    shared: Arc<Shared>,
}

impl Default for WorkerController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorkerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerController")
            .field("exit_requested", &self.is_exit_requested())
            .field("paused", &self.is_paused())
            .finish()
    }
}

impl WorkerController {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                exit: AtomicBool::new(false),
                paused: Mutex::new(false),
                resumed: Condvar::new(),
            }),
        }
    }

    /// 请求所有 worker 退出，同时唤醒处于暂停中的 worker
    pub fn request_exit(&self) {
        // Release: worker 看到 true 时，之前的写入对其可见
        self.shared.exit.store(true, Ordering::Release);
        let _paused = self.shared.paused.lock();
        self.shared.resumed.notify_all();
    }

    pub fn is_exit_requested(&self) -> bool {
        self.shared.exit.load(Ordering::Acquire)
    }

    pub fn request_pause(&self) {
        *self.shared.paused.lock() = true;
    }

    pub fn request_resume(&self) {
        let mut paused = self.shared.paused.lock();
        *paused = false;
        self.shared.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.paused.lock()
    }

    /// 暂停期间阻塞调用线程，直到恢复或请求退出
    pub fn check_pause(&self) {
        let mut paused = self.shared.paused.lock();
        while *paused && !self.is_exit_requested() {
            self.shared.resumed.wait(&mut paused);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_initial_state() {
        let controller = WorkerController::new();
        assert!(!controller.is_exit_requested());
        assert!(!controller.is_paused());
        // 未暂停时立即返回
        controller.check_pause();
    }

    #[test]
    fn test_exit_visible_to_clones() {
        let controller = WorkerController::new();
        let clone = controller.clone();
        controller.request_exit();
        assert!(clone.is_exit_requested());
    }

    #[test]
    fn test_check_pause_blocks_until_resume() {
        let controller = WorkerController::new();
        controller.request_pause();

        let worker = {
            let controller = controller.clone();
            thread::spawn(move || {
                let start = Instant::now();
                controller.check_pause();
                start.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(80));
        controller.request_resume();
        let blocked = worker.join().unwrap();
        assert!(blocked >= Duration::from_millis(60), "blocked {:?}", blocked);
    }

    #[test]
    fn test_exit_releases_paused_worker() {
        let controller = WorkerController::new();
        controller.request_pause();

        let worker = {
            let controller = controller.clone();
            thread::spawn(move || {
                controller.check_pause();
                controller.is_exit_requested()
            })
        };

        thread::sleep(Duration::from_millis(30));
        controller.request_exit();
        assert!(worker.join().unwrap());
        assert!(controller.is_paused());
    }
}

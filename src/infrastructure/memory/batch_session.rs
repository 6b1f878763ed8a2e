//! In-Memory Batch Session Implementation

use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::ports::{BatchSessionPort, SessionError};
use crate::domain::batch::{BatchRun, ImagePayload, ItemQueue, QueueWarning};

#[derive(Debug, Default)]
struct SessionState {
    queue: ItemQueue,
    running: bool,
    last_run: Option<BatchRun>,
}

/// 内存批次会话
pub struct InMemoryBatchSession {
    state: Mutex<SessionState>,
}

impl InMemoryBatchSession {
    pub fn new(max_items: usize) -> Self {
        Self {
            state: Mutex::new(SessionState {
                queue: ItemQueue::new(max_items),
                running: false,
                last_run: None,
            }),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // 状态只做简单赋值，锁中毒后数据仍然一致
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryBatchSession {
    fn default() -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
        }
    }
}

impl BatchSessionPort for InMemoryBatchSession {
    fn submit(&self, files: Vec<ImagePayload>) -> Result<Option<QueueWarning>, SessionError> {
        let mut state = self.lock();
        if state.running {
            return Err(SessionError::AlreadyRunning);
        }

        let count = files.len();
        let warning = state.queue.submit(files);
        if count > 0 {
            // 新的选择使上一次结果失效
            state.last_run = None;
        }
        tracing::info!(
            submitted = count,
            queued = state.queue.len(),
            truncated = warning.is_some(),
            "Queue submitted"
        );
        Ok(warning)
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut state = self.lock();
        if state.running {
            return Err(SessionError::AlreadyRunning);
        }
        state.queue.clear();
        state.last_run = None;
        tracing::info!("Queue cleared");
        Ok(())
    }

    fn begin_run(&self) -> Result<BatchRun, SessionError> {
        let mut state = self.lock();
        if state.running {
            return Err(SessionError::AlreadyRunning);
        }
        if state.queue.is_empty() {
            return Err(SessionError::EmptyQueue);
        }

        // 队列保留，同一选择可以再次运行
        let run = BatchRun::new(state.queue.fresh_items());
        state.running = true;
        state.last_run = None;
        tracing::info!(run_id = %run.id(), items = run.len(), "Batch run created");
        Ok(run)
    }

    fn finish_run(&self, run: BatchRun) {
        let mut state = self.lock();
        tracing::info!(run_id = %run.id(), "Batch run stored");
        state.running = false;
        state.last_run = Some(run);
    }

    fn last_run(&self) -> Result<BatchRun, SessionError> {
        self.lock().last_run.clone().ok_or(SessionError::NotFound)
    }

    fn queue(&self) -> ItemQueue {
        self.lock().queue.clone()
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }
}

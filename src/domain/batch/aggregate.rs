//! Batch Context - Aggregate Root

use chrono::{DateTime, Utc};
use std::ops::Range;

use super::{BatchError, BatchRunId, ItemOutcome, Progress, WorkItem};

/// BatchRun 聚合根
///
/// 不变量:
/// - 独占其所有 WorkItem，运行期间只有调度器可以修改
/// - items[i].index() == i
/// - running 期间不能再次 start
#[derive(Debug, Clone)]
pub struct BatchRun {
    id: BatchRunId,
    items: Vec<WorkItem>,
    running: bool,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl BatchRun {
    /// 从队列取出的工作项创建批次，按位置重新编号
    pub fn new(items: Vec<WorkItem>) -> Self {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                if item.index() == index {
                    item
                } else {
                    WorkItem::new(index, item.payload().clone())
                }
            })
            .collect();

        Self {
            id: BatchRunId::new(),
            items,
            running: false,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), BatchError> {
        if self.running {
            return Err(BatchError::AlreadyRunning);
        }
        self.running = true;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), BatchError> {
        if !self.running {
            return Err(BatchError::NotRunning);
        }
        self.running = false;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// 更新单项进度，返回是否发生变化
    pub fn set_progress(&mut self, index: usize, progress: Progress) -> Result<bool, BatchError> {
        let item = self.item_mut(index)?;
        if item.is_terminal() {
            return Ok(false);
        }
        Ok(item.advance_progress(progress))
    }

    pub fn record_attempt(&mut self, index: usize) -> Result<(), BatchError> {
        self.item_mut(index)?.record_attempt();
        Ok(())
    }

    /// 写入单项终态，每项只能写一次
    pub fn resolve(&mut self, index: usize, outcome: ItemOutcome) -> Result<(), BatchError> {
        self.item_mut(index)?.resolve(outcome)
    }

    /// 按并发上限划分窗口，窗口 k 覆盖 `[k*limit, k*limit+limit)`
    pub fn windows(&self, limit: usize) -> Vec<Range<usize>> {
        let limit = limit.max(1);
        (0..self.items.len())
            .step_by(limit)
            .map(|start| start..(start + limit).min(self.items.len()))
            .collect()
    }

    // Getters
    pub fn id(&self) -> BatchRunId {
        self.id
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_complete(&self) -> bool {
        self.items.iter().all(WorkItem::is_terminal)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut WorkItem, BatchError> {
        self.items
            .get_mut(index)
            .ok_or(BatchError::ItemNotFound(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{
        Classification, Confidence, ImageFormat, ImagePayload, Prediction,
    };

    fn run_with(count: usize) -> BatchRun {
        let items = (0..count)
            .map(|i| {
                let payload =
                    ImagePayload::new(format!("{}.jpg", i), ImageFormat::Jpeg, vec![0xFF]).unwrap();
                WorkItem::new(i, payload)
            })
            .collect();
        BatchRun::new(items)
    }

    fn negative() -> Prediction {
        Prediction::new(
            Classification::Negative,
            Confidence::new(0.9).unwrap(),
            None,
        )
    }

    #[test]
    fn test_windows_partition_in_order() {
        let run = run_with(7);
        assert_eq!(run.windows(3), vec![0..3, 3..6, 6..7]);
        assert!(run_with(0).windows(3).is_empty());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut run = run_with(1);
        run.start().unwrap();
        assert!(matches!(run.start(), Err(BatchError::AlreadyRunning)));
        run.finish().unwrap();
        assert!(!run.is_running());
        assert!(run.finished_at().is_some());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut run = run_with(1);
        assert!(run.set_progress(0, Progress::SENT).unwrap());
        assert!(!run.set_progress(0, Progress::new(10)).unwrap());
        assert_eq!(run.item(0).unwrap().progress(), Progress::SENT);
    }

    #[test]
    fn test_resolve_only_once() {
        let mut run = run_with(2);
        run.resolve(0, ItemOutcome::Success { prediction: negative() })
            .unwrap();
        assert_eq!(run.item(0).unwrap().progress(), Progress::DONE);

        let again = run.resolve(
            0,
            ItemOutcome::Failure {
                message: "late".to_string(),
            },
        );
        assert!(matches!(again, Err(BatchError::AlreadyResolved(0))));
        assert_eq!(run.item(0).unwrap().outcome().as_str(), "success");

        assert!(matches!(
            run.resolve(1, ItemOutcome::Pending),
            Err(BatchError::InvalidTransition(1))
        ));
        assert!(matches!(
            run.resolve(5, ItemOutcome::Pending),
            Err(BatchError::ItemNotFound(5))
        ));
    }

    #[test]
    fn test_progress_ignored_after_resolve() {
        let mut run = run_with(1);
        run.resolve(
            0,
            ItemOutcome::Failure {
                message: "boom".to_string(),
            },
        )
        .unwrap();
        assert!(!run.set_progress(0, Progress::SENT).unwrap());
        assert!(run.is_complete());
    }
}

//! Batch Scheduler - 按窗口限制并发的批量上传

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::retrying_uploader::{ItemUpdate, RetryingUploader, UploadResult};
use crate::domain::batch::{BatchError, BatchReport, BatchRun, ImagePayload};
use crate::infrastructure::events::EventPublisher;

/// 调度器配置
#[derive(Debug, Clone)]
pub struct BatchSchedulerConfig {
    /// 同时在途的最大上传数（窗口大小）
    pub concurrency: usize,
}

impl Default for BatchSchedulerConfig {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

/// 批次调度器
///
/// 把队列按顺序切成大小为 `concurrency` 的窗口，窗口内并发上传，
/// 整个窗口进入终态后才开始下一个窗口。所有上传在调用方的任务上
/// 协作式运行，BatchRun 只由调度器写入。
pub struct BatchScheduler {
    config: BatchSchedulerConfig,
    uploader: RetryingUploader,
    event_publisher: Arc<EventPublisher>,
}

impl BatchScheduler {
    pub fn new(
        config: BatchSchedulerConfig,
        uploader: RetryingUploader,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            uploader,
            event_publisher,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// 运行批次直到所有工作项进入终态
    ///
    /// 单项失败不会中断批次；完成事件在最后一个窗口之后发送一次
    pub async fn run(&self, run: &mut BatchRun) -> Result<BatchReport, BatchError> {
        run.start()?;

        let windows = run.windows(self.concurrency());
        tracing::info!(
            run_id = %run.id(),
            items = run.len(),
            windows = windows.len(),
            concurrency = self.concurrency(),
            "Batch run started"
        );

        for (window_index, window) in windows.into_iter().enumerate() {
            let jobs: Vec<(usize, ImagePayload)> = run.items()[window.clone()]
                .iter()
                .map(|item| (item.index(), item.payload().clone()))
                .collect();

            tracing::debug!(
                run_id = %run.id(),
                window = window_index,
                start = window.start,
                end = window.end,
                "Launching window"
            );

            let (tx, mut rx) = mpsc::unbounded_channel();
            let uploads = join_all(
                jobs.iter()
                    .map(|(index, payload)| self.uploader.upload(*index, payload, tx.clone())),
            );
            drop(tx);

            let apply_updates = async {
                while let Some(update) = rx.recv().await {
                    self.apply_update(run, update);
                }
            };

            let (results, ()) = tokio::join!(uploads, apply_updates);

            for result in results {
                self.complete_item(run, result);
            }
        }

        if let Err(e) = run.finish() {
            tracing::error!(run_id = %run.id(), error = %e, "Failed to finish batch run");
        }

        let report = BatchReport::from_run(run);
        tracing::info!(
            run_id = %run.id(),
            total = report.summary.total,
            positive = report.summary.positive,
            negative = report.summary.negative,
            failed = report.summary.failed,
            "Batch run completed"
        );
        self.event_publisher
            .publish_batch_completed(run.id(), report.summary);

        Ok(report)
    }

    fn apply_update(&self, run: &mut BatchRun, update: ItemUpdate) {
        match update {
            ItemUpdate::Attempt { index } => {
                if let Err(e) = run.record_attempt(index) {
                    tracing::error!(index = index, error = %e, "Failed to record attempt");
                }
            }
            ItemUpdate::Progress { index, progress } => match run.set_progress(index, progress) {
                Ok(true) => {
                    self.event_publisher
                        .publish_item_progress(run.id(), index, progress.percent());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(index = index, error = %e, "Failed to update progress");
                }
            },
        }
    }

    fn complete_item(&self, run: &mut BatchRun, result: UploadResult) {
        let UploadResult {
            index,
            attempts,
            outcome,
        } = result;

        if let Err(e) = run.resolve(index, outcome.clone()) {
            tracing::error!(index = index, error = %e, "Failed to resolve item");
            return;
        }

        self.event_publisher
            .publish_item_progress(run.id(), index, 100);
        self.event_publisher
            .publish_item_completed(run.id(), index, attempts, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{
        ImageFormat, ItemQueue, ItemOutcome, Progress, WorkItem,
    };
    use crate::infrastructure::adapters::{FakePredictionClient, FakeReply};
    use crate::infrastructure::events::BatchEvent;
    use crate::infrastructure::worker::RetryPolicy;
    use std::time::Duration;

    fn run_with(count: usize) -> BatchRun {
        let files = (0..count)
            .map(|i| {
                ImagePayload::new(format!("img_{}.png", i), ImageFormat::Png, vec![i as u8])
                    .unwrap()
            })
            .collect();
        let mut queue = ItemQueue::default();
        queue.submit(files);
        BatchRun::new(queue.fresh_items())
    }

    fn scheduler(client: Arc<FakePredictionClient>, publisher: Arc<EventPublisher>) -> BatchScheduler {
        BatchScheduler::new(
            BatchSchedulerConfig::default(),
            RetryingUploader::new(client, RetryPolicy::default()),
            publisher,
        )
    }

    #[tokio::test]
    async fn test_at_most_three_in_flight() {
        let client = Arc::new(FakePredictionClient::new().with_delay(Duration::from_millis(5)));
        let publisher = Arc::new(EventPublisher::new());
        let scheduler = scheduler(client.clone(), publisher);

        let mut run = run_with(10);
        let report = scheduler.run(&mut run).await.unwrap();

        assert_eq!(client.max_in_flight(), 3);
        assert_eq!(client.total_calls(), 10);
        assert_eq!(report.results.len(), 10);
        assert!(report.results.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn test_windows_run_in_index_order() {
        let client = Arc::new(FakePredictionClient::new());
        let publisher = Arc::new(EventPublisher::new());
        let scheduler = scheduler(client.clone(), publisher);

        let mut run = run_with(7);
        scheduler.run(&mut run).await.unwrap();

        let order = client.call_order();
        let window_of = |name: &String| {
            let index: usize = name
                .trim_start_matches("img_")
                .trim_end_matches(".png")
                .parse()
                .unwrap();
            index / 3
        };
        let windows: Vec<usize> = order.iter().map(window_of).collect();
        let mut sorted = windows.clone();
        sorted.sort();
        assert_eq!(windows, sorted);
    }

    #[tokio::test]
    async fn test_failures_do_not_block_window_mates() {
        let client = Arc::new(FakePredictionClient::new());
        client.script(
            "img_1.png",
            vec![
                FakeReply::network_error(),
                FakeReply::network_error(),
                FakeReply::network_error(),
            ],
        );
        client.script(
            "img_3.png",
            vec![
                FakeReply::network_error(),
                FakeReply::network_error(),
                FakeReply::positive(Some([10.0, 20.0, 110.0, 220.0])),
            ],
        );
        let publisher = Arc::new(EventPublisher::new());
        let scheduler = scheduler(client.clone(), publisher);

        let mut run = run_with(5);
        let report = scheduler.run(&mut run).await.unwrap();

        assert!(!run.is_running());
        assert!(run.is_complete());
        for item in run.items() {
            assert_eq!(item.progress(), Progress::DONE);
        }

        assert_eq!(client.calls("img_1.png"), 3);
        assert_eq!(run.item(1).unwrap().attempts(), 3);
        assert_eq!(
            report.errors[1].as_deref(),
            Some("Failed to upload image 2.")
        );
        assert!(report.results[1].is_none());

        assert_eq!(run.item(3).unwrap().attempts(), 3);
        assert!(matches!(
            run.item(3).unwrap().outcome(),
            ItemOutcome::Success { .. }
        ));
        assert_eq!(report.summary.positive, 1);
        assert_eq!(report.summary.negative, 3);
        assert_eq!(report.summary.failed, 1);
    }

    #[tokio::test]
    async fn test_completion_signalled_once_when_everything_fails() {
        let client = Arc::new(FakePredictionClient::new().with_default(FakeReply::network_error()));
        let publisher = Arc::new(EventPublisher::new());
        let mut events = publisher.subscribe();
        let scheduler = scheduler(client, publisher.clone());

        let mut run = run_with(4);
        let report = scheduler.run(&mut run).await.unwrap();
        assert_eq!(report.errors.iter().flatten().count(), 4);

        let mut completed = 0;
        let mut item_completed = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                BatchEvent::BatchCompleted { summary, .. } => {
                    completed += 1;
                    assert_eq!(summary.failed, 4);
                }
                BatchEvent::ItemCompleted { attempts, .. } => {
                    item_completed += 1;
                    assert_eq!(attempts, 3);
                }
                _ => {}
            }
        }
        assert_eq!(completed, 1);
        assert_eq!(item_completed, 4);
    }

    #[tokio::test]
    async fn test_running_run_is_rejected() {
        let client = Arc::new(FakePredictionClient::new());
        let scheduler = scheduler(client.clone(), Arc::new(EventPublisher::new()));

        let mut run = run_with(2);
        run.start().unwrap();
        assert!(matches!(
            scheduler.run(&mut run).await,
            Err(BatchError::AlreadyRunning)
        ));
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_run_completes() {
        let client = Arc::new(FakePredictionClient::new());
        let scheduler = scheduler(client, Arc::new(EventPublisher::new()));

        let mut run = BatchRun::new(Vec::<WorkItem>::new());
        let report = scheduler.run(&mut run).await.unwrap();
        assert!(report.is_empty());
    }
}

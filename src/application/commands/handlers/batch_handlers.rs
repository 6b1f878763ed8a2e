//! Batch Command Handlers

use std::sync::Arc;

use crate::application::annotation::AnnotationRenderer;
use crate::application::commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{AnnotationStoragePort, BatchSessionPort};
use crate::infrastructure::adapters::{encode_png, DisplayImage, ImageOverlay};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::worker::BatchScheduler;

/// SubmitFiles Handler - 替换待处理队列
pub struct SubmitFilesHandler {
    session: Arc<dyn BatchSessionPort>,
    event_publisher: Arc<EventPublisher>,
}

impl SubmitFilesHandler {
    pub fn new(session: Arc<dyn BatchSessionPort>, event_publisher: Arc<EventPublisher>) -> Self {
        Self {
            session,
            event_publisher,
        }
    }

    pub fn handle(&self, cmd: SubmitFiles) -> Result<SubmitFilesResponse, ApplicationError> {
        let warning = self.session.submit(cmd.files)?;
        let queued = self.session.queue().len();

        if let Some(warning) = &warning {
            tracing::warn!(queued = queued, "{}", warning);
        }
        self.event_publisher
            .publish_queue_submitted(queued, warning.clone());

        Ok(SubmitFilesResponse { queued, warning })
    }
}

/// StartBatch Handler - 运行当前队列直到全部完成
pub struct StartBatchHandler {
    session: Arc<dyn BatchSessionPort>,
    scheduler: Arc<BatchScheduler>,
}

impl StartBatchHandler {
    pub fn new(session: Arc<dyn BatchSessionPort>, scheduler: Arc<BatchScheduler>) -> Self {
        Self { session, scheduler }
    }

    pub async fn handle(&self, _cmd: StartBatch) -> Result<StartBatchResponse, ApplicationError> {
        let mut run = self.session.begin_run()?;

        let result = self.scheduler.run(&mut run).await;
        // 无论成功与否都要释放运行标志
        self.session.finish_run(run);

        let report = result?;
        tracing::info!(
            run_id = %report.run_id,
            summary = %report.summary,
            "Batch finished"
        );
        Ok(StartBatchResponse { report })
    }
}

/// ClearBatch Handler - 清空队列与结果
pub struct ClearBatchHandler {
    session: Arc<dyn BatchSessionPort>,
    event_publisher: Arc<EventPublisher>,
}

impl ClearBatchHandler {
    pub fn new(session: Arc<dyn BatchSessionPort>, event_publisher: Arc<EventPublisher>) -> Self {
        Self {
            session,
            event_publisher,
        }
    }

    pub fn handle(&self, _cmd: ClearBatch) -> Result<(), ApplicationError> {
        self.session.clear()?;
        self.event_publisher.publish_queue_cleared();
        Ok(())
    }
}

/// RenderAnnotations Handler - 为最近一次批次的成功项生成带边界框的预览图
pub struct RenderAnnotationsHandler {
    session: Arc<dyn BatchSessionPort>,
    storage: Arc<dyn AnnotationStoragePort>,
    renderer: AnnotationRenderer,
    display_width: u32,
}

impl RenderAnnotationsHandler {
    pub fn new(
        session: Arc<dyn BatchSessionPort>,
        storage: Arc<dyn AnnotationStoragePort>,
        renderer: AnnotationRenderer,
        display_width: u32,
    ) -> Self {
        Self {
            session,
            storage,
            renderer,
            display_width,
        }
    }

    pub async fn handle(
        &self,
        _cmd: RenderAnnotations,
    ) -> Result<RenderAnnotationsResponse, ApplicationError> {
        let run = self.session.last_run()?;
        let run_id = run.id();

        // 重新渲染时先清除旧的预览
        self.storage.delete_run(run_id).await?;

        let mut previews = Vec::new();
        let mut skipped = Vec::new();

        for item in run.items() {
            if item.outcome().prediction().is_none() {
                continue;
            }

            let display = match DisplayImage::from_payload(item.payload(), self.display_width) {
                Ok(display) => display,
                Err(e) => {
                    tracing::warn!(index = item.index(), error = %e, "Skipping preview");
                    skipped.push((item.index(), e.to_string()));
                    continue;
                }
            };

            let mut overlay = ImageOverlay::new(display.target.displayed);
            let rect = self
                .renderer
                .render(item.outcome(), &display.target, &mut overlay);

            let png = encode_png(&overlay.composite_onto(&display.image))?;
            let path = self
                .storage
                .save_preview(run_id, item.index(), item.payload().file_name(), &png)
                .await?;

            previews.push(RenderedPreview {
                index: item.index(),
                file_name: item.payload().file_name().to_string(),
                path,
                annotated: rect.is_some(),
            });
        }

        tracing::info!(
            run_id = %run_id,
            previews = previews.len(),
            skipped = skipped.len(),
            "Annotations rendered"
        );

        Ok(RenderAnnotationsResponse {
            run_id,
            previews,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PredictionServicePort;
    use crate::domain::batch::{ImageFormat, ImagePayload, QueueWarning};
    use crate::infrastructure::adapters::{FakePredictionClient, FakeReply, FileAnnotationStorage};
    use crate::infrastructure::events::BatchEvent;
    use crate::infrastructure::memory::InMemoryBatchSession;
    use crate::infrastructure::worker::{BatchSchedulerConfig, RetryPolicy, RetryingUploader};
    use image::{DynamicImage, RgbaImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_payload(name: &str, width: u32, height: u32) -> ImagePayload {
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        ImagePayload::new(name, ImageFormat::Png, data).unwrap()
    }

    struct Fixture {
        session: Arc<InMemoryBatchSession>,
        events: Arc<EventPublisher>,
        client: Arc<FakePredictionClient>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                session: InMemoryBatchSession::new(10).arc(),
                events: EventPublisher::new().arc(),
                client: Arc::new(FakePredictionClient::new()),
            }
        }

        fn submit(&self) -> SubmitFilesHandler {
            SubmitFilesHandler::new(self.session.clone(), self.events.clone())
        }

        fn start(&self) -> StartBatchHandler {
            let service: Arc<dyn PredictionServicePort> = self.client.clone();
            let scheduler = BatchScheduler::new(
                BatchSchedulerConfig::default(),
                RetryingUploader::new(service, RetryPolicy::default()),
                self.events.clone(),
            );
            StartBatchHandler::new(self.session.clone(), Arc::new(scheduler))
        }
    }

    #[tokio::test]
    async fn test_submit_then_start_produces_report() {
        let fx = Fixture::new();
        fx.client.script("a.png", vec![FakeReply::positive(Some([1.0, 1.0, 5.0, 5.0]))]);
        fx.client.script("c.png", vec![FakeReply::network_error(); 3]);

        let files = vec![
            png_payload("a.png", 8, 8),
            png_payload("b.png", 8, 8),
            png_payload("c.png", 8, 8),
        ];
        let submitted = fx.submit().handle(SubmitFiles { files }).unwrap();
        assert_eq!(submitted.queued, 3);
        assert!(submitted.warning.is_none());

        let response = fx.start().handle(StartBatch).await.unwrap();
        let report = response.report;
        assert_eq!(report.summary.positive, 1);
        assert_eq!(report.summary.negative, 1);
        assert_eq!(report.errors[2].as_deref(), Some("Failed to upload image 3."));
        assert!(!fx.session.is_running());
        assert_eq!(fx.session.last_run().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_start_twice_reuses_selection() {
        let fx = Fixture::new();
        fx.submit()
            .handle(SubmitFiles {
                files: vec![png_payload("a.png", 2, 2)],
            })
            .unwrap();

        let first = fx.start().handle(StartBatch).await.unwrap().report;
        let second = fx.start().handle(StartBatch).await.unwrap().report;

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.len(), 1);
        assert_eq!(second.summary.negative, 1);
        assert_eq!(fx.client.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_start_with_empty_queue() {
        let fx = Fixture::new();
        let err = fx.start().handle(StartBatch).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select or drop at least one image.");
        assert_eq!(fx.client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_publishes_truncation_warning() {
        let fx = Fixture::new();
        let mut rx = fx.events.subscribe();
        let files = (0..12)
            .map(|i| png_payload(&format!("{}.png", i), 2, 2))
            .collect();

        let response = fx.submit().handle(SubmitFiles { files }).unwrap();
        assert_eq!(response.queued, 10);

        match rx.recv().await.unwrap() {
            BatchEvent::QueueSubmitted { count, warning } => {
                assert_eq!(count, 10);
                assert_eq!(
                    warning,
                    Some(QueueWarning::Truncated {
                        kept: 10,
                        dropped: 2
                    })
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_resets_queue() {
        let fx = Fixture::new();
        fx.submit()
            .handle(SubmitFiles {
                files: vec![png_payload("a.png", 2, 2)],
            })
            .unwrap();

        ClearBatchHandler::new(fx.session.clone(), fx.events.clone())
            .handle(ClearBatch)
            .unwrap();
        assert!(fx.session.queue().is_empty());
    }

    #[tokio::test]
    async fn test_render_skips_failures_and_annotates_boxes() {
        let fx = Fixture::new();
        fx.client.script(
            "pos.png",
            vec![FakeReply::positive(Some([10.0, 20.0, 110.0, 220.0]))],
        );
        fx.client.script("bad.png", vec![FakeReply::rejected(Some("Bad image")); 3]);

        fx.submit()
            .handle(SubmitFiles {
                files: vec![
                    png_payload("pos.png", 200, 400),
                    png_payload("neg.png", 50, 50),
                    png_payload("bad.png", 50, 50),
                ],
            })
            .unwrap();
        fx.start().handle(StartBatch).await.unwrap();

        let dir = tempdir().unwrap();
        let storage = Arc::new(FileAnnotationStorage::new(dir.path()).await.unwrap());
        let handler = RenderAnnotationsHandler::new(
            fx.session.clone(),
            storage,
            AnnotationRenderer::default(),
            100,
        );

        let response = handler.handle(RenderAnnotations).await.unwrap();
        assert_eq!(response.previews.len(), 2);
        assert!(response.skipped.is_empty());

        let positive = &response.previews[0];
        assert_eq!(positive.index, 0);
        assert!(positive.annotated);
        assert!(positive.path.exists());
        let rendered = image::open(&positive.path).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (100, 200));
        let [r, g, _, a] = rendered.get_pixel(5, 10).0;
        assert!(r > 0xc0 && g < 0x40 && a == 255);
        // 框内保持原图
        assert_eq!(rendered.get_pixel(30, 60).0[3], 0);

        // 阴性且无边界框：输出原图，不画框
        assert_eq!(response.previews[1].index, 1);
        assert!(!response.previews[1].annotated);
    }

    #[tokio::test]
    async fn test_render_without_run() {
        let fx = Fixture::new();
        let dir = tempdir().unwrap();
        let storage = Arc::new(FileAnnotationStorage::new(dir.path()).await.unwrap());
        let handler = RenderAnnotationsHandler::new(
            fx.session.clone(),
            storage,
            AnnotationRenderer::default(),
            100,
        );

        assert!(matches!(
            handler.handle(RenderAnnotations).await,
            Err(ApplicationError::NotFound(_))
        ));
    }
}

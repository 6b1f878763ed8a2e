//! tbdetect - 胸部 X 光结核检测批量上传客户端
//!
//! - Domain: batch/, geometry
//! - Application: commands, ports, annotation
//! - Infrastructure: adapters, memory, worker, events

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use tbdetect::application::{
    AnnotationRenderer, AnnotationStyle, PredictionServicePort, RenderAnnotations,
    RenderAnnotationsHandler, StartBatch, StartBatchHandler, SubmitFiles, SubmitFilesHandler,
};
use tbdetect::cli::{format_report, Cli, Commands};
use tbdetect::config::{load_config_from_path, print_config, to_toml, AppConfig};
use tbdetect::infrastructure::adapters::{
    FakePredictionClient, FileAnnotationStorage, FileLoader, HttpPredictionClient,
    HttpPredictionClientConfig,
};
use tbdetect::infrastructure::events::{BatchEvent, EventPublisher};
use tbdetect::infrastructure::memory::InMemoryBatchSession;
use tbdetect::infrastructure::worker::{
    BatchScheduler, BatchSchedulerConfig, RetryPolicy, RetryingUploader,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Config => {
            println!("{}", to_toml(&config)?);
        }
        Commands::Predict {
            files,
            output,
            no_render,
            json,
            dry_run,
        } => {
            print_config(&config);
            let options = PredictOptions {
                output,
                render: !no_render,
                json,
                dry_run,
            };
            predict(config, files, options).await?;
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log.level.as_str() };
    let log_filter = format!("{},tbdetect={}", level, level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    // 结果输出到 stdout，日志走 stderr
    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

struct PredictOptions {
    output: Option<PathBuf>,
    render: bool,
    json: bool,
    dry_run: bool,
}

async fn predict(
    config: AppConfig,
    files: Vec<PathBuf>,
    options: PredictOptions,
) -> anyhow::Result<()> {
    // 读取并校验输入文件
    let loader = FileLoader::new(config.batch.max_file_size);
    let loaded = loader.load(&files).await;
    for rejection in &loaded.rejections {
        eprintln!("{}", rejection);
    }

    // 创建预测客户端
    let prediction_service: Arc<dyn PredictionServicePort> = if options.dry_run {
        tracing::warn!("Dry run: using fake prediction client");
        Arc::new(FakePredictionClient::new())
    } else {
        let client_config = HttpPredictionClientConfig {
            url: config.endpoint.url.clone(),
            timeout_secs: config.endpoint.timeout_secs,
            field_name: config.endpoint.field_name.clone(),
        };
        let client = HttpPredictionClient::new(client_config)?;
        if !client.health_check().await {
            tracing::warn!(url = %client.url(), "Prediction service is not reachable");
        }
        Arc::new(client)
    };

    // 创建事件发布器，进度事件写入日志
    let event_publisher = EventPublisher::new().arc();
    let mut events = event_publisher.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BatchEvent::ItemProgress {
                    index, progress, ..
                }) => tracing::debug!(index = index, progress = progress, "Item progress"),
                Ok(event @ BatchEvent::BatchCompleted { .. }) => {
                    tracing::debug!(event = ?event, "Batch event");
                    break;
                }
                Ok(event) => tracing::debug!(event = ?event, "Batch event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped = skipped, "Event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let session = InMemoryBatchSession::new(config.batch.max_items).arc();
    let scheduler = Arc::new(BatchScheduler::new(
        BatchSchedulerConfig {
            concurrency: config.batch.concurrency,
        },
        RetryingUploader::new(
            prediction_service,
            RetryPolicy::from_config(&config.endpoint),
        ),
        event_publisher.clone(),
    ));

    let submitted = SubmitFilesHandler::new(session.clone(), event_publisher.clone())
        .handle(SubmitFiles {
            files: loaded.files,
        })?;
    if let Some(warning) = &submitted.warning {
        eprintln!("{}", warning);
    }

    let report = StartBatchHandler::new(session.clone(), scheduler)
        .handle(StartBatch)
        .await?
        .report;
    let _ = event_logger.await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report));
    }

    if options.render && config.render.enabled {
        let output_dir = options
            .output
            .unwrap_or_else(|| config.render.output_dir.clone());
        let storage = Arc::new(FileAnnotationStorage::new(&output_dir).await?);
        let style = AnnotationStyle::from_hex(
            &config.render.positive_color,
            &config.render.negative_color,
            config.render.line_width,
        )?;

        let rendered = RenderAnnotationsHandler::new(
            session,
            storage,
            AnnotationRenderer::new(style),
            config.render.display_width,
        )
        .handle(RenderAnnotations)
        .await?;

        for (index, reason) in &rendered.skipped {
            eprintln!("Preview for image {} skipped: {}", index + 1, reason);
        }
        if !rendered.previews.is_empty() {
            eprintln!(
                "Saved {} annotated preview(s) to {}",
                rendered.previews.len(),
                output_dir.display()
            );
        }
    }

    Ok(())
}

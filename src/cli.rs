//! 命令行接口与终端输出格式

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::batch::{BatchReport, Prediction};

/// 文件名显示的最大长度
pub const MAX_NAME_LEN: usize = 30;

#[derive(Parser)]
#[command(name = "tbdetect")]
#[command(about = "胸部 X 光结核检测批量上传工具", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径（默认搜索 tbdetect.toml / tbdetect.local.toml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 上传图像并输出预测结果
    Predict {
        /// JPEG/PNG 图像文件
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 标注预览输出目录（覆盖 render.output_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 不生成标注预览
        #[arg(long)]
        no_render: bool,

        /// 以 JSON 输出批次报告
        #[arg(long)]
        json: bool,

        /// 不连接预测服务，使用内置的假客户端
        #[arg(long)]
        dry_run: bool,
    },

    /// 打印生效的配置（TOML）
    Config,
}

/// 截断过长的文件名，保留扩展名
///
/// `a_very_long_chest_xray_file_name.png` -> `a_very_long_chest_xray_...png`
pub fn truncate_file_name(name: &str, max_len: usize) -> String {
    let len = name.chars().count();
    if len <= max_len {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            let keep = max_len.saturating_sub(ext.chars().count() + 4);
            let base: String = name.chars().take(keep).collect();
            format!("{}...{}", base, ext)
        }
        _ => {
            let base: String = name.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", base)
        }
    }
}

/// 单项结果行
pub fn format_prediction(prediction: &Prediction) -> String {
    let mut line = format!(
        "{} (Confidence: {:.2}%)",
        prediction.classification().display_name(),
        prediction.confidence().as_percent()
    );
    if let Some(bbox) = prediction.bounding_box() {
        line.push_str(&format!(" Bounding Box: {}", bbox));
    }
    line
}

/// 渲染文本报告：汇总行加每项一行
pub fn format_report(report: &BatchReport) -> String {
    let mut lines = vec![report.summary.to_string()];

    for index in 0..report.len() {
        let name = report
            .file_names
            .get(index)
            .map(|n| truncate_file_name(n, MAX_NAME_LEN))
            .unwrap_or_else(|| format!("Image {}", index + 1));

        let detail = match (&report.results[index], &report.errors[index]) {
            (Some(prediction), _) => format_prediction(prediction),
            (None, Some(error)) => format!("Error: {}", error),
            (None, None) => "Pending".to_string(),
        };
        lines.push(format!("{:>2}. {}: {}", index + 1, name, detail));
    }

    lines.join("\n")
}

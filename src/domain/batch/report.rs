//! Result Aggregator - 批次结果汇总

use serde::Serialize;

use super::{BatchRun, BatchRunId, Classification, ItemOutcome, Prediction};

/// 批次汇总计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// 按分类统计结果，None（失败或未完成）不计入阳性/阴性
    pub fn from_results(results: &[Option<Prediction>]) -> Self {
        let count = |class: Classification| {
            results
                .iter()
                .flatten()
                .filter(|p| p.classification() == class)
                .count()
        };

        Self {
            total: results.len(),
            positive: count(Classification::Positive),
            negative: count(Classification::Negative),
            failed: 0,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total Images: {} | Positive: {} | Negative: {}",
            self.total, self.positive, self.negative
        )
    }
}

/// 批次报告
///
/// `results` 与 `errors` 按原始索引对齐，同一索引最多出现在其中一个数组
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: BatchRunId,
    pub file_names: Vec<String>,
    pub results: Vec<Option<Prediction>>,
    pub errors: Vec<Option<String>>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn from_run(run: &BatchRun) -> Self {
        let mut file_names = Vec::with_capacity(run.len());
        let mut results = Vec::with_capacity(run.len());
        let mut errors = Vec::with_capacity(run.len());

        for item in run.items() {
            file_names.push(item.payload().file_name().to_string());
            match item.outcome() {
                ItemOutcome::Success { prediction } => {
                    results.push(Some(prediction.clone()));
                    errors.push(None);
                }
                ItemOutcome::Failure { message } => {
                    results.push(None);
                    errors.push(Some(message.clone()));
                }
                ItemOutcome::Pending => {
                    results.push(None);
                    errors.push(None);
                }
            }
        }

        let mut summary = BatchSummary::from_results(&results);
        summary.failed = errors.iter().flatten().count();

        Self {
            run_id: run.id(),
            file_names,
            results,
            errors,
            summary,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{Confidence, ImageFormat, ImagePayload, WorkItem};

    fn prediction(class: Classification) -> Prediction {
        Prediction::new(class, Confidence::new(0.75).unwrap(), None)
    }

    #[test]
    fn test_summary_counts_by_classification() {
        let results = vec![
            Some(prediction(Classification::Positive)),
            Some(prediction(Classification::Negative)),
            Some(prediction(Classification::Positive)),
            None,
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.positive, 2);
        assert_eq!(summary.negative, 1);
        assert_eq!(
            summary.to_string(),
            "Total Images: 4 | Positive: 2 | Negative: 1"
        );
    }

    #[test]
    fn test_report_arrays_are_index_aligned_and_disjoint() {
        let items = (0..3)
            .map(|i| {
                let payload =
                    ImagePayload::new(format!("{}.png", i), ImageFormat::Png, vec![1]).unwrap();
                WorkItem::new(i, payload)
            })
            .collect();
        let mut run = BatchRun::new(items);
        run.resolve(
            2,
            ItemOutcome::Success {
                prediction: prediction(Classification::Positive),
            },
        )
        .unwrap();
        run.resolve(
            0,
            ItemOutcome::Failure {
                message: "Failed to upload image 1.".to_string(),
            },
        )
        .unwrap();

        let report = BatchReport::from_run(&run);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.errors.len(), 3);
        for index in 0..3 {
            assert!(!(report.results[index].is_some() && report.errors[index].is_some()));
        }
        assert!(report.results[2].is_some());
        assert_eq!(report.errors[0].as_deref(), Some("Failed to upload image 1."));
        // index 1 仍为 Pending
        assert!(report.results[1].is_none() && report.errors[1].is_none());
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.positive, 1);
    }
}

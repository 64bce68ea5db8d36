use crate::browser::PoolBusy;
use crate::core::models::{AnalysisReport, ExtractedContent, ScreenshotSet};
use crate::core::types::PipelineStage;
use crate::scoring::ScoreDraft;

/// 流水线收集到的原始结果，交给组装阶段
#[derive(Debug, Clone)]
pub struct Gathered {
    pub homepage: ExtractedContent,
    pub homepage_shots: ScreenshotSet,
    pub case_studies: Vec<CapturedPage>,
    pub draft: Option<ScoreDraft>,
}

impl Gathered {
    /// 什么都没拿到时的输入，用于截止时间到达后的默认报告
    pub fn nothing(url: &str) -> Self {
        Self {
            homepage: ExtractedContent::unavailable(url),
            homepage_shots: ScreenshotSet::default(),
            case_studies: Vec::new(),
            draft: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub content: ExtractedContent,
    pub screenshots: ScreenshotSet,
}

/// 组装好的报告以及使用了默认值的字段
#[derive(Debug, Clone)]
pub struct Assembly {
    pub report: AnalysisReport,
    pub degraded: Vec<String>,
}

/// 一次分析请求的最终结果
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: AnalysisReport,
    pub degraded: Vec<String>,
    pub timed_out: bool,
    pub stage_reached: PipelineStage,
    pub total_ms: u64,
    pub deadline_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Pending,
    CaptureFailed,
    TimedOut,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::CaptureFailed => "capture_failed",
            ReviewStatus::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub screenshot_url: Option<String>,
    pub status: ReviewStatus,
}

/// 只有会话池满和流水线崩溃会让请求失败
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Busy(#[from] PoolBusy),
    #[error("流水线异常终止: {0}")]
    Crashed(String),
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{CaptureKind, Thoroughness};

/// 页面无法加载时送去评分的占位文本
pub const UNAVAILABLE_TEXT: &str = "Unable to load page content.";

/// quick 模式下没有访问的案例页，只知道链接标题
pub const NOT_VISITED_TEXT: &str = "Not visited in quick mode; only the link title is known.";

/// 没有找到案例链接时合成的首页条目标题
pub const HOMEPAGE_TITLE: &str = "Portfolio Homepage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub url: String,
    pub mode: Thoroughness,
}

/// 页面上的一个超链接（绝对地址 + 可见文本）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub href: String,
    pub text: String,
}

/// 被关键词命中的案例链接，保持 DOM 顺序
pub type CaseStudyCandidate = LinkInfo;

/// 单次页面加载提取出的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub url: String,
    pub title: String,
    pub text: String,
    pub word_count: usize,
    pub links: Vec<LinkInfo>,
    pub loaded: bool,
}

impl ExtractedContent {
    pub fn unavailable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            text: UNAVAILABLE_TEXT.to_string(),
            word_count: 0,
            links: Vec::new(),
            loaded: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotSet {
    pub desktop_full: Option<String>,
    pub desktop_fold: Option<String>,
    pub mobile_full: Option<String>,
}

impl ScreenshotSet {
    pub fn set(&mut self, kind: CaptureKind, url: Option<String>) {
        match kind {
            CaptureKind::DesktopFull => self.desktop_full = url,
            CaptureKind::DesktopFold => self.desktop_fold = url,
            CaptureKind::MobileFull => self.mobile_full = url,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desktop_full.is_none() && self.desktop_fold.is_none() && self.mobile_full.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscores {
    pub ux_thinking: u8,
    pub clarity: u8,
    pub storytelling: u8,
    pub professionalism: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub ai_review: String,
    pub score: u8,
    pub suggestions: Vec<String>,
}

/// 解析合并后的完整评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub overall_score: u8,
    pub subscores: Subscores,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyReport {
    pub url: String,
    pub title: String,
    pub word_count: usize,
    pub score: u8,
    pub subscores: Subscores,
    pub screenshots: ScreenshotSet,
    pub sections: Vec<Section>,
    pub summary: String,
    pub strengths: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewReadiness {
    #[serde(rename = "Ready for interviews")]
    Ready,
    #[serde(rename = "Almost ready")]
    AlmostReady,
    #[serde(rename = "Needs more work")]
    NeedsWork,
    #[serde(rename = "Significant improvements needed")]
    SignificantImprovements,
}

impl InterviewReadiness {
    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => InterviewReadiness::Ready,
            70..=84 => InterviewReadiness::AlmostReady,
            55..=69 => InterviewReadiness::NeedsWork,
            _ => InterviewReadiness::SignificantImprovements,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(raw.trim().to_string())).ok()
    }
}

/// 返回给调用方的最终报告，任何字段都不允许缺失
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub portfolio_url: String,
    pub analyzed_at: DateTime<Utc>,
    pub overall_score: u8,
    pub subscores: Subscores,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub interview_readiness: InterviewReadiness,
    pub standout_feature: Option<String>,
    pub case_studies: Vec<CaseStudyReport>,
    pub top_recommendations: Vec<Recommendation>,
}

/// 旧版 review 流程写入的审计记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub email: String,
    pub url: String,
    pub status: String,
    pub screenshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

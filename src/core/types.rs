use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 单次分析流水线所处的阶段，严格按顺序推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Init,
    Loading,
    Extracting,
    Capturing,
    Scoring,
    Assembled,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Init => "init",
            PipelineStage::Loading => "loading",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Capturing => "capturing",
            PipelineStage::Scoring => "scoring",
            PipelineStage::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

/// 调用方要求的截图细致程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Thoroughness {
    Quick,
    #[default]
    Standard,
    Thorough,
}

impl Thoroughness {
    /// 首页需要的截图种类
    pub fn homepage_kinds(self) -> &'static [CaptureKind] {
        match self {
            Thoroughness::Quick => &[CaptureKind::DesktopFold],
            Thoroughness::Standard => &[CaptureKind::DesktopFull, CaptureKind::DesktopFold],
            Thoroughness::Thorough => &[
                CaptureKind::DesktopFull,
                CaptureKind::DesktopFold,
                CaptureKind::MobileFull,
            ],
        }
    }

    /// 案例页需要的截图种类；quick 模式不访问案例页
    pub fn case_study_kinds(self) -> &'static [CaptureKind] {
        match self {
            Thoroughness::Quick => &[],
            other => other.homepage_kinds(),
        }
    }

    pub fn visits_case_studies(self) -> bool {
        !self.case_study_kinds().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    DesktopFull,
    DesktopFold,
    MobileFull,
}

impl CaptureKind {
    pub fn viewport(self) -> Viewport {
        match self {
            CaptureKind::DesktopFull | CaptureKind::DesktopFold => Viewport::DESKTOP,
            CaptureKind::MobileFull => Viewport::MOBILE,
        }
    }

    pub fn full_page(self) -> bool {
        !matches!(self, CaptureKind::DesktopFold)
    }

    /// 用于对象存储 key 的短名
    pub fn slug(self) -> &'static str {
        match self {
            CaptureKind::DesktopFull => "desktop-full",
            CaptureKind::DesktopFold => "desktop-fold",
            CaptureKind::MobileFull => "mobile-full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub mobile: bool,
}

impl Viewport {
    pub const DESKTOP: Viewport = Viewport {
        width: 1280,
        height: 800,
        mobile: false,
    };
    pub const MOBILE: Viewport = Viewport {
        width: 375,
        height: 812,
        mobile: true,
    };
}

/// 页面加载策略，从强到弱依次尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    NetworkIdle,
    DomContentLoaded,
    Commit,
}

impl LoadStrategy {
    /// 把总预算按 50% / 30% / 20% 分给三种策略，三者之和等于总预算
    pub fn ladder(budget: Duration) -> [(LoadStrategy, Duration); 3] {
        let total = budget.as_millis() as u64;
        let idle = total / 2;
        let dom = total * 3 / 10;
        let commit = total - idle - dom;
        [
            (LoadStrategy::NetworkIdle, Duration::from_millis(idle)),
            (LoadStrategy::DomContentLoaded, Duration::from_millis(dom)),
            (LoadStrategy::Commit, Duration::from_millis(commit)),
        ]
    }

    /// CDP 生命周期事件名，Commit 不需要等待事件
    pub fn lifecycle_event(self) -> Option<&'static str> {
        match self {
            LoadStrategy::NetworkIdle => Some("networkIdle"),
            LoadStrategy::DomContentLoaded => Some("DOMContentLoaded"),
            LoadStrategy::Commit => None,
        }
    }
}

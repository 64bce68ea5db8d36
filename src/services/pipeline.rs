use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::browser::Lease;
use crate::capture::page_label;
use crate::core::models::{
    AnalysisRequest, CaseStudyCandidate, ExtractedContent, NOT_VISITED_TEXT, ScreenshotSet, UNAVAILABLE_TEXT,
};
use crate::core::types::PipelineStage;
use crate::fetcher::{ExtractLimits, classify_case_studies, fetch_page, load_with_ladder, read_page};
use crate::scoring::{CaseStudyBrief, ScoringInput};
use crate::services::ServiceContext;
use crate::services::assembler::assemble;
use crate::services::types::{Assembly, CapturedPage, Gathered};

fn advance(stage: &watch::Sender<PipelineStage>, next: PipelineStage) {
    debug!("阶段 -> {}", next);
    stage.send_replace(next);
}

fn limits(ctx: &ServiceContext) -> ExtractLimits {
    ExtractLimits {
        max_text_chars: ctx.config.extraction.max_text_chars,
        require_link_text: ctx.config.extraction.require_link_text,
    }
}

/// 访问一个案例页：加载、提取、截图；加载失败时只保留链接信息
async fn visit_case_study(
    ctx: &ServiceContext,
    lease: &Lease,
    candidate: &CaseStudyCandidate,
    request: &AnalysisRequest,
) -> CapturedPage {
    let session = lease.session();
    let budget = ctx.config.timeouts.case_study_load();

    let mut content = fetch_page(session, &candidate.href, budget, &limits(ctx)).await;
    if !content.loaded {
        warn!("⚠️ 案例页加载失败: {}", candidate.href);
        return link_only(candidate, UNAVAILABLE_TEXT);
    }
    if content.title.is_empty() {
        content.title = candidate.text.clone();
    }
    let screenshots = ctx
        .capturer
        .capture_set(session, request.mode.case_study_kinds(), &page_label(&candidate.href))
        .await;

    CapturedPage { content, screenshots }
}

/// 只有链接信息的案例页；text 说明是加载失败还是没有访问
fn link_only(candidate: &CaseStudyCandidate, text: &str) -> CapturedPage {
    CapturedPage {
        content: ExtractedContent {
            title: candidate.text.clone(),
            text: text.to_string(),
            ..ExtractedContent::unavailable(&candidate.href)
        },
        screenshots: ScreenshotSet::default(),
    }
}

fn scoring_input(url: &str, homepage: &ExtractedContent, case_studies: &[CapturedPage]) -> ScoringInput {
    ScoringInput {
        url: url.to_string(),
        content: homepage.text.clone(),
        case_studies: case_studies
            .iter()
            .map(|page| CaseStudyBrief {
                url: page.content.url.clone(),
                title: page.content.title.clone(),
                text: page.content.text.clone(),
            })
            .collect(),
    }
}

/// 单次分析：加载 → 提取 → 截图 → 评分 → 组装，严格顺序执行
///
/// `lease` 为 None 表示浏览器不可用，所有页面按加载失败处理。
/// 该任务可能在任意 await 处被中止，浏览器和临时文件由各自的守卫清理。
pub async fn run_analysis(
    ctx: Arc<ServiceContext>,
    request: AnalysisRequest,
    lease: Option<Lease>,
    stage: watch::Sender<PipelineStage>,
) -> Assembly {
    let url = request.url.as_str();
    let extraction = &ctx.config.extraction;

    // ============ 加载 ============
    advance(&stage, PipelineStage::Loading);
    let loaded = match &lease {
        Some(lease) => load_with_ladder(lease.session(), url, ctx.config.timeouts.load_budget())
            .await
            .is_some(),
        None => {
            warn!("❌ 没有可用的浏览器会话，使用占位内容");
            false
        }
    };

    // ============ 提取 ============
    advance(&stage, PipelineStage::Extracting);
    let homepage = match (&lease, loaded) {
        (Some(lease), true) => read_page(lease.session(), url, &limits(&ctx)).await,
        _ => ExtractedContent::unavailable(url),
    };
    let candidates = classify_case_studies(
        &homepage.links,
        &extraction.case_study_keywords,
        &homepage.url,
        extraction.max_case_studies,
    );
    info!("📄 首页 {} 个词，找到 {} 个案例链接", homepage.word_count, candidates.len());

    // ============ 截图 ============
    advance(&stage, PipelineStage::Capturing);
    let mut homepage_shots = ScreenshotSet::default();
    let mut case_studies = Vec::with_capacity(candidates.len());

    match (&lease, loaded) {
        (Some(lease), true) => {
            homepage_shots = ctx
                .capturer
                .capture_set(lease.session(), request.mode.homepage_kinds(), &page_label(&homepage.url))
                .await;

            for candidate in &candidates {
                if request.mode.visits_case_studies() {
                    case_studies.push(visit_case_study(&ctx, lease, candidate, &request).await);
                } else {
                    case_studies.push(link_only(candidate, NOT_VISITED_TEXT));
                }
            }
        }
        _ => case_studies.extend(candidates.iter().map(|c| link_only(c, UNAVAILABLE_TEXT))),
    }

    // 评分前先归还浏览器会话
    if let Some(lease) = lease {
        lease.close().await;
    }

    // ============ 评分 ============
    advance(&stage, PipelineStage::Scoring);
    let input = scoring_input(url, &homepage, &case_studies);
    let draft = ctx.scorer.score(&input).await;
    if draft.is_none() {
        warn!("⚠️ 评分不可用，使用默认分数");
    }

    let gathered = Gathered {
        homepage,
        homepage_shots,
        case_studies,
        draft,
    };
    let assembly = assemble(url, &gathered, &ctx.config.scoring.defaults, Utc::now());
    advance(&stage, PipelineStage::Assembled);
    assembly
}

use chrono::{DateTime, Utc};

use crate::app::config::DefaultScores;
use crate::core::models::{
    AnalysisReport, CaseStudyReport, ExtractedContent, HOMEPAGE_TITLE, InterviewReadiness,
    Recommendation, ScoreResult, ScreenshotSet, Section, Subscores,
};
use crate::scoring::{CaseStudyDraft, ScoreDraft, SubscoreDraft};
use crate::services::types::{Assembly, CapturedPage, Gathered};

const TOP_RECOMMENDATIONS: usize = 5;

/// 记录哪些字段用了默认值
struct Merge<'a> {
    degraded: &'a mut Vec<String>,
}

impl Merge<'_> {
    fn pick<T>(&mut self, name: &str, value: Option<T>, fallback: impl FnOnce() -> T) -> T {
        match value {
            Some(v) => v,
            None => {
                self.degraded.push(name.to_string());
                fallback()
            }
        }
    }

    fn subscores(&mut self, prefix: &str, draft: &SubscoreDraft, fallback: &Subscores) -> Subscores {
        Subscores {
            ux_thinking: self.pick(&format!("{}uxThinking", prefix), draft.ux_thinking, || fallback.ux_thinking),
            clarity: self.pick(&format!("{}clarity", prefix), draft.clarity, || fallback.clarity),
            storytelling: self.pick(&format!("{}storytelling", prefix), draft.storytelling, || {
                fallback.storytelling
            }),
            professionalism: self.pick(
                &format!("{}professionalism", prefix),
                draft.professionalism,
                || fallback.professionalism,
            ),
        }
    }
}

/// 草稿逐字段覆盖默认值
pub fn resolve_scores(draft: Option<&ScoreDraft>, defaults: &DefaultScores, degraded: &mut Vec<String>) -> ScoreResult {
    let empty = ScoreDraft::default();
    let draft = draft.unwrap_or(&empty);
    let mut merge = Merge { degraded };

    ScoreResult {
        overall_score: merge.pick("overallScore", draft.overall_score, || defaults.overall_score),
        subscores: merge.subscores("subscores.", &draft.subscores, &defaults.subscores),
        summary: merge.pick("summary", draft.summary.clone(), || defaults.summary.clone()),
        strengths: merge.pick("strengths", draft.strengths.clone(), || defaults.strengths.clone()),
        weaknesses: merge.pick("weaknesses", draft.weaknesses.clone(), || defaults.weaknesses.clone()),
        recommendations: merge.pick("recommendations", draft.recommendations.clone(), || {
            defaults.recommendations.clone()
        }),
    }
}

/// 按优先级稳定排序，最多 5 条
pub fn top_recommendations(recommendations: &[Recommendation]) -> Vec<Recommendation> {
    let mut sorted = recommendations.to_vec();
    sorted.sort_by_key(|r| r.priority);
    sorted.truncate(TOP_RECOMMENDATIONS);
    sorted
}

fn case_study_report(
    index: usize,
    page: &ExtractedContent,
    title: &str,
    screenshots: ScreenshotSet,
    draft: Option<&CaseStudyDraft>,
    overall: &ScoreResult,
    defaults: &DefaultScores,
    degraded: &mut Vec<String>,
) -> CaseStudyReport {
    let empty = CaseStudyDraft::default();
    let draft = draft.unwrap_or(&empty);
    let prefix = format!("caseStudies[{}].", index);
    let mut merge = Merge { degraded };

    let score = merge.pick(&format!("{}score", prefix), draft.score, || overall.overall_score);
    let subscores = merge.subscores(&format!("{}subscores.", prefix), &draft.subscores, &overall.subscores);
    let summary = merge.pick(&format!("{}summary", prefix), draft.summary.clone(), || {
        overall.summary.clone()
    });
    let strengths = merge.pick(&format!("{}strengths", prefix), draft.strengths.clone(), || {
        overall.strengths.clone()
    });
    let recommendations = merge.pick(
        &format!("{}recommendations", prefix),
        draft.recommendations.clone(),
        Vec::new,
    );
    let sections = merge.pick(&format!("{}sections", prefix), draft.sections.clone(), || {
        vec![Section {
            kind: "overview".to_string(),
            name: "Overview".to_string(),
            ai_review: defaults.section_review.clone(),
            score,
            suggestions: Vec::new(),
        }]
    });

    CaseStudyReport {
        url: page.url.clone(),
        title: title.to_string(),
        word_count: page.word_count,
        score,
        subscores,
        screenshots,
        sections,
        summary,
        strengths,
        recommendations,
    }
}

fn case_study_title(page: &CapturedPage) -> String {
    if page.content.title.is_empty() {
        page.content.url.clone()
    } else {
        page.content.title.clone()
    }
}

/// 把各阶段结果合并成完整报告；任何输入缺失都用默认值补齐
pub fn assemble(portfolio_url: &str, gathered: &Gathered, defaults: &DefaultScores, now: DateTime<Utc>) -> Assembly {
    let mut degraded = Vec::new();
    let draft = gathered.draft.as_ref();
    let overall = resolve_scores(draft, defaults, &mut degraded);

    let interview_readiness = match draft.and_then(|d| d.interview_readiness) {
        Some(readiness) => readiness,
        None => {
            degraded.push("interviewReadiness".to_string());
            InterviewReadiness::from_score(overall.overall_score)
        }
    };
    let standout_feature = draft.and_then(|d| d.standout_feature.clone());
    if standout_feature.is_none() {
        degraded.push("standoutFeature".to_string());
    }

    let case_drafts: &[CaseStudyDraft] = draft.map(|d| d.case_studies.as_slice()).unwrap_or(&[]);
    let case_studies: Vec<CaseStudyReport> = if gathered.case_studies.is_empty() {
        vec![case_study_report(
            0,
            &gathered.homepage,
            HOMEPAGE_TITLE,
            gathered.homepage_shots.clone(),
            case_drafts.first(),
            &overall,
            defaults,
            &mut degraded,
        )]
    } else {
        gathered
            .case_studies
            .iter()
            .enumerate()
            .map(|(i, page)| {
                case_study_report(
                    i,
                    &page.content,
                    &case_study_title(page),
                    page.screenshots.clone(),
                    case_drafts.get(i),
                    &overall,
                    defaults,
                    &mut degraded,
                )
            })
            .collect()
    };

    let report = AnalysisReport {
        portfolio_url: portfolio_url.to_string(),
        analyzed_at: now,
        overall_score: overall.overall_score,
        subscores: overall.subscores,
        summary: overall.summary,
        strengths: overall.strengths,
        weaknesses: overall.weaknesses,
        interview_readiness,
        standout_feature,
        case_studies,
        top_recommendations: top_recommendations(&overall.recommendations),
    };

    Assembly { report, degraded }
}

/// 截止时间到达或什么都没拿到时的报告
pub fn default_report(portfolio_url: &str, defaults: &DefaultScores, now: DateTime<Utc>) -> Assembly {
    assemble(portfolio_url, &Gathered::nothing(portfolio_url), defaults, now)
}
